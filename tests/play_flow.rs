//! End-to-end runs of the embedded view against the in-process host.

use std::collections::{HashMap, VecDeque};

use mazerun::config::GameConfig;
use mazerun::console::{Console, LocalHost};
use mazerun::host::{HostController, StaticAssets};
use mazerun::maze::{Cell, Maze, Position};
use mazerun::session::Phase;
use mazerun::view::{Input, Key};

fn console(seed: u64) -> Console<LocalHost<StaticAssets>> {
    let controller = HostController::new(GameConfig::default(), "ada", StaticAssets::under("/a"))
        .with_seed(seed);
    let mut console = Console::new(GameConfig::default(), LocalHost::new(controller));
    console.start().unwrap();
    console
}

/// Shortest route from start to exit, treating doors and pickups as open.
fn route(maze: &Maze) -> Vec<Position> {
    let mut parent: HashMap<Position, Position> = HashMap::new();
    let mut queue = VecDeque::from([maze.start()]);
    while let Some(pos) = queue.pop_front() {
        if pos == maze.exit() {
            break;
        }
        for next in maze.neighbors(pos) {
            let open = !matches!(maze.get(next), Some(Cell::Wall | Cell::FakeExit | Cell::Trap { .. }));
            if open && next != maze.start() && !parent.contains_key(&next) {
                parent.insert(next, pos);
                queue.push_back(next);
            }
        }
    }
    let mut path = vec![maze.exit()];
    while let Some(prev) = parent.get(path.last().unwrap()) {
        path.push(*prev);
    }
    path.pop();
    path.reverse();
    path
}

fn walk_to_exit(console: &mut Console<LocalHost<StaticAssets>>) {
    let maze = console.view().session().unwrap().maze().clone();
    for step in route(&maze) {
        // Keyless doors take up to ten hits before they give way.
        for _ in 0..12 {
            if console.view().session().unwrap().player() == step {
                break;
            }
            console.dispatch(Input::Click(step)).unwrap();
        }
    }
}

#[test]
fn first_maze_arrives_on_ready() {
    let console = console(11);
    let session = console.view().session().unwrap();
    assert_eq!(session.phase(), Phase::Playing);
    assert_eq!(session.username(), "ada");
    assert_eq!(session.keys(), 1);
    assert_eq!(session.lives(), 3);
}

#[test]
fn winning_run_reaches_the_leaderboard_and_next_maze() {
    let mut console = console(21);
    walk_to_exit(&mut console);
    assert_eq!(console.view().phase(), Phase::Won);

    let card = *console.view().session().unwrap().last_card().unwrap();
    assert_eq!(console.link().leaderboard().best("ada"), Some(card.total_score));

    console.dispatch(Input::Key(Key::Enter)).unwrap();
    let session = console.view().session().unwrap();
    assert_eq!(session.phase(), Phase::Playing);
    assert_eq!(session.games_played(), 1);
    assert_eq!(session.win_streak(), 1);
    assert_eq!(console.link().controller().games_played(), 1);
}

#[test]
fn timeouts_burn_lives_until_quit() {
    let mut console = console(5);
    for lives_left in [2, 1] {
        for _ in 0..30 {
            console.dispatch(Input::Tick).unwrap();
        }
        assert!(matches!(console.view().phase(), Phase::Lost(_)));
        assert_eq!(console.link().controller().lives(), lives_left);

        console.dispatch(Input::Key(Key::Enter)).unwrap();
        let session = console.view().session().unwrap();
        assert_eq!(session.phase(), Phase::Playing);
        assert_eq!(session.time_remaining(), 30);
    }
    assert_eq!(console.view().session().unwrap().retry_count(), 2);

    for _ in 0..30 {
        console.dispatch(Input::Tick).unwrap();
    }
    assert_eq!(console.view().phase(), Phase::NoLives);
    assert!(console.link().leaderboard().entries().is_empty());

    console.dispatch(Input::Quit).unwrap();
    assert!(console.is_finished());
    assert_eq!(console.link().controller().lives(), 3);
}

//! Procedural maze generation.
//!
//! Random wall scatter, doors at chokepoints, a relaxation loop that carves a
//! corridor until the exit is reachable, then experience-scaled extras
//! (fake exits, crystal ball, map, key power-ups, traps). Every special
//! placement is guarded: a cell is only taken if the exit stays reachable.
//! A layout that cannot fit every required pickup is thrown away and rebuilt.

use tracing::{debug, warn};

use crate::maze::{Cell, CellKind, Maze, Position, TrapStyle};
use crate::prng::Prng;
use crate::reachability::{reachable, reachable_from, GENERATION, PLACEMENT};

const WALL_CHANCE: f32 = 0.35;
const DOOR_CHANCE: f32 = 0.30;
const CARVE_DOOR_CHANCE: f32 = 0.20;
const CARVE_DRIFT_CHANCE: f32 = 0.30;
const FAKE_EXIT_ATTEMPTS: u32 = 50;
const PLACEMENT_ATTEMPTS: u32 = 64;
const LAYOUT_ATTEMPTS: u32 = 32;

pub const MIN_WIDTH: u32 = 7;
pub const MIN_HEIGHT: u32 = 5;

/// Experience gate for fake exits, the crystal ball and traps.
pub const VETERAN_GAMES: u32 = 3;
/// Experience gate for the second fake exit and richer key drops.
pub const EXPERT_GAMES: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenParams {
    pub width: u32,
    pub height: u32,
    pub games_played: u32,
    pub casual: bool,
    pub level: u32,
}

impl GenParams {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            games_played: 0,
            casual: false,
            level: 1,
        }
    }

    pub fn games_played(mut self, games_played: u32) -> Self {
        self.games_played = games_played;
        self
    }

    pub fn casual(mut self, casual: bool) -> Self {
        self.casual = casual;
        self
    }

    pub fn level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }
}

/// Entropy-seeded convenience wrapper around [`generate_with`].
pub fn generate(width: u32, height: u32, games_played: u32, casual: bool) -> Maze {
    let params = GenParams::new(width, height)
        .games_played(games_played)
        .casual(casual);
    generate_with(&mut Prng::from_entropy(), params)
}

pub fn generate_with(rng: &mut Prng, params: GenParams) -> Maze {
    let width = params.width.max(MIN_WIDTH);
    let height = params.height.max(MIN_HEIGHT);

    for attempt in 1..=LAYOUT_ATTEMPTS {
        if let Some(maze) = build_layout(rng, &params, width, height, &SCATTERED) {
            if attempt > 1 {
                debug!(attempt, "layout regenerated until every pickup fit");
            }
            return maze;
        }
    }

    warn!(
        width,
        height,
        attempts = LAYOUT_ATTEMPTS,
        "no scattered layout fit every pickup, using an open one"
    );
    open_layout(rng, &params, width, height)
}

/// Knobs for one layout pass.
struct Layout {
    wall_chance: f32,
    door_chance: f32,
    /// Keep pickups off a fixed start-to-exit route.
    reserve_route: bool,
}

const SCATTERED: Layout = Layout {
    wall_chance: WALL_CHANCE,
    door_chance: DOOR_CHANCE,
    reserve_route: false,
};

const OPEN: Layout = Layout {
    wall_chance: 0.0,
    door_chance: 0.0,
    reserve_route: true,
};

/// One full pass from the blank grid. `None` when a required pickup found no
/// cell that keeps the exit reachable.
fn build_layout(
    rng: &mut Prng,
    params: &GenParams,
    width: u32,
    height: u32,
    layout: &Layout,
) -> Option<Maze> {
    let mut maze = Maze::blank(width, height, Cell::Path);
    for x in 0..width {
        maze.set(Position::new(x, 0), Cell::Wall);
        maze.set(Position::new(x, height - 1), Cell::Wall);
    }
    for y in 0..height {
        maze.set(Position::new(0, y), Cell::Wall);
        maze.set(Position::new(width - 1, y), Cell::Wall);
    }

    let start = Position::new(0, rng.gen_range_u32(1, height - 1));
    let exit = Position::new(width - 1, rng.gen_range_u32(1, height - 1));
    maze.set_endpoints(start, exit);
    maze.set(maze.start_entry(), Cell::Path);
    maze.set(maze.exit_entry(), Cell::Path);

    scatter_walls(&mut maze, rng, layout.wall_chance);
    place_doors(&mut maze, rng, layout.door_chance);
    ensure_route(&mut maze, rng);

    let reserved = if layout.reserve_route {
        straight_route(&maze)
    } else {
        Vec::new()
    };
    place_extras(&mut maze, rng, params, &reserved)?;

    if params.level >= 2 {
        clear_outer_rows(&mut maze);
    }

    debug!(
        width,
        height,
        games = params.games_played,
        casual = params.casual,
        level = params.level,
        doors = maze.count(CellKind::Door),
        traps = maze.count(CellKind::Trap),
        "maze generated"
    );
    Some(maze)
}

/// Wall-free, door-free pass. Pickups stay off the reserved route, and even
/// the smallest grid has more free interior cells than pickups, so every
/// placement succeeds.
fn open_layout(rng: &mut Prng, params: &GenParams, width: u32, height: u32) -> Maze {
    loop {
        if let Some(maze) = build_layout(rng, params, width, height, &OPEN) {
            return maze;
        }
        warn!(width, height, "open layout could not fit every pickup");
    }
}

fn place_extras(
    maze: &mut Maze,
    rng: &mut Prng,
    params: &GenParams,
    reserved: &[Position],
) -> Option<()> {
    if params.casual {
        place_pickup(maze, rng, Cell::Map, reserved)?;
        return Some(());
    }

    let games = params.games_played;
    if games >= VETERAN_GAMES {
        let mut taken = vec![maze.exit().y];
        if let Some(fake) = place_fake_exit(maze, rng, &taken) {
            taken.push(fake.y);
        }
        if games >= EXPERT_GAMES {
            place_fake_exit(maze, rng, &taken);
        }
        place_pickup(maze, rng, Cell::CrystalBall, reserved)?;
    }
    place_pickup(maze, rng, Cell::Map, reserved)?;
    for _ in 0..key_powerup_count(rng, games) {
        let reward = key_reward(rng, games);
        place_pickup(maze, rng, Cell::KeyPowerup { reward }, reserved)?;
    }
    scatter_traps(maze, rng, trap_density(games));
    Some(())
}

/// Fraction of eligible path cells that become traps.
pub fn trap_density(games_played: u32) -> f32 {
    match games_played {
        0..=2 => 0.0,
        3..=9 => 0.05,
        10..=19 => 0.12,
        _ => 0.18,
    }
}

pub fn key_powerup_count(rng: &mut Prng, games_played: u32) -> usize {
    let extra = usize::from(rng.chance(0.30));
    if games_played < EXPERT_GAMES {
        1 + extra
    } else {
        2 + extra
    }
}

pub fn key_reward(rng: &mut Prng, games_played: u32) -> u8 {
    let top = if games_played < EXPERT_GAMES { 2 } else { 3 };
    rng.gen_range_u32(1, top + 1) as u8
}

fn scatter_walls(maze: &mut Maze, rng: &mut Prng, chance: f32) {
    let (start, exit) = (maze.start(), maze.exit());
    for y in 1..maze.height() - 1 {
        for x in 1..maze.width() - 1 {
            let pos = Position::new(x, y);
            if pos.manhattan(start) <= 1 || pos.manhattan(exit) <= 1 {
                continue;
            }
            if rng.chance(chance) {
                maze.set(pos, Cell::Wall);
            }
        }
    }
}

// Doors land where a path meets a wall, i.e. at chokepoints.
fn place_doors(maze: &mut Maze, rng: &mut Prng, chance: f32) {
    let entries = [maze.start_entry(), maze.exit_entry()];
    for y in 1..maze.height() - 1 {
        for x in 1..maze.width() - 1 {
            let pos = Position::new(x, y);
            if entries.contains(&pos) || maze.get(pos) != Some(Cell::Path) {
                continue;
            }
            let touches_wall = maze
                .neighbors(pos)
                .any(|n| maze.get(n) == Some(Cell::Wall));
            if touches_wall && rng.chance(chance) {
                maze.set(pos, Cell::Door);
            }
        }
    }
}

fn ensure_route(maze: &mut Maze, rng: &mut Prng) {
    let mut passes = 0u32;
    while !reachable(maze, maze.start_entry(), maze.exit_entry(), GENERATION) {
        carve_corridor(maze, rng);
        passes += 1;
    }
    if passes > 0 {
        debug!(passes, "carved corridor to connect exit");
    }
}

/// Walks from the exit entry back to the start column, opening every cell on
/// the way and drifting toward the start row. The result is always a complete
/// route, which is what lets `ensure_route` terminate.
fn carve_corridor(maze: &mut Maze, rng: &mut Prng) {
    let from = maze.exit_entry();
    let to = maze.start_entry();
    let (mut x, mut y) = (from.x, from.y);

    loop {
        open_cell(maze, rng, Position::new(x, y));
        if x <= to.x {
            break;
        }
        if y != to.y && rng.chance(CARVE_DRIFT_CHANCE) {
            y = step_toward(y, to.y);
            open_cell(maze, rng, Position::new(x, y));
        }
        x -= 1;
    }

    while y != to.y {
        y = step_toward(y, to.y);
        open_cell(maze, rng, Position::new(x, y));
    }
}

fn step_toward(from: u32, to: u32) -> u32 {
    if from < to {
        from + 1
    } else {
        from - 1
    }
}

fn open_cell(maze: &mut Maze, rng: &mut Prng, pos: Position) {
    let door = rng.chance(CARVE_DOOR_CHANCE);
    let entry = pos == maze.start_entry() || pos == maze.exit_entry();
    maze.set(pos, if door && !entry { Cell::Door } else { Cell::Path });
}

fn place_fake_exit(maze: &mut Maze, rng: &mut Prng, taken_rows: &[u32]) -> Option<Position> {
    let x = maze.width() - 1;
    for _ in 0..FAKE_EXIT_ATTEMPTS {
        let y = rng.gen_range_u32(1, maze.height() - 1);
        if taken_rows.contains(&y) {
            continue;
        }
        let border = Position::new(x, y);
        let inner = Position::new(x - 1, y);
        if maze.get(border) == Some(Cell::Wall) && maze.get(inner) == Some(Cell::Path) {
            maze.set(border, Cell::FakeExit);
            return Some(border);
        }
    }
    None
}

/// Would the exit stay reachable if `pos` became `cell`?
fn keeps_route(maze: &mut Maze, pos: Position, cell: Cell) -> bool {
    let Some(prev) = maze.get(pos) else {
        return false;
    };
    maze.set(pos, cell);
    let ok = reachable(maze, maze.start_entry(), maze.exit_entry(), GENERATION);
    maze.set(pos, prev);
    ok
}

/// Entry row across to the exit column, then along it to the exit entry.
fn straight_route(maze: &Maze) -> Vec<Position> {
    let (from, to) = (maze.start_entry(), maze.exit_entry());
    let mut route: Vec<Position> = (from.x..=to.x).map(|x| Position::new(x, from.y)).collect();
    let mut y = from.y;
    while y != to.y {
        y = step_toward(y, to.y);
        route.push(Position::new(to.x, y));
    }
    route
}

/// Reachable plain path cells, excluding the entry cells and `reserved`, in
/// row-major order.
fn pickup_candidates(maze: &Maze, reserved: &[Position]) -> Vec<Position> {
    let entries = [maze.start_entry(), maze.exit_entry()];
    let mut cells: Vec<Position> = reachable_from(maze, maze.start_entry(), PLACEMENT)
        .into_iter()
        .filter(|p| {
            !entries.contains(p) && !reserved.contains(p) && maze.get(*p) == Some(Cell::Path)
        })
        .collect();
    cells.sort_by_key(|p| (p.y, p.x));
    cells
}

/// Random guarded tries, then a scan for the first guarded candidate. `None`
/// when no cell can take the pickup without cutting the route.
fn place_pickup(
    maze: &mut Maze,
    rng: &mut Prng,
    cell: Cell,
    reserved: &[Position],
) -> Option<Position> {
    let candidates = pickup_candidates(maze, reserved);
    if candidates.is_empty() {
        debug!(kind = ?cell.kind(), "no reachable path cell left for pickup");
        return None;
    }

    for _ in 0..PLACEMENT_ATTEMPTS {
        let pos = candidates[rng.gen_range_usize(0, candidates.len())];
        if keeps_route(maze, pos, cell) {
            maze.set(pos, cell);
            return Some(pos);
        }
    }

    let found = candidates
        .iter()
        .copied()
        .find(|&p| keeps_route(maze, p, cell));
    match found {
        Some(pos) => {
            debug!(?pos, kind = ?cell.kind(), "pickup placed by scan");
            maze.set(pos, cell);
            Some(pos)
        }
        None => {
            debug!(kind = ?cell.kind(), "every candidate would cut the route");
            None
        }
    }
}

fn scatter_traps(maze: &mut Maze, rng: &mut Prng, density: f32) {
    if density <= 0.0 {
        return;
    }
    let exit_entry = maze.exit_entry();
    for y in 1..maze.height() - 1 {
        for x in 2..maze.width() - 1 {
            let pos = Position::new(x, y);
            if pos == exit_entry || maze.get(pos) != Some(Cell::Path) {
                continue;
            }
            if maze.neighbors(pos).any(|n| maze.get(n) == Some(Cell::Door)) {
                continue;
            }
            if !rng.chance(density) {
                continue;
            }
            let style = TrapStyle::ALL[rng.gen_range_usize(0, TrapStyle::ALL.len())];
            let trap = Cell::Trap { style };
            if keeps_route(maze, pos, trap) {
                maze.set(pos, trap);
            }
        }
    }
}

fn clear_outer_rows(maze: &mut Maze) {
    let bottom = maze.height() - 1;
    for x in 1..maze.width() - 1 {
        maze.set(Position::new(x, 0), Cell::Path);
        maze.set(Position::new(x, bottom), Cell::Path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: u32 = 18;
    const H: u32 = 9;

    fn build(seed: u64, games: u32, casual: bool) -> Maze {
        let mut rng = Prng::new(seed);
        generate_with(
            &mut rng,
            GenParams::new(W, H).games_played(games).casual(casual),
        )
    }

    #[test]
    fn same_seed_same_layout() {
        assert_eq!(build(11, 12, false), build(11, 12, false));
        assert_ne!(build(11, 12, false), build(12, 12, false));
    }

    #[test]
    fn exit_is_always_reachable() {
        for seed in 0..200 {
            for games in [0, 3, 10, 25] {
                let maze = build(seed, games, false);
                assert!(
                    reachable(&maze, maze.start_entry(), maze.exit_entry(), GENERATION),
                    "seed {seed} games {games}"
                );
            }
            let casual = build(seed, 30, true);
            assert!(reachable(
                &casual,
                casual.start_entry(),
                casual.exit_entry(),
                GENERATION
            ));
        }
    }

    fn check_counts(maze: &Maze, games: u32, casual: bool, label: &str) {
        assert!(
            reachable(maze, maze.start_entry(), maze.exit_entry(), GENERATION),
            "{label}: exit cut off"
        );
        assert_eq!(maze.count(CellKind::Map), 1, "{label}: map count");

        let crystal = usize::from(!casual && games >= VETERAN_GAMES);
        assert_eq!(maze.count(CellKind::CrystalBall), crystal, "{label}: crystal balls");

        let keys = maze.count(CellKind::KeyPowerup);
        let expected = match (casual, games >= EXPERT_GAMES) {
            (true, _) => 0..=0,
            (false, false) => 1..=2,
            (false, true) => 2..=3,
        };
        assert!(expected.contains(&keys), "{label}: {keys} key powerups");
    }

    fn sweep(width: u32, height: u32, seeds: std::ops::Range<u64>) {
        for seed in seeds {
            for games in [0, 3, 10, 25] {
                for casual in [false, true] {
                    let mut rng = Prng::new(seed);
                    let params = GenParams::new(width, height)
                        .games_played(games)
                        .casual(casual);
                    let maze = generate_with(&mut rng, params);
                    let label = format!("{width}x{height} seed {seed} games {games} casual {casual}");
                    check_counts(&maze, games, casual, &label);
                }
            }
        }
    }

    #[test]
    fn smallest_grid_keeps_route_and_pickups() {
        sweep(MIN_WIDTH, MIN_HEIGHT, 0..3000);
    }

    #[test]
    fn mid_size_grids_keep_route_and_pickups() {
        sweep(8, 5, 0..1500);
        sweep(10, 6, 0..3000);
    }

    #[test]
    fn default_grid_keeps_route_and_pickups() {
        sweep(W, H, 0..600);
    }

    #[test]
    fn open_layout_fits_every_pickup_on_the_smallest_grid() {
        for seed in 0..500 {
            for games in [0, 3, 10, 25] {
                let mut rng = Prng::new(seed);
                let params = GenParams::new(MIN_WIDTH, MIN_HEIGHT).games_played(games);
                let maze = build_layout(&mut rng, &params, MIN_WIDTH, MIN_HEIGHT, &OPEN)
                    .unwrap_or_else(|| panic!("seed {seed} games {games}: open layout failed"));
                check_counts(&maze, games, false, &format!("open seed {seed} games {games}"));
                assert_eq!(maze.count(CellKind::Door), 0);
                for pos in straight_route(&maze) {
                    assert!(matches!(maze.get(pos), Some(Cell::Path)), "{pos:?} blocked");
                }
            }
        }
    }

    #[test]
    fn scan_refuses_cells_that_cut_the_route() {
        // One-cell corridor: every interior path cell is on the only route.
        let mut rng = Prng::new(1);
        let mut maze = Maze::blank(7, 5, Cell::Wall);
        maze.set_endpoints(Position::new(0, 2), Position::new(6, 2));
        for x in 1..6 {
            maze.set(Position::new(x, 2), Cell::Path);
        }
        assert_eq!(place_pickup(&mut maze, &mut rng, Cell::Map, &[]), None);
        assert_eq!(maze.count(CellKind::Map), 0);
        assert!(reachable(&maze, maze.start_entry(), maze.exit_entry(), GENERATION));

        maze.set(Position::new(3, 1), Cell::Path);
        assert_eq!(
            place_pickup(&mut maze, &mut rng, Cell::Map, &[]),
            Some(Position::new(3, 1))
        );
    }

    #[test]
    fn border_is_wall_except_breakouts() {
        for seed in 0..100 {
            let maze = build(seed, 15, false);
            assert_eq!(maze.width(), W);
            assert_eq!(maze.height(), H);
            for (pos, cell) in maze.iter().filter(|(p, _)| maze.is_border(*p)) {
                let allowed = matches!(cell, Cell::Wall | Cell::FakeExit)
                    || pos == maze.start()
                    || pos == maze.exit();
                assert!(allowed, "seed {seed}: {cell:?} at {pos:?}");
            }
            assert_eq!(maze.start().x, 0);
            assert_eq!(maze.exit().x, W - 1);
            assert!(maze
                .positions_of(CellKind::FakeExit)
                .all(|p| p.x == W - 1 && p.y != maze.exit().y));
        }
    }

    #[test]
    fn level_two_clears_top_and_bottom_rows() {
        let mut rng = Prng::new(5);
        let maze = generate_with(&mut rng, GenParams::new(W, H).level(2));
        for x in 1..W - 1 {
            assert_eq!(maze.get(Position::new(x, 0)), Some(Cell::Path));
            assert_eq!(maze.get(Position::new(x, H - 1)), Some(Cell::Path));
        }
        assert_eq!(maze.get(Position::new(0, 0)), Some(Cell::Wall));
    }

    #[test]
    fn casual_mode_has_only_a_map() {
        for seed in 0..100 {
            let maze = build(seed, 40, true);
            assert_eq!(maze.count(CellKind::Start), 1);
            assert_eq!(maze.count(CellKind::Exit), 1);
            assert_eq!(maze.count(CellKind::Map), 1);
            assert_eq!(maze.count(CellKind::Trap), 0);
            assert_eq!(maze.count(CellKind::CrystalBall), 0);
            assert_eq!(maze.count(CellKind::FakeExit), 0);
        }
    }

    #[test]
    fn newcomers_get_no_hazards() {
        for seed in 0..100 {
            let maze = build(seed, 2, false);
            assert_eq!(maze.count(CellKind::CrystalBall), 0);
            assert_eq!(maze.count(CellKind::Trap), 0);
            assert_eq!(maze.count(CellKind::FakeExit), 0);
            assert_eq!(maze.count(CellKind::Map), 1);
            let keys = maze.count(CellKind::KeyPowerup);
            assert!((1..=2).contains(&keys), "seed {seed}: {keys} key powerups");
            for (_, cell) in maze.iter() {
                if let Cell::KeyPowerup { reward } = cell {
                    assert!((1..=2).contains(&reward));
                }
            }
        }
    }

    #[test]
    fn veterans_get_crystal_ball_and_more_keys() {
        for seed in 0..100 {
            let maze = build(seed, 12, false);
            assert_eq!(maze.count(CellKind::CrystalBall), 1);
            assert_eq!(maze.count(CellKind::Map), 1);
            assert!(maze.count(CellKind::FakeExit) <= 2);
            let keys = maze.count(CellKind::KeyPowerup);
            assert!((2..=3).contains(&keys), "seed {seed}: {keys} key powerups");
        }
    }

    #[test]
    fn traps_respect_placement_rules() {
        let mut total = 0;
        for seed in 0..100 {
            let maze = build(seed, 25, false);
            for pos in maze.positions_of(CellKind::Trap) {
                total += 1;
                assert!(pos.x >= 2);
                assert_ne!(pos, maze.exit_entry());
                assert!(maze.neighbors(pos).all(|n| maze.get(n) != Some(Cell::Door)));
            }
        }
        assert!(total > 0, "expected some traps at 25 games");
    }

    #[test]
    fn pickups_sit_on_reachable_cells() {
        for seed in 0..50 {
            let maze = build(seed, 12, false);
            // Traps can be disarmed, so a pickup behind one still counts.
            let region = reachable_from(&maze, maze.start_entry(), PLACEMENT.with(CellKind::Trap));
            for kind in [CellKind::Map, CellKind::CrystalBall, CellKind::KeyPowerup] {
                for pos in maze.positions_of(kind) {
                    assert!(region.contains(&pos), "seed {seed}: {kind:?} at {pos:?}");
                }
            }
        }
    }

    #[test]
    fn density_table() {
        assert_eq!(trap_density(0), 0.0);
        assert_eq!(trap_density(3), 0.05);
        assert_eq!(trap_density(10), 0.12);
        assert_eq!(trap_density(20), 0.18);
    }

    #[test]
    fn tiny_requests_are_clamped() {
        let mut rng = Prng::new(3);
        let maze = generate_with(&mut rng, GenParams::new(1, 1));
        assert_eq!(maze.width(), MIN_WIDTH);
        assert_eq!(maze.height(), MIN_HEIGHT);
    }
}

//! Terminal front-end: an ASCII renderer and a line-driven runtime loop that
//! stands in for the embedded view's event loop.
//!
//! Input is read line by line (`w`/`a`/`s`/`d`, `p`, empty line for Enter),
//! so it works in any terminal without raw mode.

use std::io::{self, BufRead, Write};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, warn};

use crate::config::GameConfig;
use crate::host::{AssetResolver, HostController, Leaderboard};
use crate::maze::{Cell, Position};
use crate::protocol::{HostMessage, ViewMessage};
use crate::session::{LossCause, Phase, Session};
use crate::view::{Banner, Cue, Effect, EmbeddedView, Input, Key};

const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("bad message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("host refused request: {0}")]
    Remote(String),
    #[error("host closed the connection")]
    Closed,
}

/// Carries view messages to a host and returns the host's replies.
pub trait HostLink {
    fn send(&mut self, msg: &ViewMessage) -> Result<Vec<HostMessage>, LinkError>;
}

/// In-process host: a controller plus its own leaderboard.
pub struct LocalHost<R: AssetResolver> {
    controller: HostController<R>,
    board: Leaderboard,
}

impl<R: AssetResolver> LocalHost<R> {
    pub fn new(controller: HostController<R>) -> Self {
        Self {
            controller,
            board: Leaderboard::new(),
        }
    }

    pub fn leaderboard(&self) -> &Leaderboard {
        &self.board
    }

    pub fn controller(&self) -> &HostController<R> {
        &self.controller
    }
}

impl<R: AssetResolver> HostLink for LocalHost<R> {
    fn send(&mut self, msg: &ViewMessage) -> Result<Vec<HostMessage>, LinkError> {
        Ok(self.controller.handle(msg.clone(), &mut self.board))
    }
}

// ─── rendering ──────────────────────────────────────────────────────────────

fn glyph(cell: Cell) -> char {
    match cell {
        Cell::Path => '.',
        Cell::Wall => '#',
        Cell::Door => '+',
        Cell::Start => 'S',
        // Fake exits look exactly like the real one.
        Cell::Exit | Cell::FakeExit => 'E',
        Cell::CrystalBall => 'o',
        Cell::Map => 'm',
        Cell::KeyPowerup { .. } => 'k',
        Cell::Trap { .. } => '^',
    }
}

/// Board with fog of war. Remembered tiles keep only their walls.
pub fn render_board(session: &Session) -> String {
    let maze = session.maze();
    let mut out = String::with_capacity(((maze.width() + 1) * maze.height()) as usize);
    for y in 0..maze.height() {
        for x in 0..maze.width() {
            let pos = Position::new(x, y);
            let ch = if pos == session.player() {
                '@'
            } else if session.is_visible(pos) {
                match maze.get(pos) {
                    Some(Cell::Door) if session.door_hits(pos) > 0 => '%',
                    Some(cell) => glyph(cell),
                    None => ' ',
                }
            } else if session.is_explored(pos) {
                match maze.get(pos) {
                    Some(Cell::Wall) => '#',
                    _ => ',',
                }
            } else {
                ' '
            };
            out.push(ch);
        }
        out.push('\n');
    }
    out
}

pub fn render_hud(session: &Session) -> String {
    let mut hud = format!(
        "{}  level {}  lives {}  keys {}  time {:>2}s  score {}  streak {}",
        if session.username().is_empty() {
            "player"
        } else {
            session.username()
        },
        session.level(),
        session.lives(),
        session.keys(),
        session.time_remaining(),
        session.total_score(),
        session.win_streak(),
    );
    if session.is_paused() {
        hud.push_str("  [paused]");
    }
    hud
}

pub fn banner_text(banner: &Banner) -> String {
    match banner {
        Banner::Won { card, bonus_key } => {
            let mut text = format!(
                "You escaped! score {} (base {} + streak {})  {:.1} stars. Enter for the next maze.",
                card.total_score, card.base_score, card.streak_bonus, card.rating
            );
            if *bonus_key {
                text.push_str(" Bonus key earned!");
            }
            text
        }
        Banner::Lost { cause, lives } => {
            let why = match cause {
                LossCause::Trap => "A trap got you.",
                LossCause::FakeExit => "That exit was a fake.",
                LossCause::TimeUp => "Time is up.",
            };
            format!("{why} {lives} lives left. Enter to retry.")
        }
        Banner::NoLives => "No lives left. Type q to quit.".to_string(),
        Banner::Paused => "Paused. p to resume.".to_string(),
        Banner::KeyCap => "Key pouch is full.".to_string(),
        Banner::BonusKey => "Streak bonus: one extra key this maze.".to_string(),
    }
}

// ─── runtime ────────────────────────────────────────────────────────────────

/// One line of player input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Input(Key),
    Retry,
    Next,
    Quit,
    Exit,
}

/// Splits a line into commands; an empty line is Enter.
pub fn parse_line(line: &str) -> Vec<Command> {
    let line = line.trim();
    match line {
        "" => return vec![Command::Input(Key::Enter)],
        "q" | "quit" => return vec![Command::Quit],
        "x" | "exit" => return vec![Command::Exit],
        "r" | "retry" => return vec![Command::Retry],
        "n" | "next" => return vec![Command::Next],
        _ => {}
    }
    line.chars()
        .filter(|c| !c.is_whitespace())
        .filter_map(|c| Key::parse(c.encode_utf8(&mut [0; 4])))
        .map(Command::Input)
        .collect()
}

/// The view plus the host link and the pending delayed inputs.
pub struct Console<L: HostLink> {
    view: EmbeddedView,
    link: L,
    pending: Vec<(Instant, Input)>,
    banner: Option<String>,
    dirty: bool,
    exited: bool,
}

impl<L: HostLink> Console<L> {
    pub fn new(config: GameConfig, link: L) -> Self {
        Self {
            view: EmbeddedView::new(config),
            link,
            pending: Vec::new(),
            banner: None,
            dirty: false,
            exited: false,
        }
    }

    pub fn view(&self) -> &EmbeddedView {
        &self.view
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn start(&mut self) -> Result<(), LinkError> {
        let effects = self.view.start();
        self.apply(effects)
    }

    pub fn is_finished(&self) -> bool {
        self.exited || self.view.gave_up() || self.view.phase() == Phase::Quit
    }

    pub fn command(&mut self, cmd: Command) -> Result<(), LinkError> {
        let input = match cmd {
            Command::Input(key) => Input::Key(key),
            Command::Retry => Input::Retry,
            Command::Next => Input::NextGame,
            Command::Quit if self.view.phase() == Phase::NoLives => Input::Quit,
            Command::Quit | Command::Exit => {
                self.exited = true;
                return Ok(());
            }
        };
        self.dispatch(input)
    }

    pub fn dispatch(&mut self, input: Input) -> Result<(), LinkError> {
        let effects = self.view.handle(input);
        self.apply(effects)
    }

    /// Fires every delayed input due at `now`.
    pub fn fire_due(&mut self, now: Instant) -> Result<(), LinkError> {
        let (due, later): (Vec<_>, Vec<_>) = self.pending.drain(..).partition(|(at, _)| *at <= now);
        self.pending = later;
        for (_, input) in due {
            self.dispatch(input)?;
        }
        Ok(())
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.iter().map(|(at, _)| *at).min()
    }

    fn apply(&mut self, effects: Vec<Effect>) -> Result<(), LinkError> {
        let mut queue = effects;
        while !queue.is_empty() {
            let mut next = Vec::new();
            for effect in queue {
                match effect {
                    Effect::Send(msg) => {
                        for reply in self.link.send(&msg)? {
                            next.extend(self.view.handle(Input::Host(reply)));
                        }
                    }
                    Effect::Render(Cue::Banner(banner)) => {
                        self.banner = Some(banner_text(&banner));
                        self.dirty = true;
                    }
                    Effect::Render(Cue::Board) => {
                        if self.view.phase() == Phase::Playing && !self.is_paused() {
                            self.banner = None;
                        }
                        self.dirty = true;
                    }
                    Effect::Render(cue) => {
                        debug!(?cue, "render cue");
                        self.dirty = true;
                    }
                    Effect::Schedule { delay_ms, input } => {
                        self.pending
                            .push((Instant::now() + Duration::from_millis(delay_ms), input));
                    }
                }
            }
            queue = next;
        }
        Ok(())
    }

    fn is_paused(&self) -> bool {
        self.view.session().is_some_and(Session::is_paused)
    }

    /// The whole screen, or `None` when nothing changed since the last frame.
    pub fn take_frame(&mut self) -> Option<String> {
        if !std::mem::take(&mut self.dirty) {
            return None;
        }
        let session = self.view.session()?;
        let mut frame = render_board(session);
        frame.push_str(&render_hud(session));
        frame.push('\n');
        if let Some(banner) = &self.banner {
            frame.push_str(banner);
            frame.push('\n');
        }
        Some(frame)
    }
}

/// Plays on stdin/stdout until the session quits, the player exits, or the
/// host never delivers a maze.
pub fn run<L: HostLink>(console: &mut Console<L>, out: &mut impl Write) -> Result<(), LinkError> {
    let (tx, rx) = mpsc::channel::<String>();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    console.start()?;
    let mut next_tick = Instant::now() + TICK;

    while !console.is_finished() {
        if let Some(frame) = console.take_frame() {
            write!(out, "\x1b[2J\x1b[H{frame}> ")?;
            out.flush()?;
        }

        let now = Instant::now();
        let wake = console.next_deadline().map_or(next_tick, |d| d.min(next_tick));
        match rx.recv_timeout(wake.saturating_duration_since(now)) {
            Ok(line) => {
                for cmd in parse_line(&line) {
                    console.command(cmd)?;
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                warn!("stdin closed");
                break;
            }
        }

        let now = Instant::now();
        console.fire_due(now)?;
        if now >= next_tick {
            console.dispatch(Input::Tick)?;
            next_tick += TICK;
        }
    }

    if let Some(frame) = console.take_frame() {
        write!(out, "\x1b[2J\x1b[H{frame}")?;
    }
    if console.view.gave_up() {
        writeln!(out, "No maze arrived from the host.")?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::StaticAssets;
    use crate::protocol::InitialData;

    const W: Cell = Cell::Wall;
    const P: Cell = Cell::Path;

    fn session() -> Session {
        let data = InitialData {
            username: "ada".into(),
            keys: 1,
            lives: 3,
            maze: vec![
                vec![W, W, W, W, W, W, W],
                vec![W, P, P, P, P, P, W],
                vec![Cell::Start, P, P, P, P, P, Cell::Exit],
                vec![W, P, P, P, P, P, Cell::FakeExit],
                vec![W, W, W, W, W, W, W],
            ],
            ..Default::default()
        };
        Session::from_initial(GameConfig::default(), &data).unwrap()
    }

    #[test]
    fn board_hides_unexplored_tiles() {
        let s = session();
        let board = render_board(&s);
        let lines: Vec<&str> = board.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[1], "#.     ");
        assert_eq!(lines[2], "@.     ");
    }

    #[test]
    fn fake_exit_renders_like_the_exit() {
        assert_eq!(glyph(Cell::FakeExit), glyph(Cell::Exit));
    }

    #[test]
    fn hud_shows_resources() {
        let hud = render_hud(&session());
        assert!(hud.starts_with("ada  level 1  lives 3  keys 1  time 30s"));
    }

    #[test]
    fn line_parsing() {
        use crate::session::Direction;

        assert_eq!(parse_line(""), vec![Command::Input(Key::Enter)]);
        assert_eq!(parse_line("q"), vec![Command::Quit]);
        assert_eq!(
            parse_line("dd s"),
            vec![
                Command::Input(Key::Move(Direction::Right)),
                Command::Input(Key::Move(Direction::Right)),
                Command::Input(Key::Move(Direction::Down)),
            ]
        );
        assert_eq!(parse_line("p"), vec![Command::Input(Key::Pause)]);
    }

    #[test]
    fn local_host_session_plays_through_console() {
        let controller =
            HostController::new(GameConfig::default(), "ada", StaticAssets::new()).with_seed(3);
        let mut console = Console::new(GameConfig::default(), LocalHost::new(controller));
        console.start().unwrap();
        assert_eq!(console.view().phase(), Phase::Playing);
        assert!(console.take_frame().is_some());
        assert!(console.take_frame().is_none());

        console.command(Command::Input(Key::Pause)).unwrap();
        assert_eq!(console.banner(), Some("Paused. p to resume."));
        console.command(Command::Exit).unwrap();
        assert!(console.is_finished());
    }
}

//! One play session: the maze being played, the player, resources, fog of
//! war, the countdown, and the win/loss/retry lifecycle.
//!
//! Every transition is synchronous and returns the [`SessionEvent`]s it
//! produced. Rendering and messaging are left to whoever consumes the events.

use hashbrown::{HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::GameConfig;
use crate::maze::{Cell, CellKind, Maze, MazeError, Position};
use crate::protocol::InitialData;
use crate::scoring::{self, RunMetrics, ScoreCard};
use crate::stats::PlayerStats;
use crate::timer::{Countdown, Tick};

pub const MAX_KEYS: u32 = 12;
/// Blocked attempts that break a door open without a key.
pub const DOOR_BREAK_HITS: u32 = 10;
pub const TRAP_DISARM_COST: u32 = 2;
const DOOR_MIN_OPACITY: f32 = 0.3;

pub const BASE_VIEW_RADIUS: u32 = 1;
pub const MAP_VIEW_RADIUS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("invalid maze payload: {0}")]
    Maze(#[from] MazeError),
    #[error("cannot {action} while {phase:?}")]
    Transition { action: &'static str, phase: Phase },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Right => (1, 0),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Right => "right",
            Direction::Down => "down",
            Direction::Left => "left",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossCause {
    Trap,
    FakeExit,
    TimeUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for a maze from the host.
    Loading,
    Playing,
    Won,
    /// Lost a life, at least one remains.
    Lost(LossCause),
    /// Lost the last life; only quitting is possible.
    NoLives,
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Loaded { bonus_key: bool },
    Moved { to: Position },
    DoorUnlocked { at: Position, keys: u32 },
    DoorCracked { at: Position, hits: u32, opacity: f32 },
    DoorBroken { at: Position },
    TrapDisarmed { disarm: Disarm, keys: u32 },
    MapActivated,
    CrystalActivated { revealed: usize },
    KeysGained { gained: u32, keys: u32 },
    KeyCapReached,
    TimerTick { remaining: u32 },
    Paused { remaining: u32 },
    Resumed { remaining: u32 },
    Won { card: ScoreCard, bonus_key: bool },
    Lost { cause: LossCause, lives: u32 },
    RetryStarted,
    NextGameRequested { lives: u32 },
    QuitRequested,
}

/// One trap disarm in progress. `seq` never repeats within a session, so a
/// settle left over from an earlier run cannot clear a later guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Disarm {
    pub at: Position,
    pub seq: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pickup {
    Map,
    CrystalBall,
    Key(u8),
}

#[derive(Debug, Clone)]
pub struct Session {
    config: GameConfig,
    username: String,
    level: u32,
    casual: bool,
    games_played: u32,

    /// Layout as delivered, restored on a local retry.
    pristine: Maze,
    maze: Maze,
    player: Position,
    keys: u32,
    keys_at_load: u32,
    lives: u32,

    view_radius: u32,
    visible: HashSet<Position>,
    explored: HashSet<Position>,
    /// Tiles revealed by the crystal ball; visible regardless of distance.
    revealed: HashSet<Position>,
    door_hits: HashMap<Position, u32>,

    move_count: u32,
    retry_count: u32,
    win_streak: u32,
    total_score: u32,
    is_game_over: bool,

    phase: Phase,
    timer: Countdown,
    paused_at: Option<u32>,
    disarming: Option<Disarm>,
    disarm_seq: u32,
    last_card: Option<ScoreCard>,
    stats: PlayerStats,
}

impl Session {
    /// Builds the session from the first valid `initialData`. A payload
    /// without a usable maze is rejected and nothing is created.
    pub fn from_initial(config: GameConfig, data: &InitialData) -> Result<Self, SessionError> {
        let maze = Maze::from_rows(data.maze.clone())?;
        let timer = Countdown::new(config.time_budget_secs);
        let mut session = Self {
            config,
            username: String::new(),
            level: 1,
            casual: false,
            games_played: 0,
            pristine: maze.clone(),
            player: maze.start(),
            maze,
            keys: 0,
            keys_at_load: 0,
            lives: 0,
            view_radius: BASE_VIEW_RADIUS,
            visible: HashSet::new(),
            explored: HashSet::new(),
            revealed: HashSet::new(),
            door_hits: HashMap::new(),
            move_count: 0,
            retry_count: 0,
            win_streak: 0,
            total_score: 0,
            is_game_over: false,
            phase: Phase::Loading,
            timer,
            paused_at: None,
            disarming: None,
            disarm_seq: 0,
            last_card: None,
            stats: PlayerStats::new(),
        };
        session.apply_initial(data)?;
        Ok(session)
    }

    /// Replaces the maze wholesale (next game, host-side retry, new game).
    /// Meta counters (streak, total score, stats) carry over.
    pub fn load(&mut self, data: &InitialData) -> Result<Vec<SessionEvent>, SessionError> {
        self.apply_initial(data)?;
        Ok(vec![SessionEvent::Loaded {
            bonus_key: data.should_show_bonus_key,
        }])
    }

    fn apply_initial(&mut self, data: &InitialData) -> Result<(), SessionError> {
        let maze = Maze::from_rows(data.maze.clone())?;

        if !data.username.is_empty() {
            self.username = data.username.clone();
        }
        self.level = data.level.max(1);
        self.casual = data.is_casual_mode;
        if let Some(games) = data.games_played {
            self.games_played = games;
        }
        if data.is_new_game() {
            self.retry_count = 0;
        }
        self.lives = data.lives;
        self.keys_at_load = data.keys.min(MAX_KEYS);
        self.pristine = maze.clone();
        self.maze = maze;
        self.timer = Countdown::new(self.config.time_budget_secs);
        self.reset_run();

        info!(
            user = %self.username,
            level = self.level,
            games = self.games_played,
            retry = data.is_retry,
            casual = self.casual,
            "maze loaded"
        );
        Ok(())
    }

    /// Per-maze state back to its starting values; the maze itself is untouched.
    fn reset_run(&mut self) {
        self.player = self.maze.start();
        self.keys = self.keys_at_load;
        self.view_radius = BASE_VIEW_RADIUS;
        self.visible.clear();
        self.explored.clear();
        self.revealed.clear();
        self.door_hits.clear();
        self.move_count = 0;
        self.is_game_over = false;
        self.paused_at = None;
        self.disarming = None;
        self.last_card = None;
        self.phase = Phase::Playing;
        self.timer.restart();
        self.refresh_visibility();
        self.stats.sync_resources(self.keys, self.lives);
    }

    // ─── accessors ──────────────────────────────────────────────────────────

    pub fn maze(&self) -> &Maze {
        &self.maze
    }

    pub fn player(&self) -> Position {
        self.player
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn is_casual(&self) -> bool {
        self.casual
    }

    pub fn games_played(&self) -> u32 {
        self.games_played
    }

    pub fn keys(&self) -> u32 {
        self.keys
    }

    pub fn lives(&self) -> u32 {
        self.lives
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    pub fn is_game_over(&self) -> bool {
        self.is_game_over
    }

    pub fn is_disarming(&self) -> bool {
        self.disarming.is_some()
    }

    pub fn view_radius(&self) -> u32 {
        self.view_radius
    }

    pub fn is_visible(&self, pos: Position) -> bool {
        self.visible.contains(&pos)
    }

    pub fn is_explored(&self, pos: Position) -> bool {
        self.explored.contains(&pos)
    }

    pub fn explored_count(&self) -> usize {
        self.explored.len()
    }

    pub fn door_hits(&self, at: Position) -> u32 {
        self.door_hits.get(&at).copied().unwrap_or(0)
    }

    /// Render opacity of a door: 1.0 untouched, fading linearly to 0.3 at the
    /// breaking hit.
    pub fn door_opacity(&self, at: Position) -> f32 {
        door_opacity_for(self.door_hits(at))
    }

    pub fn move_count(&self) -> u32 {
        self.move_count
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn win_streak(&self) -> u32 {
        self.win_streak
    }

    pub fn total_score(&self) -> u32 {
        self.total_score
    }

    pub fn time_remaining(&self) -> u32 {
        self.paused_at.unwrap_or_else(|| self.timer.remaining())
    }

    pub fn last_card(&self) -> Option<&ScoreCard> {
        self.last_card.as_ref()
    }

    pub fn stats(&self) -> &PlayerStats {
        &self.stats
    }

    fn accepts_moves(&self) -> bool {
        self.phase == Phase::Playing && !self.is_game_over && !self.is_paused() && !self.is_disarming()
    }

    // ─── input ──────────────────────────────────────────────────────────────

    pub fn try_move(&mut self, dir: Direction) -> Vec<SessionEvent> {
        let (dx, dy) = dir.delta();
        match self.player.offset(dx, dy) {
            Some(target) => self.step_into(target),
            None => Vec::new(),
        }
    }

    /// Click on a cell; only an orthogonal neighbour of the player moves.
    pub fn click(&mut self, target: Position) -> Vec<SessionEvent> {
        if !self.player.is_adjacent(target) {
            return Vec::new();
        }
        self.step_into(target)
    }

    fn step_into(&mut self, target: Position) -> Vec<SessionEvent> {
        if !self.accepts_moves() || !self.player.is_adjacent(target) {
            return Vec::new();
        }
        let Some(cell) = self.maze.get(target) else {
            return Vec::new();
        };

        match cell {
            Cell::Wall => Vec::new(),
            Cell::Path | Cell::Start | Cell::Exit | Cell::FakeExit => {
                let mut events = vec![self.move_to(target)];
                if target.x + 1 == self.maze.width() {
                    match cell {
                        Cell::Exit => events.push(self.win()),
                        Cell::FakeExit => events.push(self.lose(LossCause::FakeExit)),
                        _ => {}
                    }
                }
                events
            }
            Cell::Door => vec![self.hit_door(target)],
            Cell::CrystalBall => self.collect(target, Pickup::CrystalBall),
            Cell::Map => self.collect(target, Pickup::Map),
            Cell::KeyPowerup { reward } => self.collect(target, Pickup::Key(reward)),
            Cell::Trap { .. } => vec![self.hit_trap(target)],
        }
    }

    fn move_to(&mut self, target: Position) -> SessionEvent {
        self.player = target;
        self.move_count += 1;
        self.refresh_visibility();
        SessionEvent::Moved { to: target }
    }

    fn hit_door(&mut self, at: Position) -> SessionEvent {
        if self.keys > 0 {
            self.keys -= 1;
            self.maze.set(at, Cell::Path);
            self.door_hits.remove(&at);
            self.stats.sync_resources(self.keys, self.lives);
            debug!(?at, keys = self.keys, "door unlocked");
            return SessionEvent::DoorUnlocked { at, keys: self.keys };
        }

        let hits = {
            let h = self.door_hits.entry(at).or_insert(0);
            *h += 1;
            *h
        };
        if hits >= DOOR_BREAK_HITS {
            self.maze.set(at, Cell::Path);
            self.door_hits.remove(&at);
            debug!(?at, "door broken open");
            SessionEvent::DoorBroken { at }
        } else {
            SessionEvent::DoorCracked {
                at,
                hits,
                opacity: door_opacity_for(hits),
            }
        }
    }

    fn hit_trap(&mut self, at: Position) -> SessionEvent {
        if self.keys >= TRAP_DISARM_COST {
            self.keys -= TRAP_DISARM_COST;
            self.maze.set(at, Cell::Path);
            self.disarm_seq = self.disarm_seq.wrapping_add(1);
            let disarm = Disarm {
                at,
                seq: self.disarm_seq,
            };
            self.disarming = Some(disarm);
            self.stats.sync_resources(self.keys, self.lives);
            debug!(?at, seq = disarm.seq, keys = self.keys, "trap disarmed");
            SessionEvent::TrapDisarmed {
                disarm,
                keys: self.keys,
            }
        } else {
            self.lose(LossCause::Trap)
        }
    }

    /// Clears the disarm guard once that disarm's animation has settled.
    /// Returns false, leaving the guard alone, for any other disarm.
    pub fn finish_disarm(&mut self, disarm: Disarm) -> bool {
        if self.disarming != Some(disarm) {
            debug!(?disarm, current = ?self.disarming, "stale disarm settle ignored");
            return false;
        }
        self.disarming = None;
        true
    }

    fn collect(&mut self, at: Position, pickup: Pickup) -> Vec<SessionEvent> {
        let moved = self.move_to(at);
        self.maze.set(at, Cell::Path);
        vec![moved, self.activate(pickup)]
    }

    fn activate(&mut self, pickup: Pickup) -> SessionEvent {
        match pickup {
            Pickup::Map => {
                self.view_radius = MAP_VIEW_RADIUS;
                self.refresh_visibility();
                SessionEvent::MapActivated
            }
            Pickup::CrystalBall => {
                let targets: Vec<Position> = self
                    .maze
                    .iter()
                    .filter(|(_, c)| {
                        matches!(
                            c.kind(),
                            CellKind::Exit | CellKind::FakeExit | CellKind::Trap
                        )
                    })
                    .map(|(p, _)| p)
                    .collect();
                let revealed = targets.len();
                self.revealed.extend(targets);
                self.refresh_visibility();
                SessionEvent::CrystalActivated { revealed }
            }
            Pickup::Key(reward) => self.grant_keys(u32::from(reward)),
        }
    }

    /// Adds keys up to [`MAX_KEYS`]; refused outright when already capped.
    pub fn grant_keys(&mut self, reward: u32) -> SessionEvent {
        if self.keys >= MAX_KEYS {
            return SessionEvent::KeyCapReached;
        }
        let before = self.keys;
        self.keys = self.keys.saturating_add(reward).min(MAX_KEYS);
        self.stats.sync_resources(self.keys, self.lives);
        SessionEvent::KeysGained {
            gained: self.keys - before,
            keys: self.keys,
        }
    }

    fn refresh_visibility(&mut self) {
        self.visible.clear();
        let r = self.view_radius as i32;
        for dy in -r..=r {
            for dx in -r..=r {
                if let Some(p) = self.player.offset(dx, dy) {
                    if self.maze.contains(p) {
                        self.visible.insert(p);
                    }
                }
            }
        }
        self.visible.extend(self.revealed.iter().copied());
        self.explored.extend(self.visible.iter().copied());
    }

    // ─── clock ──────────────────────────────────────────────────────────────

    pub fn tick(&mut self) -> Vec<SessionEvent> {
        if self.phase != Phase::Playing || self.is_paused() {
            return Vec::new();
        }
        match self.timer.tick() {
            Tick::Idle => Vec::new(),
            Tick::Running { remaining } => vec![SessionEvent::TimerTick { remaining }],
            Tick::Expired => vec![
                SessionEvent::TimerTick { remaining: 0 },
                self.lose(LossCause::TimeUp),
            ],
        }
    }

    pub fn toggle_pause(&mut self) -> Option<SessionEvent> {
        if self.phase != Phase::Playing {
            return None;
        }
        match self.paused_at.take() {
            Some(remaining) => {
                self.timer.resume_from(remaining);
                Some(SessionEvent::Resumed { remaining })
            }
            None => {
                let remaining = self.timer.pause();
                self.paused_at = Some(remaining);
                Some(SessionEvent::Paused { remaining })
            }
        }
    }

    // ─── outcomes ───────────────────────────────────────────────────────────

    fn win(&mut self) -> SessionEvent {
        self.timer.stop();
        self.is_game_over = true;
        self.phase = Phase::Won;

        let card = scoring::score(RunMetrics {
            elapsed_secs: self.timer.elapsed(),
            moves_used: self.move_count,
            optimal_moves: scoring::optimal_moves(self.maze.start(), self.maze.exit()),
            retry_count: self.retry_count,
            win_streak: self.win_streak,
        });
        self.win_streak += 1;
        self.total_score = self.total_score.saturating_add(card.total_score);
        self.stats.record_win(self.level, &card);
        self.stats.sync_resources(self.keys, self.lives);
        self.last_card = Some(card);

        let bonus_key = self.win_streak % 3 == 0;
        info!(
            score = card.total_score,
            rating = card.rating,
            streak = self.win_streak,
            "maze cleared"
        );
        SessionEvent::Won { card, bonus_key }
    }

    fn lose(&mut self, cause: LossCause) -> SessionEvent {
        self.timer.stop();
        self.is_game_over = true;
        self.lives = self.lives.saturating_sub(1);
        self.win_streak = 0;
        self.stats.record_loss(self.level);
        self.stats.sync_resources(self.keys, self.lives);
        self.phase = if self.lives > 0 {
            Phase::Lost(cause)
        } else {
            Phase::NoLives
        };
        info!(?cause, lives = self.lives, "run lost");
        SessionEvent::Lost {
            cause,
            lives: self.lives,
        }
    }

    /// Same layout again after a non-fatal loss.
    pub fn retry(&mut self) -> Result<Vec<SessionEvent>, SessionError> {
        if !matches!(self.phase, Phase::Lost(_)) {
            return Err(SessionError::Transition {
                action: "retry",
                phase: self.phase,
            });
        }
        self.retry_count += 1;
        self.maze = self.pristine.clone();
        self.reset_run();
        Ok(vec![SessionEvent::RetryStarted])
    }

    /// Leaves a won maze; the session waits for the next `initialData`.
    pub fn next_game(&mut self) -> Result<Vec<SessionEvent>, SessionError> {
        if self.phase != Phase::Won {
            return Err(SessionError::Transition {
                action: "start the next game",
                phase: self.phase,
            });
        }
        self.games_played += 1;
        self.retry_count = 0;
        self.phase = Phase::Loading;
        Ok(vec![SessionEvent::NextGameRequested { lives: self.lives }])
    }

    /// Only offered once every life is gone. `is_game_over` stays set until
    /// the host answers with a fresh maze.
    pub fn quit(&mut self) -> Result<Vec<SessionEvent>, SessionError> {
        if self.phase != Phase::NoLives {
            return Err(SessionError::Transition {
                action: "quit",
                phase: self.phase,
            });
        }
        self.phase = Phase::Quit;
        self.games_played = 0;
        Ok(vec![SessionEvent::QuitRequested])
    }
}

fn door_opacity_for(hits: u32) -> f32 {
    let t = hits.min(DOOR_BREAK_HITS) as f32 / DOOR_BREAK_HITS as f32;
    1.0 - (1.0 - DOOR_MIN_OPACITY) * t
}

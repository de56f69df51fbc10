// ═══════════════════════════════════════════════════════════════════════════
// Host controller
// ═══════════════════════════════════════════════════════════════════════════
//
// The host side of the bridge: hands out mazes, tracks lives and games
// played, grants the streak bonus key and keeps the leaderboard. The embedded
// view owns the authoritative run state; the host only trusts what it is told.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::GameConfig;
use crate::generator::{generate_with, GenParams};
use crate::prng::Prng;
use crate::protocol::{GameOverReport, HostMessage, ImageUrls, InitialData, ViewMessage};
use crate::session::MAX_KEYS;

/// Maps a logical sprite name to a display URL.
pub trait AssetResolver {
    fn resolve(&self, name: &str) -> Option<String>;
}

/// Fixed name → URL table.
#[derive(Debug, Clone, Default)]
pub struct StaticAssets {
    urls: HashMap<String, String>,
}

impl StaticAssets {
    pub fn new() -> Self {
        Self::default()
    }

    /// `{base}/{name}.png` for every known sprite.
    pub fn under(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        let urls = ImageUrls::NAMES
            .iter()
            .map(|name| (name.to_string(), format!("{base}/{name}.png")))
            .collect();
        Self { urls }
    }

    pub fn insert(&mut self, name: impl Into<String>, url: impl Into<String>) {
        self.urls.insert(name.into(), url.into());
    }
}

impl AssetResolver for StaticAssets {
    fn resolve(&self, name: &str) -> Option<String> {
        self.urls.get(name).cloned()
    }
}

/// One row per username, highest score kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub username: String,
    pub score: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leaderboard {
    #[serde(default)]
    entries: Vec<LeaderboardEntry>,
}

impl Leaderboard {
    pub const CAPACITY: usize = 10;

    pub fn new() -> Self {
        Self::default()
    }

    /// Upserts `score` if it beats the user's previous best, then keeps the
    /// top ten. Returns whether the board changed.
    pub fn submit(&mut self, username: &str, score: u32) -> bool {
        match self.entries.iter_mut().find(|e| e.username == username) {
            Some(entry) if entry.score >= score => return false,
            Some(entry) => entry.score = score,
            None => self.entries.push(LeaderboardEntry {
                username: username.to_string(),
                score,
            }),
        }
        self.entries.sort_by(|a, b| b.score.cmp(&a.score));
        let before = self.entries.len();
        self.entries.truncate(Self::CAPACITY);
        before <= Self::CAPACITY || self.entries.iter().any(|e| e.username == username)
    }

    pub fn entries(&self) -> &[LeaderboardEntry] {
        &self.entries
    }

    pub fn best(&self, username: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|e| e.username == username)
            .map(|e| e.score)
    }
}

pub struct HostController<R: AssetResolver> {
    config: GameConfig,
    username: String,
    resolver: R,
    rng: Prng,
    casual: bool,
    level: u32,
    games_played: u32,
    lives: u32,
    bonus_key_pending: bool,
    first_game: bool,
}

impl<R: AssetResolver> HostController<R> {
    pub fn new(config: GameConfig, username: impl Into<String>, resolver: R) -> Self {
        let lives = config.starting_lives;
        Self {
            config,
            username: username.into(),
            resolver,
            rng: Prng::from_entropy(),
            casual: false,
            level: 1,
            games_played: 0,
            lives,
            bonus_key_pending: false,
            first_game: true,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Prng::new(seed);
        self
    }

    pub fn casual(mut self, casual: bool) -> Self {
        self.casual = casual;
        self
    }

    pub fn level(mut self, level: u32) -> Self {
        self.level = level.max(1);
        self
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn set_username(&mut self, username: impl Into<String>) {
        self.username = username.into();
    }

    pub fn games_played(&self) -> u32 {
        self.games_played
    }

    pub fn lives(&self) -> u32 {
        self.lives
    }

    /// Answers one view message. Messages that need no reply return an empty
    /// list.
    pub fn handle(&mut self, msg: ViewMessage, board: &mut Leaderboard) -> Vec<HostMessage> {
        match msg {
            ViewMessage::Ready => vec![self.next_maze(false)],
            ViewMessage::Retry => vec![self.next_maze(true)],
            ViewMessage::NextGame { lives } => {
                self.games_played += 1;
                self.lives = lives;
                vec![self.next_maze(false)]
            }
            ViewMessage::NewGame => {
                info!(user = %self.username, games = self.games_played, "back to menu");
                self.games_played = 0;
                self.lives = self.config.starting_lives;
                self.bonus_key_pending = false;
                self.first_game = true;
                Vec::new()
            }
            ViewMessage::GameOver(report) => {
                self.record(&report, board);
                Vec::new()
            }
            ViewMessage::MovePlayer { position } => {
                debug!(?position, "player moved");
                Vec::new()
            }
            ViewMessage::UnlockDoor { position } => {
                debug!(?position, "door unlocked");
                Vec::new()
            }
        }
    }

    fn record(&mut self, report: &GameOverReport, board: &mut Leaderboard) {
        self.lives = report.lives;
        if !report.won {
            info!(user = %self.username, lives = report.lives, "run lost");
            return;
        }
        if report.should_show_bonus_key {
            self.bonus_key_pending = true;
        }
        if let Some(score) = report.total_score {
            if board.submit(&self.username, score) {
                info!(user = %self.username, score, "leaderboard updated");
            }
        }
    }

    fn next_maze(&mut self, is_retry: bool) -> HostMessage {
        let params = GenParams::new(self.config.maze_width, self.config.maze_height)
            .games_played(self.games_played)
            .casual(self.casual)
            .level(self.level);
        let maze = generate_with(&mut self.rng, params);

        let bonus = !is_retry && std::mem::take(&mut self.bonus_key_pending);
        let keys = (self.config.starting_keys(self.casual) + u32::from(bonus)).min(MAX_KEYS);
        let first = std::mem::replace(&mut self.first_game, false);

        HostMessage::InitialData(InitialData {
            username: self.username.clone(),
            keys,
            maze: maze.rows(),
            level: self.level,
            lives: self.lives,
            games_played: Some(self.games_played),
            is_retry,
            is_new_game: Some(!is_retry),
            should_show_bonus_key: bonus,
            is_casual_mode: self.casual,
            is_first_game: Some(first),
            images: self.images(),
        })
    }

    fn images(&self) -> ImageUrls {
        ImageUrls::from_fn(|name| match self.resolver.resolve(name) {
            Some(url) => url,
            None => {
                warn!(asset = name, "asset lookup failed");
                String::new()
            }
        })
    }
}

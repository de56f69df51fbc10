//! Mazerun host daemon
//!
//! Serves the host side of the maze bridge over newline-delimited JSON:
//! - one host controller per connection (mazes, lives, games played)
//! - a shared top-ten leaderboard, persisted across restarts
//!
//! Storage locations:
//! - Linux: ~/.local/share/mazerun/
//! - Windows: %APPDATA%\mazerun\
//! - MacOS: ~/Library/Application Support/mazerun/

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use mazerun::config::{ConfigError, GameConfig};
use mazerun::host::{HostController, Leaderboard, StaticAssets};
use mazerun::protocol::{Control, Reply, ViewMessage};
use serde::Deserialize;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

mod paths;

use paths::AppPaths;

const DEFAULT_ADDR: &str = "127.0.0.1:7878";
const DEFAULT_ASSET_BASE: &str = "/assets";

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("could not determine data directory")]
    NoDataDir,
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid leaderboard file: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ═══════════════════════════════════════════════════════════════════════════
// Protocol Messages
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Request {
    Control(Control),
    View(ViewMessage),
}

// ═══════════════════════════════════════════════════════════════════════════
// Daemon State
// ═══════════════════════════════════════════════════════════════════════════

struct DaemonState {
    paths: AppPaths,
    config: GameConfig,
    asset_base: String,
    leaderboard: Leaderboard,
}

impl DaemonState {
    fn new(paths: AppPaths) -> Result<Self, DaemonError> {
        let config = GameConfig::load(&paths.config_file())?;
        let asset_base =
            std::env::var("MAZERUN_ASSETS").unwrap_or_else(|_| DEFAULT_ASSET_BASE.to_string());
        Ok(Self {
            paths,
            config,
            asset_base,
            leaderboard: Leaderboard::new(),
        })
    }

    fn load_leaderboard(&mut self) -> Result<(), DaemonError> {
        let path = self.paths.leaderboard_file();
        if !path.exists() {
            return Ok(());
        }
        let text = fs::read_to_string(&path).map_err(|source| DaemonError::Io { path, source })?;
        self.leaderboard = serde_json::from_str(&text)?;
        info!("Loaded {} leaderboard entries", self.leaderboard.entries().len());
        Ok(())
    }

    fn save_leaderboard(&self) -> Result<(), DaemonError> {
        let path = self.paths.leaderboard_file();
        let json = serde_json::to_string_pretty(&self.leaderboard)?;
        fs::write(&path, json).map_err(|source| DaemonError::Io { path, source })
    }

    fn controller(&self, username: &str, casual: bool) -> HostController<StaticAssets> {
        HostController::new(
            self.config.clone(),
            username,
            StaticAssets::under(&self.asset_base),
        )
        .casual(casual)
    }
}

/// Per-socket host state. A view message before `hello` plays as "player".
#[derive(Default)]
struct Connection {
    host: Option<HostController<StaticAssets>>,
}

fn respond(state: &mut DaemonState, conn: &mut Connection, request: Request) -> Reply {
    match request {
        Request::Control(Control::Hello { username, casual }) => {
            if username.trim().is_empty() {
                return Reply::Error {
                    message: "username must not be empty".to_string(),
                };
            }
            info!("Hello from {} (casual: {})", username, casual);
            conn.host = Some(state.controller(&username, casual));
            Reply::Success {
                message: format!("Welcome, {username}"),
            }
        }
        Request::Control(Control::Leaderboard) => Reply::Leaderboard {
            entries: state.leaderboard.entries().to_vec(),
        },
        Request::View(msg) => {
            let host = conn
                .host
                .get_or_insert_with(|| state.controller("player", false));
            let before = state.leaderboard.clone();
            let messages = host.handle(msg, &mut state.leaderboard);
            if state.leaderboard != before {
                if let Err(e) = state.save_leaderboard() {
                    error!("Leaderboard save failed: {}", e);
                }
            }
            Reply::Messages { messages }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Client Handler
// ═══════════════════════════════════════════════════════════════════════════

async fn handle_client(
    stream: TcpStream,
    state: Arc<RwLock<DaemonState>>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();
    let mut conn = Connection::default();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let reply = match serde_json::from_str::<Request>(&line) {
            Ok(request) => {
                let mut s = state.write().await;
                respond(&mut s, &mut conn, request)
            }
            Err(e) => {
                warn!("Invalid request: {}", e);
                Reply::Error {
                    message: format!("Invalid request: {}", e),
                }
            }
        };

        writer
            .write_all(serde_json::to_string(&reply)?.as_bytes())
            .await?;
        writer.write_all(b"\n").await?;
    }

    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════
// Main
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let paths = AppPaths::new()?;
    info!("Data directory: {:?}", paths.data_dir());
    info!("Leaderboard file: {:?}", paths.leaderboard_file());

    let mut initial = DaemonState::new(paths)?;
    if let Err(e) = initial.load_leaderboard() {
        warn!("Could not load leaderboard: {}", e);
        info!("Starting with an empty leaderboard");
    }
    let state = Arc::new(RwLock::new(initial));

    // Save on Ctrl-C so the board survives an abrupt stop.
    {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let s = state.read().await;
                if let Err(e) = s.save_leaderboard() {
                    error!("Ctrl-C save failed: {}", e);
                } else {
                    info!("Ctrl-C: leaderboard saved");
                }
                std::process::exit(0);
            }
        });
    }

    let addr = std::env::var("MAZERUN_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let listener = TcpListener::bind(&addr).await?;
    info!("Mazerun daemon listening on {}", addr);

    loop {
        let (stream, peer) = listener.accept().await?;
        info!("Client connected: {}", peer);
        let state_clone = Arc::clone(&state);

        tokio::spawn(async move {
            if let Err(e) = handle_client(stream, state_clone).await {
                error!("Client handler error: {}", e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mazerun::protocol::{GameOverReport, HostMessage};

    fn state(tag: &str) -> DaemonState {
        let dir = std::env::temp_dir().join(format!("mazerund-test-{tag}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        DaemonState::new(AppPaths::at(dir).unwrap()).unwrap()
    }

    fn parse(line: &str) -> Request {
        serde_json::from_str(line).unwrap()
    }

    #[test]
    fn requests_split_into_control_and_view() {
        assert!(matches!(
            parse(r#"{"type":"hello","username":"ada"}"#),
            Request::Control(Control::Hello { .. })
        ));
        assert!(matches!(
            parse(r#"{"type":"leaderboard"}"#),
            Request::Control(Control::Leaderboard)
        ));
        assert!(matches!(
            parse(r#"{"type":"nextGame","lives":2}"#),
            Request::View(ViewMessage::NextGame { lives: 2 })
        ));
        assert!(serde_json::from_str::<Request>(r#"{"type":"launch"}"#).is_err());
    }

    #[test]
    fn hello_then_ready_returns_a_maze() {
        let mut s = state("ready");
        let mut conn = Connection::default();
        let reply = respond(&mut s, &mut conn, parse(r#"{"type":"hello","username":"ada"}"#));
        assert!(matches!(reply, Reply::Success { .. }));

        let Reply::Messages { messages } = respond(&mut s, &mut conn, parse(r#"{"type":"ready"}"#))
        else {
            panic!("expected messages");
        };
        let [HostMessage::InitialData(data)] = &messages[..] else {
            panic!("expected one initialData, got {messages:?}");
        };
        assert_eq!(data.username, "ada");
        assert_eq!(data.images.player_image_url, "/assets/player.png");
        assert!(!data.maze.is_empty());
    }

    #[test]
    fn empty_username_is_refused() {
        let mut s = state("empty");
        let mut conn = Connection::default();
        let reply = respond(&mut s, &mut conn, parse(r#"{"type":"hello","username":" "}"#));
        assert!(matches!(reply, Reply::Error { .. }));
        assert!(conn.host.is_none());
    }

    #[test]
    fn winning_report_is_persisted() {
        let mut s = state("persist");
        let mut conn = Connection::default();
        respond(&mut s, &mut conn, parse(r#"{"type":"hello","username":"bo"}"#));
        let win = ViewMessage::GameOver(GameOverReport {
            won: true,
            lives: 3,
            total_score: Some(1500),
            ..Default::default()
        });
        let reply = respond(&mut s, &mut conn, Request::View(win));
        assert_eq!(reply, Reply::Messages { messages: vec![] });

        let Reply::Leaderboard { entries } =
            respond(&mut s, &mut conn, parse(r#"{"type":"leaderboard"}"#))
        else {
            panic!("expected leaderboard");
        };
        assert_eq!(entries[0].score, 1500);

        let mut reloaded = DaemonState::new(s.paths.clone()).unwrap();
        reloaded.load_leaderboard().unwrap();
        assert_eq!(reloaded.leaderboard.best("bo"), Some(1500));
    }
}

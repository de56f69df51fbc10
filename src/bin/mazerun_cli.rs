//! Terminal client for the `mazerund` host daemon.
//!
//! Examples:
//!   mazerun-cli play --name ada
//!   mazerun-cli play --name bo --casual
//!   mazerun-cli play --name ada --config ~/.local/share/mazerun/config.json
//!   mazerun-cli leaderboard
//!
//! By default it talks to 127.0.0.1:7878; override with `--addr host:port`
//! or the `MAZERUN_ADDR` environment variable. Pass the daemon's config file
//! with `--config` so the local timer and `ready` retries match the host.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use mazerun::config::GameConfig;
use mazerun::console::{self, Console, HostLink, LinkError};
use mazerun::protocol::{Control, HostMessage, Reply, ViewMessage};
use serde::Serialize;

const DEFAULT_ADDR: &str = "127.0.0.1:7878";

fn usage() -> ! {
    eprintln!("mazerun-cli (talks to mazerund @ {DEFAULT_ADDR} by default)");
    eprintln!("Usage: mazerun-cli [--addr host:port] <command> [args]\n");
    eprintln!("Commands:");
    eprintln!("  play [--name N] [--casual] [--config PATH]");
    eprintln!("                              Play a session hosted by the daemon");
    eprintln!("  leaderboard                 Show the top ten");
    process::exit(1);
}

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        usage();
    }

    let mut addr = std::env::var("MAZERUN_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    if args.len() >= 2 && args[0] == "--addr" {
        addr = args[1].clone();
        args.drain(0..2);
    }

    if args.is_empty() {
        usage();
    }

    (addr, args)
}

/// One persistent connection; the daemon keeps a host controller per socket.
struct TcpLink {
    writer: TcpStream,
    reader: BufReader<TcpStream>,
}

impl TcpLink {
    fn connect(addr: &str) -> Result<Self, LinkError> {
        let stream = TcpStream::connect(addr)?;
        stream.set_read_timeout(Some(Duration::from_secs(5)))?;
        let reader = BufReader::new(stream.try_clone()?);
        Ok(Self {
            writer: stream,
            reader,
        })
    }

    fn request(&mut self, req: &impl Serialize) -> Result<Reply, LinkError> {
        let line = serde_json::to_string(req)?;
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;

        let mut resp_line = String::new();
        if self.reader.read_line(&mut resp_line)? == 0 {
            return Err(LinkError::Closed);
        }
        Ok(serde_json::from_str(&resp_line)?)
    }
}

impl HostLink for TcpLink {
    fn send(&mut self, msg: &ViewMessage) -> Result<Vec<HostMessage>, LinkError> {
        match self.request(msg)? {
            Reply::Messages { messages } => Ok(messages),
            Reply::Error { message } => Err(LinkError::Remote(message)),
            other => Err(LinkError::Remote(format!("unexpected reply: {other:?}"))),
        }
    }
}

#[derive(Debug, PartialEq)]
struct PlayArgs {
    username: String,
    casual: bool,
    config: Option<PathBuf>,
}

fn parse_play_args(args: &[String]) -> Result<PlayArgs, String> {
    let mut parsed = PlayArgs {
        username: "player".to_string(),
        casual: false,
        config: None,
    };
    let mut it = args.iter();
    while let Some(arg) = it.next() {
        let mut value = |flag: &str| {
            it.next()
                .cloned()
                .ok_or_else(|| format!("{flag} needs a value"))
        };
        match arg.as_str() {
            "--name" => parsed.username = value("--name")?,
            "--casual" => parsed.casual = true,
            "--config" => parsed.config = Some(PathBuf::from(value("--config")?)),
            other => return Err(format!("unknown option: {other}")),
        }
    }
    Ok(parsed)
}

fn play(addr: &str, args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let PlayArgs {
        username,
        casual,
        config,
    } = parse_play_args(args).unwrap_or_else(|e| {
        eprintln!("{e}");
        usage()
    });
    let config = match config {
        Some(path) => GameConfig::load(&path)?,
        None => GameConfig::default(),
    };

    let mut link = TcpLink::connect(addr)?;
    if let Reply::Error { message } = link.request(&Control::Hello { username, casual })? {
        return Err(LinkError::Remote(message).into());
    }

    let mut console = Console::new(config, link);
    console::run(&mut console, &mut std::io::stdout())?;
    Ok(())
}

fn leaderboard(addr: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut link = TcpLink::connect(addr)?;
    match link.request(&Control::Leaderboard)? {
        Reply::Leaderboard { entries } => {
            if entries.is_empty() {
                println!("No scores yet.");
            }
            for (rank, entry) in entries.iter().enumerate() {
                println!("{:>2}. {:<16} {}", rank + 1, entry.username, entry.score);
            }
            Ok(())
        }
        Reply::Error { message } => Err(LinkError::Remote(message).into()),
        other => Err(LinkError::Remote(format!("unexpected reply: {other:?}")).into()),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let (addr, args) = parse_args();
    let result = match args[0].as_str() {
        "play" => play(&addr, &args[1..]),
        "leaderboard" => leaderboard(&addr),
        _ => usage(),
    };

    if let Err(e) = result {
        eprintln!("Failed: {e}");
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn play_defaults_without_flags() {
        let parsed = parse_play_args(&[]).unwrap();
        assert_eq!(parsed.username, "player");
        assert!(!parsed.casual);
        assert_eq!(parsed.config, None);
    }

    #[test]
    fn play_takes_the_daemon_config() {
        let parsed =
            parse_play_args(&args(&["--name", "ada", "--config", "/tmp/mz.json", "--casual"]))
                .unwrap();
        assert_eq!(
            parsed,
            PlayArgs {
                username: "ada".to_string(),
                casual: true,
                config: Some(PathBuf::from("/tmp/mz.json")),
            }
        );
    }

    #[test]
    fn play_rejects_bad_flags() {
        assert!(parse_play_args(&args(&["--config"])).is_err());
        assert!(parse_play_args(&args(&["--level", "2"])).is_err());
    }

    #[test]
    fn loaded_config_reaches_the_view() {
        let path = std::env::temp_dir().join(format!("mazerun-cli-{}.json", process::id()));
        std::fs::write(&path, r#"{"time_budget_secs": 45, "ready_attempts": 2}"#).unwrap();
        let parsed = parse_play_args(&args(&["--config", path.to_str().unwrap()])).unwrap();
        let config = GameConfig::load(parsed.config.as_deref().unwrap()).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(config.time_budget_secs, 45);
        assert_eq!(config.ready_attempts, 2);
    }
}

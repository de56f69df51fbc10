use std::path::PathBuf;
use std::process;

use mazerun::config::GameConfig;
use mazerun::console::{self, Console, LocalHost};
use mazerun::generator::{generate_with, GenParams};
use mazerun::host::{HostController, StaticAssets};
use mazerun::maze::{Cell, CellKind};
use mazerun::prng::Prng;
use mazerun::scoring::{self, RunMetrics};

fn print_help() {
    println!("mazerun: fog-of-war maze runs in the terminal\n");
    println!("Usage: mazerun <command> [options]\n");
    println!("Commands:");
    println!("  play [--name N] [--casual] [--level L] [--seed S] [--config PATH]");
    println!("                          Play against the in-process host");
    println!("  gen [--games G] [--casual] [--level L] [--seed S] [--size WxH]");
    println!("                          Print a generated maze, fully revealed");
    println!("  score <secs> <moves> <optimal> [retries] [streak]");
    println!("                          Score a run by hand");
    println!("  help                    Show this message");
    println!();
    println!("In play: w/a/s/d move, p pauses, an empty line continues,");
    println!("r retries, n goes to the next maze, q quits, x exits.");
}

#[derive(Debug, Default)]
struct Options {
    name: Option<String>,
    casual: bool,
    level: u32,
    seed: Option<u64>,
    games: u32,
    size: Option<(u32, u32)>,
    config: Option<PathBuf>,
}

fn parse_options(args: &[String]) -> Result<Options, String> {
    let mut opts = Options {
        level: 1,
        ..Default::default()
    };
    let mut it = args.iter();
    while let Some(arg) = it.next() {
        let mut value = |flag: &str| {
            it.next()
                .cloned()
                .ok_or_else(|| format!("{flag} needs a value"))
        };
        match arg.as_str() {
            "--casual" => opts.casual = true,
            "--name" => opts.name = Some(value("--name")?),
            "--config" => opts.config = Some(PathBuf::from(value("--config")?)),
            "--level" => opts.level = number(&value("--level")?, "--level")?,
            "--games" => opts.games = number(&value("--games")?, "--games")?,
            "--seed" => opts.seed = Some(number(&value("--seed")?, "--seed")?),
            "--size" => {
                let raw = value("--size")?;
                let (w, h) = raw
                    .split_once('x')
                    .ok_or_else(|| format!("--size expects WxH, got {raw}"))?;
                opts.size = Some((number(w, "--size")?, number(h, "--size")?));
            }
            other => return Err(format!("unknown option: {other}")),
        }
    }
    Ok(opts)
}

fn number<T: std::str::FromStr>(raw: &str, what: &str) -> Result<T, String> {
    raw.parse()
        .map_err(|_| format!("{what} expects a number, got {raw}"))
}

fn load_config(opts: &Options) -> Result<GameConfig, Box<dyn std::error::Error>> {
    let mut config = match &opts.config {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default(),
    };
    if let Some((w, h)) = opts.size {
        config.maze_width = w;
        config.maze_height = h;
    }
    Ok(config)
}

fn run_gen(opts: &Options) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(opts)?;
    let mut rng = opts.seed.map_or_else(Prng::from_entropy, Prng::new);
    let maze = generate_with(
        &mut rng,
        GenParams::new(config.maze_width, config.maze_height)
            .games_played(opts.games)
            .casual(opts.casual)
            .level(opts.level),
    );

    for row in maze.rows() {
        let line: String = row
            .iter()
            .map(|cell| match cell {
                Cell::Path => '.',
                Cell::Wall => '#',
                Cell::Door => '+',
                Cell::Start => 'S',
                Cell::Exit => 'E',
                Cell::FakeExit => 'F',
                Cell::CrystalBall => 'o',
                Cell::Map => 'm',
                Cell::KeyPowerup { reward } => char::from(b'0' + reward),
                Cell::Trap { .. } => '^',
            })
            .collect();
        println!("{line}");
    }
    println!(
        "{}x{}  doors={} traps={} keys={} fake_exits={} optimal={}",
        maze.width(),
        maze.height(),
        maze.count(CellKind::Door),
        maze.count(CellKind::Trap),
        maze.count(CellKind::KeyPowerup),
        maze.count(CellKind::FakeExit),
        scoring::optimal_moves(maze.start(), maze.exit()),
    );
    Ok(())
}

fn run_score(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    if args.len() < 3 {
        return Err("score needs <secs> <moves> <optimal>".into());
    }
    let arg = |i: usize, what: &str| -> Result<u32, String> {
        args.get(i).map_or(Ok(0), |raw| number(raw, what))
    };
    let card = scoring::score(RunMetrics {
        elapsed_secs: arg(0, "secs")?,
        moves_used: arg(1, "moves")?,
        optimal_moves: arg(2, "optimal")?,
        retry_count: arg(3, "retries")?,
        win_streak: arg(4, "streak")?,
    });
    println!(
        "base={} streak_bonus={} total={} rating={:.1}",
        card.base_score, card.streak_bonus, card.total_score, card.rating
    );
    Ok(())
}

fn run_play(opts: &Options) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(opts)?;
    let name = opts.name.clone().unwrap_or_else(|| "player".to_string());
    let mut controller = HostController::new(config.clone(), name, StaticAssets::new())
        .casual(opts.casual)
        .level(opts.level);
    if let Some(seed) = opts.seed {
        controller = controller.with_seed(seed);
    }

    let mut console = Console::new(config, LocalHost::new(controller));
    let mut stdout = std::io::stdout();
    console::run(&mut console, &mut stdout)?;

    let host = console.link();
    for (rank, entry) in host.leaderboard().entries().iter().enumerate() {
        println!("{:>2}. {:<16} {}", rank + 1, entry.username, entry.score);
    }
    if let Some(session) = console.view().session() {
        let stats = session.stats();
        println!(
            "games={} wins={} best_streak={} avg_rating={:.1}",
            stats.games_played, stats.wins, stats.highest_streak, stats.average_rating
        );
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(cmd) = args.first() else {
        print_help();
        process::exit(2);
    };
    let rest = &args[1..];

    let result = match cmd.as_str() {
        "help" | "--help" | "-h" => {
            print_help();
            Ok(())
        }
        "score" => run_score(rest),
        "gen" | "play" => match parse_options(rest) {
            Ok(opts) if cmd == "gen" => run_gen(&opts),
            Ok(opts) => run_play(&opts),
            Err(e) => Err(e.into()),
        },
        other => {
            eprintln!("Unknown command: {other}");
            print_help();
            process::exit(2);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

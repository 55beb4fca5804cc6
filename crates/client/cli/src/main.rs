//! Maze-escape command line client.
//!
//! Composition root: loads configuration from the environment, sets up
//! logging, starts the runtime and runs one subcommand.
//!
//! # Usage
//!
//! ```bash
//! maze-cli list                 # maps, easiest first
//! maze-cli toplist              # saved best times
//! maze-cli play garden          # let the autopilot play a map
//! maze-cli play garden --fill   # close every factory up front
//! ```

mod autopilot;
mod config;
mod logging;

use anyhow::{Result, bail};
use rand::SeedableRng;
use rand::rngs::StdRng;

use config::CliConfig;
use runtime::{Runtime, RuntimeHandle};

enum Action {
    List,
    Toplist,
    Play { map: String, fill: bool },
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Action> {
    match args.next().as_deref() {
        Some("list") | None => Ok(Action::List),
        Some("toplist") => Ok(Action::Toplist),
        Some("play") => {
            let Some(map) = args.next() else {
                bail!("usage: maze-cli play <map> [--fill]");
            };
            let fill = args.any(|arg| arg == "--fill");
            Ok(Action::Play { map, fill })
        }
        Some(other) => bail!("unknown command `{other}` (expected list, toplist or play)"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let action = parse_args(std::env::args().skip(1))?;
    let config = CliConfig::from_env();
    let _guard = logging::setup_logging(config.session_id.as_deref())?;

    tracing::info!("Starting maze client");
    tracing::info!("Map directory: {}", config.map_dir.display());
    tracing::info!("Leaderboard: {}", config.leaderboard_path().display());

    let runtime = Runtime::start(config.runtime_config()).await?;
    let handle = runtime.handle();

    let result = run(&handle, &config, action).await;
    drop(handle);

    runtime.shutdown().await?;
    tracing::info!("Client shut down");
    result
}

async fn run(handle: &RuntimeHandle, config: &CliConfig, action: Action) -> Result<()> {
    match action {
        Action::List => {
            for entry in handle.list_maps().await? {
                println!("{:>3}  {}", entry.difficulty, entry.name);
            }
        }
        Action::Toplist => {
            let lines = handle.get_toplist().await?;
            if lines.is_empty() {
                println!("No results yet.");
            }
            for line in lines {
                println!("{line}");
            }
        }
        Action::Play { map, fill } => play(handle, config, &map, fill).await?,
    }
    Ok(())
}

async fn play(handle: &RuntimeHandle, config: &CliConfig, map: &str, fill: bool) -> Result<()> {
    let view = handle.new_game(map).await?;
    tracing::info!(
        map,
        player = %view.player,
        factories = view.factories_left,
        "Game ready"
    );

    handle.start_game().await?;
    if fill {
        handle.fill_factories().await?;
    }

    let rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
        None => StdRng::from_entropy(),
    };
    let Some(finish) = autopilot::drive(handle, rng).await? else {
        tracing::warn!("Runtime stopped before the game ended");
        return Ok(());
    };

    if finish.won {
        let seconds = u32::try_from(finish.elapsed_seconds).unwrap_or(u32::MAX);
        handle.add_result(map, &config.player, seconds).await?;
        handle.save_toplist().await?;
        println!("Escaped {map} in {seconds} seconds.");
    } else {
        println!("Caught in {map}.");
    }
    Ok(())
}

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use servicedash::dashboard::{self, RunOptions};
use servicedash::headless::{self, PollOptions};
use servicedash::{export, logging, AppConfig};

#[derive(Parser, Debug)]
#[command(name = "servicedash")]
#[command(about = "Terminal dashboard for third-party service status and market readings")]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = "servicedash.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll in the background and show the board (default)
    Run {
        /// Draw on the normal screen instead of the alternate one
        #[arg(long)]
        no_screen: bool,

        /// Draw a single frame and exit
        #[arg(long)]
        once: bool,
    },

    /// Poll without a display
    Poll {
        /// Run a single round and exit
        #[arg(long)]
        once: bool,

        /// Log a summary line for every round
        #[arg(long)]
        log: bool,
    },

    /// Write the current per-service digest as JSON
    Export {
        /// Output file
        #[arg(short, long)]
        out: PathBuf,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    let command = args.command.unwrap_or(Command::Run {
        no_screen: false,
        once: false,
    });

    match command {
        Command::Run { no_screen, once } => {
            let config = AppConfig::load(&args.config)?;
            logging::init_file(&config.log_path())?;
            let options = RunOptions {
                screen: !no_screen && !once,
                once,
            };
            dashboard::run(config, options).await
        }
        Command::Poll { once, log } => {
            logging::init_stderr()?;
            let config = AppConfig::load(&args.config)?;
            headless::run(config, PollOptions { once, log }).await
        }
        Command::Export { out } => {
            logging::init_stderr()?;
            let config = AppConfig::load(&args.config)?;
            export::run(config, &out).await?;
            println!("Exported service digest to: {}", out.display());
            Ok(())
        }
    }
}

pub mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use summary::{process_summary_command, SummaryCommand};
use tracing::{error, level_filters::LevelFilter};

use crate::{
    tracker::{args::TrackArgs, start_tracker},
    utils::{
        logging::{enable_logging, CLI_PREFIX, TRACKER_PREFIX},
        runtime::single_thread_runtime,
    },
};

#[derive(Parser, Debug)]
#[command(name = "Worktally", version, long_about = None)]
#[command(about = "Tracks time spent on projects by watching the focused window", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(
        about = "Track the focused window in the current console until interrupted with Ctrl-C"
    )]
    Track {
        #[command(flatten)]
        args: TrackArgs,
    },
    #[command(about = "Display time tracked per project")]
    Summary {
        #[command(flatten)]
        command: SummaryCommand,
        #[arg(long, help = "Enable logging")]
        log: bool,
    },
}

pub fn run_cli() -> Result<()> {
    let args = Args::parse();

    match args.commands {
        Commands::Track { args } => {
            let app_dir = args.location.app_dir()?;
            let _logging = enable_logging(
                TRACKER_PREFIX,
                &app_dir.join("logs"),
                args.log,
                args.log_console,
            )?;
            let config = args.to_config()?;
            single_thread_runtime()?
                .block_on(start_tracker(config))
                .inspect_err(|e| error!("Fail at execution {e:?}"))
        }
        Commands::Summary { command, log } => {
            let _logging = if log {
                let app_dir = command.location().app_dir()?;
                Some(enable_logging(
                    CLI_PREFIX,
                    &app_dir.join("logs"),
                    Some(LevelFilter::TRACE),
                    true,
                )?)
            } else {
                None
            };
            single_thread_runtime()?.block_on(process_summary_command(command))
        }
    }
}

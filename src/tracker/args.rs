use std::{path::PathBuf, time::Duration};

use anyhow::Result;
use clap::{builder::NonEmptyStringValueParser, Args};
use tracing::level_filters::LevelFilter;

use super::{
    storage::history_store::DEFAULT_HISTORY_FILE,
    title::{TitleResolver, DEFAULT_DELIMITER, DEFAULT_MARKER, DEFAULT_SEGMENT},
    TrackerConfig,
};

/// Where the history lives. Shared by every command reading or writing it.
#[derive(Args, Debug, Clone)]
pub struct HistoryLocation {
    #[arg(
        long,
        help = "Application directory holding the history and logs. Defaults to the working directory"
    )]
    pub dir: Option<PathBuf>,
    #[arg(
        long,
        default_value = DEFAULT_HISTORY_FILE,
        help = "History file, relative to the application directory"
    )]
    pub history: PathBuf,
}

impl HistoryLocation {
    pub fn app_dir(&self) -> Result<PathBuf> {
        match &self.dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(std::env::current_dir()?),
        }
    }

    pub fn history_path(&self) -> Result<PathBuf> {
        Ok(self.app_dir()?.join(&self.history))
    }
}

#[derive(Args, Debug)]
pub struct TrackArgs {
    #[command(flatten)]
    pub location: HistoryLocation,
    #[arg(
        long,
        default_value = DEFAULT_MARKER,
        value_parser = NonEmptyStringValueParser::new(),
        help = "Only windows whose title contains this text are tracked"
    )]
    pub marker: String,
    #[arg(
        long,
        default_value = DEFAULT_DELIMITER,
        value_parser = NonEmptyStringValueParser::new(),
        help = "Separator between the parts of a window title"
    )]
    pub delimiter: String,
    #[arg(
        long,
        default_value_t = DEFAULT_SEGMENT,
        help = "Position of the project name among the title parts, starting at 0"
    )]
    pub segment: usize,
    #[arg(
        long = "interval-ms",
        default_value_t = 1000,
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Time between two samples of the focused window"
    )]
    pub interval_ms: u64,
    /// This option is for debugging purposes only.
    #[arg(long = "log-console")]
    pub log_console: bool,
    #[arg(long = "log-filter")]
    pub log: Option<LevelFilter>,
}

impl TrackArgs {
    pub fn to_config(&self) -> Result<TrackerConfig> {
        Ok(TrackerConfig {
            history_path: self.location.history_path()?,
            resolver: TitleResolver::new(&self.marker, &self.delimiter, self.segment),
            interval: Duration::from_millis(self.interval_ms),
        })
    }
}

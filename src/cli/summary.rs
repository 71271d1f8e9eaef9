use std::{collections::BTreeMap, fmt::Display};

use anyhow::Result;
use clap::Args;

use crate::{
    tracker::{
        args::HistoryLocation,
        storage::{
            entities::{ProjectReport, Totals},
            history_store::JsonHistoryStore,
        },
    },
    utils::percentage::{seconds_percentage, Percentage},
};

#[derive(Debug, Args)]
pub struct SummaryCommand {
    #[command(flatten)]
    location: HistoryLocation,
    #[arg(short = 'p', long = "percentage", help = "Hide projects with a smaller share of the tracked time", default_value_t = Percentage::new_opt(0.).unwrap())]
    min_percentage: Percentage,
}

impl SummaryCommand {
    pub fn location(&self) -> &HistoryLocation {
        &self.location
    }
}

#[derive(Debug, PartialEq)]
pub struct ProjectSummary {
    pub name: String,
    pub totals: Totals,
    pub entries: usize,
    pub share: Percentage,
}

impl Display for ProjectSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}\t{}\t{} entries\t{}",
            format_duration(self.totals.seconds),
            self.share,
            self.entries,
            self.name
        )
    }
}

/// Command to process `summary` command. Prints how much time went into each project, the
/// busiest first.
pub async fn process_summary_command(
    SummaryCommand {
        location,
        min_percentage,
    }: SummaryCommand,
) -> Result<()> {
    let path = location.history_path()?;
    if !tokio::fs::try_exists(&path).await? {
        println!("Nothing has been tracked into {} yet", path.display());
        return Ok(());
    }

    let store = JsonHistoryStore::open(path).await?;
    let reports = store.read_reports().await?;

    for summary in summarize(&reports, min_percentage) {
        println!("{summary}");
    }
    Ok(())
}

fn summarize(
    reports: &BTreeMap<String, ProjectReport>,
    min_percentage: Percentage,
) -> Vec<ProjectSummary> {
    let per_project = reports
        .iter()
        .map(|(name, report)| (name, Totals::of(&report.time_entries), report.time_entries.len()))
        .collect::<Vec<_>>();
    let overall: i64 = per_project.iter().map(|(_, totals, _)| totals.seconds).sum();

    let mut summaries = per_project
        .into_iter()
        .map(|(name, totals, entries)| ProjectSummary {
            name: name.clone(),
            totals,
            entries,
            share: seconds_percentage(totals.seconds, overall),
        })
        .filter(|v| v.share >= min_percentage)
        .collect::<Vec<_>>();

    summaries.sort_by(|a, b| {
        b.totals
            .seconds
            .cmp(&a.totals.seconds)
            .then_with(|| a.name.cmp(&b.name))
    });
    summaries
}

fn format_duration(seconds: i64) -> String {
    let (hours, minutes, seconds) = (seconds / 3600, seconds / 60 % 60, seconds % 60);
    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}

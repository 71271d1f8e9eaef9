use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::{
    entities::{OpenTimeEntry, ProjectReport, TimeEntry, Totals},
    error::TrackingError,
};

/// A tracked project: every closed session so far plus, while it's being worked on, the open
/// one. Entries are kept in the order they were closed.
#[derive(Debug)]
pub struct Project {
    name: String,
    time_entries: Vec<TimeEntry>,
    current: Option<OpenTimeEntry>,
}

impl Project {
    /// Restores a project from its stored report. `None` means the project has never been
    /// tracked and starts out empty.
    pub fn hydrate(name: impl Into<String>, report: Option<ProjectReport>) -> Self {
        let name = name.into();
        let time_entries = match report {
            Some(report) => {
                let stored = report.stored_totals();
                let computed = Totals::of(&report.time_entries);
                if stored != computed {
                    warn!(
                        "Stored totals of {name:?} don't match its entries ({stored:?} vs \
                         {computed:?}), using totals computed from entries"
                    );
                }
                debug!(
                    "Hydrated {name:?} with {} previous entries",
                    report.time_entries.len()
                );
                report.time_entries
            }
            None => Vec::new(),
        };

        Self {
            name,
            time_entries,
            current: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn time_entries(&self) -> &[TimeEntry] {
        &self.time_entries
    }

    pub fn current(&self) -> Option<&OpenTimeEntry> {
        self.current.as_ref()
    }

    pub fn is_tracking(&self) -> bool {
        self.current.is_some()
    }

    pub fn totals(&self) -> Totals {
        Totals::of(&self.time_entries)
    }

    fn next_identifier(&self) -> u64 {
        self.time_entries
            .iter()
            .map(|v| v.identifier)
            .max()
            .map_or(0, |v| v + 1)
    }

    /// Opens a new entry at `now` and returns its identifier.
    pub fn start_tracking(&mut self, now: DateTime<Utc>) -> Result<u64, TrackingError> {
        if let Some(current) = &self.current {
            return Err(TrackingError::AlreadyTracking {
                name: self.name.clone(),
                identifier: current.identifier,
            });
        }

        let identifier = self.next_identifier();
        self.current = Some(OpenTimeEntry::open(identifier, now));
        Ok(identifier)
    }

    /// Closes the open entry at `now` and appends it to the history of the project.
    pub fn stop_tracking(&mut self, now: DateTime<Utc>) -> Result<&TimeEntry, TrackingError> {
        let Some(current) = self.current.take() else {
            return Err(TrackingError::NotTracking {
                name: self.name.clone(),
            });
        };

        if now < current.start_datetime {
            warn!(
                "Clock moved backwards while tracking {:?}, closing entry {} as empty",
                self.name, current.identifier
            );
        }

        self.time_entries.push(current.close(now));
        Ok(&self.time_entries[self.time_entries.len() - 1])
    }

    /// Report of all closed entries. The open entry, if any, isn't part of it.
    pub fn generate_report(&self) -> ProjectReport {
        ProjectReport::from_entries(self.time_entries.clone())
    }
}

impl std::fmt::Display for Project {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<Project {}>", self.name)
    }
}

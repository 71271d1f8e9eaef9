use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, error, info};

use crate::{utils::clock::Clock, window_api::ActiveWindowData};

use super::{
    storage::{history_store::ProjectHistory, project::Project},
    title::TitleResolver,
};

/// What a single sample did to the session.
#[derive(Debug, PartialEq, Eq)]
pub enum Transition {
    /// Nothing was tracked and nothing is tracked now.
    Idle,
    /// The sample couldn't be attributed to a project and was ignored.
    Skipped,
    Started(String),
    Continued(String),
    Switched { from: String, to: String },
    Stopped(String),
}

/// Drives projects through their sessions based on the focused window.
///
/// At most one project is tracked at a time. Whenever the focused window stops belonging to it,
/// its session is closed and merged into the history before anything else is started. Projects
/// are hydrated from the history on every start so numbering and previous entries carry over.
pub struct TrackingSession<H: ProjectHistory> {
    history: H,
    resolver: TitleResolver,
    time_provider: Arc<dyn Clock>,
    current: Option<Project>,
}

impl<H: ProjectHistory> TrackingSession<H> {
    pub fn new(history: H, resolver: TitleResolver, time_provider: Arc<dyn Clock>) -> Self {
        Self {
            history,
            resolver,
            time_provider,
            current: None,
        }
    }

    pub fn current_project(&self) -> Option<&Project> {
        self.current.as_ref()
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    /// Processes one sample of the focused window.
    pub async fn observe(&mut self, window: Option<&ActiveWindowData>) -> Result<Transition> {
        let next = match window {
            None => None,
            Some(window) => match self.resolver.resolve(&window.window_title) {
                Ok(v) => v,
                Err(e) => {
                    // An odd title must never close a valid session.
                    debug!("Skipping sample: {e}");
                    return Ok(Transition::Skipped);
                }
            },
        };

        if let (Some(project), Some(name)) = (&self.current, &next) {
            if project.name() == name {
                debug!("Still working on {project}");
                return Ok(Transition::Continued(name.clone()));
            }
        }

        let stopped = self.stop_current().await?;
        if let Some(name) = &next {
            self.start(name.clone()).await?;
        }

        Ok(match (stopped, next) {
            (None, None) => Transition::Idle,
            (None, Some(to)) => Transition::Started(to),
            (Some(from), None) => Transition::Stopped(from),
            (Some(from), Some(to)) => Transition::Switched { from, to },
        })
    }

    /// Closes and persists the open session, if any. Safe to call more than once, only the
    /// first call after a start writes anything.
    pub async fn shutdown(&mut self) -> Result<()> {
        match self.stop_current().await? {
            Some(name) => info!("Flushed open session of {name:?}"),
            None => debug!("No open session to flush"),
        }
        info!("Tracking finished");
        Ok(())
    }

    async fn start(&mut self, name: String) -> Result<()> {
        let report = self
            .history
            .get_project_report(&name)
            .await
            .inspect_err(|e| error!("Failed to load history of {name:?} {e:?}"))?;
        let mut project = Project::hydrate(name, report);
        let identifier = project.start_tracking(self.time_provider.time())?;
        info!("Start tracking {project} as entry {identifier}");
        self.current = Some(project);
        Ok(())
    }

    /// Returns the name of the project that was stopped.
    async fn stop_current(&mut self) -> Result<Option<String>> {
        let Some(mut project) = self.current.take() else {
            return Ok(None);
        };

        let (identifier, seconds) = project
            .stop_tracking(self.time_provider.time())
            .map(|v| (v.identifier, v.time_in_seconds))?;
        info!("Stop tracking {project}: entry {identifier} lasted {seconds}s");

        self.history
            .merge_and_write(project.name(), &project.generate_report())
            .await
            .inspect_err(|e| error!("Failed to save session of {project} {e:?}"))?;

        Ok(Some(project.name().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use anyhow::Result;
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
    use tempfile::{tempdir, TempDir};

    use crate::{
        tracker::{
            storage::history_store::{JsonHistoryStore, ProjectHistory, DEFAULT_HISTORY_FILE},
            title::TitleResolver,
        },
        utils::{clock::TestClock, logging::test_logging},
        window_api::ActiveWindowData,
    };

    use super::{TrackingSession, Transition};

    const TEST_START_DATE: NaiveDateTime =
        NaiveDateTime::new(NaiveDate::from_ymd_opt(2018, 7, 4).unwrap(), NaiveTime::MIN);

    fn code(project: &str) -> Option<ActiveWindowData> {
        Some(ActiveWindowData::new(format!(
            "main.rs - {project} - Visual Studio Code"
        )))
    }

    async fn session_in(dir: &TempDir) -> Result<TrackingSession<JsonHistoryStore>> {
        let store = JsonHistoryStore::open(dir.path().join(DEFAULT_HISTORY_FILE)).await?;
        let clock = TestClock::starting_at(Utc.from_utc_datetime(&TEST_START_DATE));
        Ok(TrackingSession::new(
            store,
            TitleResolver::default(),
            Arc::new(clock),
        ))
    }

    /// Feeds one sample per second, then shuts down a second after the last one.
    async fn play(
        session: &mut TrackingSession<JsonHistoryStore>,
        samples: &[Option<ActiveWindowData>],
    ) -> Result<Vec<Transition>> {
        let mut transitions = vec![];
        for sample in samples {
            transitions.push(session.observe(sample.as_ref()).await?);
            tokio::time::advance(Duration::from_secs(1)).await;
        }
        session.shutdown().await?;
        Ok(transitions)
    }

    fn durations(entries: &[crate::tracker::storage::entities::TimeEntry]) -> Vec<(u64, i64)> {
        entries
            .iter()
            .map(|v| (v.identifier, v.time_in_seconds))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_switching_keeps_every_interval() -> Result<()> {
        let _logging = test_logging();
        let dir = tempdir()?;
        let mut session = session_in(&dir).await?;

        let transitions = play(
            &mut session,
            &[code("A"), code("A"), code("B"), code("B"), code("A")],
        )
        .await?;

        assert_eq!(
            transitions,
            vec![
                Transition::Started("A".into()),
                Transition::Continued("A".into()),
                Transition::Switched {
                    from: "A".into(),
                    to: "B".into()
                },
                Transition::Continued("B".into()),
                Transition::Switched {
                    from: "B".into(),
                    to: "A".into()
                },
            ]
        );

        let reports = session.history().read_reports().await?;
        assert_eq!(durations(&reports["A"].time_entries), [(0, 2), (1, 1)]);
        assert_eq!(durations(&reports["B"].time_entries), [(0, 2)]);
        assert_eq!(reports["A"].total_time_in_seconds, 3);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_unresolvable_title_keeps_session_open() -> Result<()> {
        let _logging = test_logging();
        let dir = tempdir()?;
        let mut session = session_in(&dir).await?;

        session.observe(code("A").as_ref()).await?;
        tokio::time::advance(Duration::from_secs(1)).await;
        let welcome = ActiveWindowData::new("Welcome - Visual Studio Code");
        assert_eq!(session.observe(Some(&welcome)).await?, Transition::Skipped);

        assert!(session.history().read_all().await?.is_empty());
        let project = session.current_project().unwrap();
        assert_eq!(project.name(), "A");
        assert_eq!(
            project.current().map(|v| v.start_datetime),
            Some(Utc.from_utc_datetime(&TEST_START_DATE))
        );

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(
            session.observe(code("A").as_ref()).await?,
            Transition::Continued("A".into())
        );
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_leaving_the_application_stops_tracking() -> Result<()> {
        let _logging = test_logging();
        let dir = tempdir()?;
        let mut session = session_in(&dir).await?;

        let transitions = play(
            &mut session,
            &[
                code("A"),
                code("A"),
                Some(ActiveWindowData::new("Inbox - Mozilla Thunderbird")),
                None,
                code("A"),
            ],
        )
        .await?;

        assert_eq!(
            transitions,
            vec![
                Transition::Started("A".into()),
                Transition::Continued("A".into()),
                Transition::Stopped("A".into()),
                Transition::Idle,
                Transition::Started("A".into()),
            ]
        );
        let reports = session.history().read_reports().await?;
        assert_eq!(durations(&reports["A"].time_entries), [(0, 2), (1, 1)]);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_flushes_once() -> Result<()> {
        let _logging = test_logging();
        let dir = tempdir()?;
        let mut session = session_in(&dir).await?;

        session.shutdown().await?;
        assert!(session.history().read_all().await?.is_empty());

        session.observe(code("A").as_ref()).await?;
        tokio::time::advance(Duration::from_secs(3)).await;
        session.shutdown().await?;
        session.shutdown().await?;

        let report = session.history().get_project_report("A").await?.unwrap();
        assert_eq!(durations(&report.time_entries), [(0, 3)]);
        assert!(session.current_project().is_none());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_continues_history() -> Result<()> {
        let _logging = test_logging();
        let dir = tempdir()?;

        let mut first_run = session_in(&dir).await?;
        play(
            &mut first_run,
            &[code("Alpha"), code("Alpha"), code("Alpha"), code("Alpha"), code("Beta")],
        )
        .await?;
        let before = first_run.history().read_reports().await?;
        assert_eq!(durations(&before["Alpha"].time_entries), [(0, 4)]);
        assert_eq!(durations(&before["Beta"].time_entries), [(0, 1)]);

        let mut second_run = session_in(&dir).await?;
        play(&mut second_run, &[code("Alpha"), code("Alpha")]).await?;

        let after = second_run.history().read_reports().await?;
        assert_eq!(after["Alpha"].time_entries[0], before["Alpha"].time_entries[0]);
        assert_eq!(durations(&after["Alpha"].time_entries), [(0, 4), (1, 2)]);
        assert_eq!(after["Beta"], before["Beta"]);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_corrupt_history_surfaces() -> Result<()> {
        let _logging = test_logging();
        let dir = tempdir()?;
        let mut session = session_in(&dir).await?;
        std::fs::write(dir.path().join(DEFAULT_HISTORY_FILE), "not json")?;

        assert!(session.observe(code("A").as_ref()).await.is_err());
        assert!(session.current_project().is_none());
        assert_eq!(
            std::fs::read_to_string(dir.path().join(DEFAULT_HISTORY_FILE))?,
            "not json"
        );
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_report_shape_is_not_replaced() -> Result<()> {
        let _logging = test_logging();
        let dir = tempdir()?;
        let mut session = session_in(&dir).await?;
        let content = r#"{"A": {"start_datetime": "2023-01-01 10:00:00.123456", "end_datetime": "2023-01-01 10:45:00.000001"}}"#;
        std::fs::write(dir.path().join(DEFAULT_HISTORY_FILE), content)?;

        assert!(session.observe(code("A").as_ref()).await.is_err());
        assert!(session.current_project().is_none());
        session.shutdown().await?;
        assert_eq!(
            std::fs::read_to_string(dir.path().join(DEFAULT_HISTORY_FILE))?,
            content
        );
        Ok(())
    }
}

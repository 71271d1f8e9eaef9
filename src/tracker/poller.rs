use std::{sync::Arc, time::Duration};

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info_span, Instrument};

use crate::{utils::clock::Clock, window_api::WindowManager};

use super::{session::TrackingSession, storage::history_store::ProjectHistory};

/// Samples the focused window at a fixed rate and feeds it into a [TrackingSession].
pub struct Poller<H: ProjectHistory> {
    producer: Box<dyn WindowManager>,
    session: TrackingSession<H>,
    shutdown: CancellationToken,
    collection_frequency: Duration,
    time_provider: Arc<dyn Clock>,
}

impl<H: ProjectHistory> Poller<H> {
    pub fn new(
        producer: Box<dyn WindowManager>,
        session: TrackingSession<H>,
        shutdown: CancellationToken,
        collection_frequency: Duration,
        time_provider: Arc<dyn Clock>,
    ) -> Self {
        Self {
            producer,
            session,
            shutdown,
            collection_frequency,
            time_provider,
        }
    }

    async fn poll_once(&mut self) -> Result<()> {
        let window = match self.producer.get_active_window_data() {
            Ok(v) => v,
            Err(e) => {
                // A failed sample says nothing about the focus, so the session stays as it is.
                error!("Encountered an error during collection {:?}", e);
                return Ok(());
            }
        };

        let span = info_span!("Processing sample");
        let transition = self.session.observe(window.as_ref()).instrument(span).await?;
        debug!("Sample {:?} resulted in {:?}", window, transition);
        Ok(())
    }

    /// Executes the polling loop until the shutdown token is cancelled. The open session is
    /// flushed on the way out, both on cancellation and on failure.
    pub async fn run(mut self) -> Result<()> {
        let mut collection_point = self.time_provider.instant();
        loop {
            collection_point += self.collection_frequency;

            if let Err(e) = self.poll_once().await {
                error!("Tracking failed, flushing open session {:?}", e);
                if let Err(flush) = self.session.shutdown().await {
                    error!("Failed to flush open session {:?}", flush);
                }
                return Err(e);
            }

            tokio::select! {
                // Interrupts arriving mid-sleep land here right away.
                _ = self.shutdown.cancelled() => {
                    return self.session.shutdown().await;
                }
                _ = self.time_provider.sleep_until(collection_point) => ()
            }
        }
    }
}

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Result;
use poller::Poller;
use session::TrackingSession;
use storage::history_store::JsonHistoryStore;
use title::TitleResolver;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{
    utils::clock::{Clock, DefaultClock},
    window_api::{GenericWindowManager, WindowManager},
};

pub mod args;
pub mod poller;
pub mod session;
pub mod shutdown;
pub mod storage;
pub mod title;

pub const DEFAULT_COLLECTION_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub history_path: PathBuf,
    pub resolver: TitleResolver,
    pub interval: Duration,
}

impl TrackerConfig {
    pub fn new(history_path: PathBuf) -> Self {
        Self {
            history_path,
            resolver: TitleResolver::default(),
            interval: DEFAULT_COLLECTION_INTERVAL,
        }
    }
}

/// Represents the starting point for the tracker. Runs until the process is asked to terminate.
pub async fn start_tracker(config: TrackerConfig) -> Result<()> {
    let manager = GenericWindowManager::new()?;

    let shutdown_token = CancellationToken::new();

    let poller = create_poller(config, manager, &shutdown_token, DefaultClock).await?;

    let signals = tokio::spawn(shutdown::detect_shutdown(shutdown_token.clone()));
    let result = poller.run().await;
    signals.abort();

    result
}

async fn create_poller(
    config: TrackerConfig,
    manager: impl WindowManager + 'static,
    shutdown_token: &CancellationToken,
    clock: impl Clock,
) -> Result<Poller<JsonHistoryStore>> {
    let time_provider: Arc<dyn Clock> = Arc::new(clock);
    let store = JsonHistoryStore::open(config.history_path).await?;
    info!("Tracking into {:?}", store.path());
    let session = TrackingSession::new(store, config.resolver, time_provider.clone());
    Ok(Poller::new(
        Box::new(manager),
        session,
        shutdown_token.clone(),
        config.interval,
        time_provider,
    ))
}

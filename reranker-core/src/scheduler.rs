use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::front_page::FrontPage;
use crate::pipeline::{Pipeline, RunReport};

#[derive(Debug, Clone)]
pub enum Event {
    RunCompleted { report: RunReport, front_page: FrontPage },
    RunFailed(String),
}

pub struct SchedulerHandle {
    cancel_tx: broadcast::Sender<()>,
    join: JoinHandle<()>,
}

impl SchedulerHandle {
    pub async fn stop(self) -> Result<(), PipelineError> {
        let _ = self.cancel_tx.send(());
        self.join.await.map_err(PipelineError::from)
    }
}

/// One full run at the current time, reported as an event.
pub async fn run_once(pipeline: &Pipeline) -> Event {
    match pipeline.run(Utc::now()).await {
        Ok((report, front_page)) => Event::RunCompleted { report, front_page },
        Err(err) => {
            warn!(error = %err, "run failed");
            Event::RunFailed(err.to_string())
        }
    }
}

/// Runs the pipeline every `interval` until stopped. The first run starts
/// immediately; ticks missed while a run is still going are skipped.
pub fn spawn_periodic(
    pipeline: Arc<Pipeline>,
    interval: Duration,
    events: mpsc::Sender<Event>,
) -> SchedulerHandle {
    let (cancel_tx, mut cancel_rx) = broadcast::channel(1);
    let join = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel_rx.recv() => {
                    info!("scheduler shutdown requested");
                    break;
                }
                _ = ticker.tick() => {
                    let event = run_once(&pipeline).await;
                    if events.send(event).await.is_err() {
                        warn!("event receiver dropped");
                    }
                }
            }
        }
    });

    SchedulerHandle { cancel_tx, join }
}

//! Drives `Poller::tick` on a fixed interval in a background task.

use crate::config::Variant;
use crate::onchain::BarContract;
use crate::poller::{PollError, PollEvent, Poller, TickOutcome};

use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

/// How a poll task ended.
#[derive(Debug)]
pub enum PollExit {
    /// `PollHandle::stop` was called, or the handle was dropped.
    Stopped,
    /// The bar closed; no further checks will run.
    BarClosed,
    /// A tick failed and the variant does not retry.
    Failed(PollError),
    /// The task panicked or was aborted.
    Aborted(String),
}

pub struct Scheduler {
    period: Duration,
}

impl Scheduler {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }

    pub fn for_variant(variant: Variant) -> Self {
        Self::new(variant.poll_interval())
    }

    /// Spawn the poll task. The first tick runs immediately; a tick that
    /// overruns the period delays the next one rather than bunching them.
    pub fn start<C: BarContract>(self, poller: Poller<C>) -> PollHandle {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let period = self.period;

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let retries = poller.variant().retries_failed_ticks();

            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => return PollExit::Stopped,
                    _ = interval.tick() => {}
                }

                match poller.tick().await {
                    Ok(TickOutcome::BarClosed) => {
                        info!("polling stopped, bar closed");
                        return PollExit::BarClosed;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        poller.emit(PollEvent::TickFailed {
                            step: e.step,
                            reason: e.source.to_string(),
                            fatal: !retries,
                        });
                        if !retries {
                            error!(error = %e, "tick failed, polling halted");
                            return PollExit::Failed(e);
                        }
                        warn!(
                            error = %e,
                            retry_in_secs = period.as_secs(),
                            "tick failed, retrying next interval"
                        );
                    }
                }
            }
        });

        PollHandle {
            stop: Some(stop_tx),
            task,
        }
    }
}

/// Owns the running poll task. Dropping the handle stops polling at the
/// next tick boundary.
pub struct PollHandle {
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<PollExit>,
}

impl PollHandle {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel future ticks and wait for the task. A tick already in flight
    /// runs to completion first.
    pub async fn stop(mut self) -> PollExit {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        self.join().await
    }

    /// Wait for the task to end on its own.
    pub async fn join(self) -> PollExit {
        match self.task.await {
            Ok(exit) => exit,
            Err(e) => PollExit::Aborted(e.to_string()),
        }
    }
}

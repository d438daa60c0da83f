//! Viewer status channel
//!
//! A single producer publishes the viewer's load status; any number of
//! subscribers observe it. New subscribers always start from the latest value.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::watch;
use tracing::info;

use sceneview_core::{Error, Result};

/// Load status of a viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewerStatus {
    Loading,
    Idle,
    Error,
}

impl ViewerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ViewerStatus::Loading => "loading",
            ViewerStatus::Idle => "idle",
            ViewerStatus::Error => "error",
        }
    }

    /// Whether `next` may follow `self`.
    ///
    /// A load attempt always starts with `Loading` and ends in exactly one of
    /// `Idle` or `Error`.
    pub fn can_transition_to(self, next: ViewerStatus) -> bool {
        matches!(
            (self, next),
            (ViewerStatus::Idle, ViewerStatus::Loading)
                | (ViewerStatus::Error, ViewerStatus::Loading)
                | (ViewerStatus::Loading, ViewerStatus::Idle)
                | (ViewerStatus::Loading, ViewerStatus::Error)
        )
    }
}

impl fmt::Display for ViewerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Producer side of the status channel
#[derive(Debug)]
pub struct StatusPublisher {
    tx: watch::Sender<ViewerStatus>,
}

impl StatusPublisher {
    pub fn new(initial: ViewerStatus) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    /// Publish `next`, rejecting transitions that would break the
    /// loading-then-outcome ordering.
    pub fn publish(&self, next: ViewerStatus) -> Result<()> {
        let current = *self.tx.borrow();
        if !current.can_transition_to(next) {
            return Err(Error::InvalidTransition {
                from: current.to_string(),
                to: next.to_string(),
            });
        }
        self.tx.send_replace(next);
        info!(from = %current, to = %next, "status changed");
        Ok(())
    }

    pub fn current(&self) -> ViewerStatus {
        *self.tx.borrow()
    }

    /// Subscribe; the returned subscription replays the current value
    pub fn subscribe(&self) -> StatusSubscription {
        StatusSubscription {
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Consumer side of the status channel
#[derive(Debug, Clone)]
pub struct StatusSubscription {
    rx: watch::Receiver<ViewerStatus>,
}

impl StatusSubscription {
    /// Latest published status
    pub fn current(&self) -> ViewerStatus {
        *self.rx.borrow()
    }

    /// Wait for the next status change.
    ///
    /// Returns `None` once the publisher is gone.
    pub async fn changed(&mut self) -> Option<ViewerStatus> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }

    /// Stop observing
    pub fn unsubscribe(self) {}
}

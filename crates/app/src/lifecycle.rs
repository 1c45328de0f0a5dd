//! Process-wide lifecycle signal.
//!
//! A single [`Lifecycle`] is created by the composition root; every background
//! task holds a [`ShutdownSignal`] and stops once it fires.

use tokio::sync::watch;

/// Owner side of the lifecycle signal.
#[derive(Debug)]
pub struct Lifecycle {
    sender: watch::Sender<bool>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        let (sender, _) = watch::channel(false);
        Self { sender }
    }
}

impl Lifecycle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out a receiver for a background task.
    #[must_use]
    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            receiver: self.sender.subscribe(),
        }
    }

    /// Fire the signal. Idempotent.
    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }

    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.sender.borrow()
    }
}

/// Receiver side of the lifecycle signal.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    receiver: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Resolve once shutdown was requested or the [`Lifecycle`] was dropped.
    pub async fn wait(&mut self) {
        let _ = self.receiver.wait_for(|stopped| *stopped).await;
    }

    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }
}

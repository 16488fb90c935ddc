//! Cooperative shutdown signal shared by the pipeline stages
//!
//! The sampler listens for the signal at its suspension points. Once it
//! stops, the reading channel closes, the aggregator drains it and closes the
//! measurement channel, and the publisher drains that in turn.

use std::sync::Arc;

use tokio::sync::watch;

/// Handle used to request a shutdown
#[derive(Debug, Clone)]
pub struct Shutdown {
    sender: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    /// New, untriggered handle
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Request shutdown; idempotent
    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }

    /// Whether shutdown was requested
    pub fn is_triggered(&self) -> bool {
        *self.sender.borrow()
    }

    /// Signal a stage awaits on
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            receiver: self.sender.subscribe(),
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side of [`Shutdown`]
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    receiver: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Resolve once shutdown is requested
    ///
    /// Never resolves if every [`Shutdown`] handle is dropped untriggered.
    /// Cancel safe.
    pub async fn recv(&mut self) {
        let sender_alive = self.receiver.wait_for(|triggered| *triggered).await.is_ok();
        if !sender_alive {
            std::future::pending::<()>().await;
        }
    }

    /// Whether shutdown was requested
    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }
}

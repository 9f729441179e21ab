//! Cancellation fan-out for in-flight calls.

use tokio::sync::broadcast;

/// Broadcasts a single "stop now" signal to every call of a client.
///
/// Calls subscribe when they are admitted; a subscriber created after
/// `trigger` does not see the signal, so admission must also check the
/// client's closed flag.
#[derive(Debug)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Signal every current subscriber.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Number of calls still listening.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

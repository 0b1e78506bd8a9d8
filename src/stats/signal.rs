//! Per-request stats signal and its publisher.

use tokio::sync::mpsc::{self, error::TrySendError};

/// Topic the stats signal is published on.
pub const STATS_TOPIC: &str = "proxy.stats";

/// Unit-of-work marker: one inbound request happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSignal;

/// Fire-and-forget publisher of [`StatsSignal`]s.
///
/// Cloned into every request handler. `emit` never blocks and never fails.
#[derive(Debug, Clone)]
pub struct StatsEmitter {
    tx: Option<mpsc::Sender<StatsSignal>>,
}

/// Create a bounded stats channel. Capacity must be non-zero.
pub fn stats_channel(capacity: usize) -> (StatsEmitter, mpsc::Receiver<StatsSignal>) {
    let (tx, rx) = mpsc::channel(capacity);
    (StatsEmitter { tx: Some(tx) }, rx)
}

impl StatsEmitter {
    /// An emitter that drops every signal.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Publish one signal. Drops it if the channel is full or closed.
    pub fn emit(&self) {
        let Some(tx) = &self.tx else {
            return;
        };

        match tx.try_send(StatsSignal) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::trace!(topic = STATS_TOPIC, "Stats channel full, signal dropped");
            }
            Err(TrySendError::Closed(_)) => {
                tracing::trace!(topic = STATS_TOPIC, "Stats subscriber gone, signal dropped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_delivers_signal() {
        let (emitter, mut rx) = stats_channel(4);
        emitter.emit();
        emitter.emit();

        assert_eq!(rx.try_recv().unwrap(), StatsSignal);
        assert_eq!(rx.try_recv().unwrap(), StatsSignal);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_full_channel_drops_without_blocking() {
        let (emitter, mut rx) = stats_channel(1);
        emitter.emit();
        emitter.emit();
        emitter.emit();

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_closed_or_disabled_emitter_is_silent() {
        let (emitter, rx) = stats_channel(1);
        drop(rx);
        emitter.emit();

        StatsEmitter::disabled().emit();
    }
}

//! Combined error flag of the local and remote producers.

use tokio::sync::watch;

/// The two independent error inputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorSignals {
    pub local: bool,
    pub remote: bool,
}

impl ErrorSignals {
    pub fn any(&self) -> bool {
        self.local || self.remote
    }
}

/// Publishes `has_errors = local || remote`, emitting only on change.
///
/// Each producer owns one input. Both inputs and the derived value are
/// updated under the same lock, so a reader never observes a derived value
/// that disagrees with the inputs.
#[derive(Debug)]
pub struct DiagnosticAggregator {
    signals: watch::Sender<ErrorSignals>,
    has_errors: watch::Sender<bool>,
}

impl Default for DiagnosticAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticAggregator {
    pub fn new() -> Self {
        Self {
            signals: watch::channel(ErrorSignals::default()).0,
            has_errors: watch::channel(false).0,
        }
    }

    /// Set by the sandbox after each analysis pass.
    pub fn set_local(&self, value: bool) {
        self.update(|signals| signals.local = value);
    }

    /// Set by the validation pipeline.
    pub fn set_remote(&self, value: bool) {
        self.update(|signals| signals.remote = value);
    }

    pub fn signals(&self) -> ErrorSignals {
        *self.signals.borrow()
    }

    pub fn has_errors(&self) -> bool {
        *self.has_errors.borrow()
    }

    /// Receiver of the derived flag; sees a new value only when it changes.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.has_errors.subscribe()
    }

    fn update(&self, apply: impl FnOnce(&mut ErrorSignals)) {
        self.signals.send_if_modified(|signals| {
            let before = *signals;
            apply(signals);
            let combined = signals.any();
            self.has_errors.send_if_modified(|current| {
                if *current == combined {
                    return false;
                }
                *current = combined;
                true
            });
            *signals != before
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_errors_is_or_of_inputs() {
        let aggregator = DiagnosticAggregator::new();
        for (local, remote) in [(false, false), (true, false), (true, true), (false, true)] {
            aggregator.set_local(local);
            aggregator.set_remote(remote);
            assert_eq!(aggregator.has_errors(), local || remote);
            assert_eq!(aggregator.signals(), ErrorSignals { local, remote });
        }
    }

    #[tokio::test]
    async fn test_duplicate_values_are_not_emitted() {
        let aggregator = DiagnosticAggregator::new();
        let mut rx = aggregator.subscribe();

        aggregator.set_local(true);
        assert!(rx.has_changed().unwrap());
        assert!(*rx.borrow_and_update());

        // Still true: remote joins, then local leaves.
        aggregator.set_remote(true);
        aggregator.set_local(false);
        assert!(!rx.has_changed().unwrap());

        aggregator.set_remote(false);
        assert!(rx.has_changed().unwrap());
        assert!(!*rx.borrow_and_update());
    }

    #[test]
    fn test_concurrent_producers_stay_consistent() {
        let aggregator = std::sync::Arc::new(DiagnosticAggregator::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let aggregator = aggregator.clone();
                std::thread::spawn(move || {
                    for n in 0..500 {
                        let value = (n + i) % 3 == 0;
                        if i % 2 == 0 {
                            aggregator.set_local(value);
                        } else {
                            aggregator.set_remote(value);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(aggregator.has_errors(), aggregator.signals().any());
    }
}

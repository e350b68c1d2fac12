//! Fan-out sender: deliver to every configured sink, aggregate failures.

use super::{AlertPayload, Sender};
use async_trait::async_trait;
use insider_core::{metrics, Error, Result};
use tracing::warn;

pub struct MultiSender {
    senders: Vec<Box<dyn Sender>>,
}

impl MultiSender {
    pub fn new(senders: Vec<Box<dyn Sender>>) -> Self {
        Self { senders }
    }
}

#[async_trait]
impl Sender for MultiSender {
    /// Sinks run in configured order. Partial success is acceptable: every
    /// sink is attempted, each failure is reported, and the aggregated
    /// error never rolls back the stored alert.
    async fn send(&self, payload: &AlertPayload) -> Result<()> {
        let mut failures = Vec::new();

        for sender in &self.senders {
            let result = sender.send(payload).await;
            metrics::record_alert_sent(sender.name(), result.is_ok());
            if let Err(e) = result {
                warn!(sink = sender.name(), error = %e, "Alert sink failed");
                failures.push(format!("{}: {e}", sender.name()));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::AlertDelivery(failures.join("; ")))
        }
    }

    fn name(&self) -> &'static str {
        "multi"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::test_payload;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct RecordingSender {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl Sender for RecordingSender {
        async fn send(&self, _payload: &AlertPayload) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(Error::AlertDelivery("boom".into()))
            } else {
                Ok(())
            }
        }

        fn name(&self) -> &'static str {
            "recording"
        }
    }

    #[tokio::test]
    async fn all_sinks_run_even_when_one_fails() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let multi = MultiSender::new(vec![
            Box::new(RecordingSender {
                calls: first.clone(),
                fail: true,
            }),
            Box::new(RecordingSender {
                calls: second.clone(),
                fail: false,
            }),
        ]);

        let err = multi.send(&test_payload()).await.unwrap_err();
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn all_success_is_ok() {
        let calls = Arc::new(AtomicUsize::new(0));
        let multi = MultiSender::new(vec![Box::new(RecordingSender {
            calls: calls.clone(),
            fail: false,
        })]);

        assert!(multi.send(&test_payload()).await.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

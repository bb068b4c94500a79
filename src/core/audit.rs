use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use crate::domain::ports::{AuditLevel, AuditLogger};

#[derive(Debug)]
struct AuditEvent {
    level: AuditLevel,
    source: String,
    message: String,
}

/// Fire-and-forget audit side channel.
///
/// Events go through a bounded queue drained by a background task. Emitting
/// never blocks and never fails; when the queue is full the event is dropped.
pub struct AuditTrail {
    sender: Mutex<Option<mpsc::Sender<AuditEvent>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl AuditTrail {
    /// Starts the drain task. Must be called from within a Tokio runtime.
    pub fn spawn(logger: Arc<dyn AuditLogger>, capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<AuditEvent>(capacity.max(1));

        let worker = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Err(e) = logger
                    .log(event.level, &event.source, &event.message)
                    .await
                {
                    tracing::warn!(
                        "📝 Audit delivery failed ({} from {}): {}",
                        event.level.as_str(),
                        event.source,
                        e
                    );
                }
            }
        });

        Self {
            sender: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
        }
    }

    /// A trail that discards everything.
    pub fn disabled() -> Self {
        Self {
            sender: Mutex::new(None),
            worker: Mutex::new(None),
        }
    }

    pub fn info(&self, source: &str, message: impl Into<String>) {
        self.emit(AuditLevel::Info, source, message.into());
    }

    pub fn warning(&self, source: &str, message: impl Into<String>) {
        self.emit(AuditLevel::Warning, source, message.into());
    }

    pub fn error(&self, source: &str, message: impl Into<String>) {
        self.emit(AuditLevel::Error, source, message.into());
    }

    fn emit(&self, level: AuditLevel, source: &str, message: String) {
        let Ok(guard) = self.sender.lock() else {
            return;
        };
        let Some(sender) = guard.as_ref() else {
            return;
        };

        let event = AuditEvent {
            level,
            source: source.to_string(),
            message,
        };
        match sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                tracing::warn!("📝 Audit queue full, dropping event from {}", event.source);
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!("📝 Audit trail closed, event discarded");
            }
        }
    }

    /// Stops accepting events and waits until the queued ones are delivered.
    pub async fn shutdown(&self) {
        if let Ok(mut guard) = self.sender.lock() {
            guard.take();
        }
        let worker = self.worker.lock().ok().and_then(|mut guard| guard.take());
        if let Some(worker) = worker {
            let _ = worker.await;
        }
    }
}

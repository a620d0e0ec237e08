//! Progress and warning stream
//!
//! The engine pushes [`TaskEvent`]s into an unbounded channel. Sending never
//! blocks, so a slow or absent consumer only delays delivery and never stalls
//! a worker.

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Warning {
    /// Operation that raised it, e.g. `"cjxl-lossless"`.
    pub source: String,
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.source, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TaskEvent {
    Started {
        task: String,
    },
    /// Completed fraction in `[0, 1]`, non-decreasing within one request.
    Progress {
        fraction: f64,
        completed: usize,
        total: usize,
    },
    Warning(Warning),
    Finished {
        task: String,
        eligible: usize,
        warnings: usize,
    },
}

/// Sending half of the event stream. Clones share the warning counter.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    tx: Sender<TaskEvent>,
    warnings: Arc<AtomicUsize>,
}

pub fn event_channel() -> (EventEmitter, Receiver<TaskEvent>) {
    let (tx, rx) = mpsc::channel();
    (
        EventEmitter {
            tx,
            warnings: Arc::new(AtomicUsize::new(0)),
        },
        rx,
    )
}

impl EventEmitter {
    /// Fire-and-forget; a dropped receiver is not an error.
    pub fn emit(&self, event: TaskEvent) {
        let _ = self.tx.send(event);
    }

    /// `completed` of `total` items done; `total` is never zero.
    pub fn progress(&self, completed: usize, total: usize) {
        self.emit(TaskEvent::Progress {
            fraction: completed as f64 / total.max(1) as f64,
            completed,
            total,
        });
    }

    pub fn warn(&self, source: &str, message: impl fmt::Display) {
        self.warnings.fetch_add(1, Ordering::SeqCst);
        let warning = Warning {
            source: source.to_string(),
            message: message.to_string(),
        };
        tracing::warn!(source = %warning.source, "{}", warning.message);
        self.emit(TaskEvent::Warning(warning));
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warn_counts_and_sends() {
        let (emitter, rx) = event_channel();
        let clone = emitter.clone();
        emitter.warn("djxl", "no jxl files found");
        clone.warn("djxl", format_args!("output file '{}' not created", "a.png"));

        assert_eq!(emitter.warning_count(), 2);
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events[0],
            TaskEvent::Warning(Warning {
                source: "djxl".into(),
                message: "no jxl files found".into()
            })
        );
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_emit_after_receiver_dropped() {
        let (emitter, rx) = event_channel();
        drop(rx);
        emitter.progress(1, 2);
        emitter.warn("par2", "still counted");
        assert_eq!(emitter.warning_count(), 1);
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_string(&TaskEvent::Progress {
            fraction: 0.25,
            completed: 1,
            total: 4,
        })
        .unwrap();
        assert_eq!(
            json,
            r#"{"event":"progress","fraction":0.25,"completed":1,"total":4}"#
        );

        let json = serde_json::to_string(&TaskEvent::Warning(Warning {
            source: "cjxl-lossy".into(),
            message: "m".into(),
        }))
        .unwrap();
        assert_eq!(json, r#"{"event":"warning","source":"cjxl-lossy","message":"m"}"#);

        let json = serde_json::to_string(&TaskEvent::Finished {
            task: "par2".into(),
            eligible: 3,
            warnings: 0,
        })
        .unwrap();
        assert_eq!(
            json,
            r#"{"event":"finished","task":"par2","eligible":3,"warnings":0}"#
        );
    }
}

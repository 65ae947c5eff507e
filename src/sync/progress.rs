//! Progress reporting.
//!
//! A [`ProgressReporter`] fans normalized [`ProgressEvent`]s out to zero or
//! more sinks: callbacks for embedders that render inline, a channel for a
//! UI layer polling from another thread. Publishing is best effort — a
//! disconnected channel never fails a run. Reporters clone cheaply so a
//! pipeline can hand one to a collaborator's progress callback.

use crate::models::ProgressEvent;
use std::sync::{mpsc, Arc, Mutex};

/// Callback sink for progress events.
pub type ProgressCallback = Box<dyn Fn(&ProgressEvent) + Send + Sync>;

enum Sink {
    Callback(ProgressCallback),
    // Sender is guarded so the sink is shareable across threads.
    Channel(Mutex<mpsc::Sender<ProgressEvent>>),
}

/// Fan-out publisher for progress events.
#[derive(Default, Clone)]
pub struct ProgressReporter {
    sinks: Vec<Arc<Sink>>,
}

impl ProgressReporter {
    /// Creates a reporter that discards everything.
    #[must_use]
    pub fn noop() -> Self {
        Self::default()
    }

    /// Creates a reporter with a single callback sink.
    #[must_use]
    pub fn from_fn(f: impl Fn(&ProgressEvent) + Send + Sync + 'static) -> Self {
        Self::noop().with_fn(f)
    }

    /// Creates a reporter feeding a channel, returning the receiving end.
    #[must_use]
    pub fn channel() -> (Self, mpsc::Receiver<ProgressEvent>) {
        Self::noop().with_channel()
    }

    /// Adds a callback sink.
    #[must_use]
    pub fn with_fn(mut self, f: impl Fn(&ProgressEvent) + Send + Sync + 'static) -> Self {
        self.sinks.push(Arc::new(Sink::Callback(Box::new(f))));
        self
    }

    /// Adds a channel sink, returning the receiving end.
    #[must_use]
    pub fn with_channel(mut self) -> (Self, mpsc::Receiver<ProgressEvent>) {
        let (tx, rx) = mpsc::channel();
        self.sinks.push(Arc::new(Sink::Channel(Mutex::new(tx))));
        (self, rx)
    }

    /// Publishes an event to all sinks (best effort).
    pub fn emit(&self, event: &ProgressEvent) {
        for sink in &self.sinks {
            match sink.as_ref() {
                Sink::Callback(cb) => cb(event),
                Sink::Channel(tx) => {
                    // A hung-up receiver is the UI's problem, not the run's.
                    if let Ok(tx) = tx.lock() {
                        let _ = tx.send(event.clone());
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_noop_reporter_accepts_events() {
        let reporter = ProgressReporter::noop();
        reporter.emit(&ProgressEvent::stage("test", "nothing listens"));
    }

    #[test]
    fn test_callback_sink_sees_events() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let reporter = ProgressReporter::from_fn(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        reporter.emit(&ProgressEvent::stage("a", "one"));
        reporter.emit(&ProgressEvent::stage("b", "two"));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_channel_sink_receives_events() {
        let (reporter, rx) = ProgressReporter::channel();
        reporter.emit(&ProgressEvent::stage("import.opening", "opening archive"));

        let event = rx.recv().unwrap();
        assert_eq!(event.messages[0].key, "import.opening");
    }

    #[test]
    fn test_disconnected_channel_is_tolerated() {
        let (reporter, rx) = ProgressReporter::channel();
        drop(rx);
        reporter.emit(&ProgressEvent::stage("test", "nobody home"));
    }

    #[test]
    fn test_clone_shares_sinks() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let reporter = ProgressReporter::from_fn(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let cloned = reporter.clone();
        cloned.emit(&ProgressEvent::stage("test", "via clone"));
        reporter.emit(&ProgressEvent::stage("test", "via original"));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_fan_out_reaches_all_sinks() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let (reporter, rx) = ProgressReporter::from_fn(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        })
        .with_channel();

        reporter.emit(&ProgressEvent::stage("test", "both"));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(rx.try_recv().is_ok());
    }
}

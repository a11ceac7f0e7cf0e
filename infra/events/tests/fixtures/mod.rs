#![allow(dead_code)]

use herald_event::{Callback, LogSink};
use parking_lot::Mutex;
use std::sync::{Arc, Once};
use tracing::Level;

/// Ordered log of which subscriber ran, shared by every callback of a test.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<&'static str>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, name: &'static str) {
        self.0.lock().push(name);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.0.lock().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.0.lock().iter().filter(|n| **n == name).count()
    }

    /// A callback that records `name` and continues.
    pub fn recorder(&self, name: &'static str) -> Callback {
        let log = self.clone();
        Callback::new(move |_| log.record(name))
    }

    /// A callback that records `name` and returns `result` (`false` vetoes).
    pub fn returning(&self, name: &'static str, result: bool) -> Callback {
        let log = self.clone();
        Callback::new(move |_| {
            log.record(name);
            result
        })
    }

    /// A callback that records `name` and fails with `message`.
    pub fn failing(&self, name: &'static str, message: &'static str) -> Callback {
        let log = self.clone();
        Callback::new(move |_| {
            log.record(name);
            Err::<(), _>(TestError(message))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct TestError(pub &'static str);

/// Captures everything an event sends to its log sink.
#[derive(Debug, Default)]
pub struct RecordingSink {
    records: Mutex<Vec<(String, Level)>>,
}

impl RecordingSink {
    pub fn messages(&self) -> Vec<String> {
        self.records.lock().iter().map(|(m, _)| m.clone()).collect()
    }

    pub fn count_at(&self, level: Level) -> usize {
        self.records.lock().iter().filter(|(_, l)| *l == level).count()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl LogSink for RecordingSink {
    fn log(&self, message: &str, level: Level) {
        self.records.lock().push((message.to_owned(), level));
    }
}

/// Installs a test-writer subscriber once so the default sink has somewhere to write.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(Level::TRACE)
            .with_test_writer()
            .try_init();
    });
}

//! A [`TaskReporter`] that records every event for later assertions.

use crate::tasks::{TaskEvent, TaskReporter};
use std::sync::{Arc, Mutex};

/// Collects task events in the order they are reported.
///
/// Clones share the same event log, so a test can keep one handle and give
/// the other to the executor.
#[derive(Debug, Clone, Default)]
pub struct RecordingReporter {
    events: Arc<Mutex<Vec<TaskEvent>>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every event so far.
    pub fn events(&self) -> Vec<TaskEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Ids of the tasks whose action started, in order.
    pub fn started(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                TaskEvent::Started(task) => Some(task.clone()),
                _ => None,
            })
            .collect()
    }

    /// Ids of the tasks skipped as up to date, in order.
    pub fn up_to_date(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                TaskEvent::UpToDate(task) => Some(task.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl TaskReporter for RecordingReporter {
    fn report(&self, event: TaskEvent) {
        self.events.lock().unwrap().push(event);
    }
}

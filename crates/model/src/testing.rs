use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use crate::RelayClient;
use crate::ids::BufferHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayCall {
    Input(BufferHandle, String),
    FetchLines(BufferHandle, usize),
}

#[derive(Debug, Default)]
pub struct RecordingRelay {
    calls: Mutex<Vec<RelayCall>>,
}

impl RecordingRelay {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<RelayCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl RelayClient for RecordingRelay {
    fn send_input(&self, buffer: BufferHandle, text: &str) {
        self.calls
            .lock()
            .unwrap()
            .push(RelayCall::Input(buffer, text.to_string()));
    }

    fn request_lines(&self, buffer: BufferHandle, desired_count: usize) {
        self.calls
            .lock()
            .unwrap()
            .push(RelayCall::FetchLines(buffer, desired_count));
    }
}

pub fn at(seconds: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(seconds, 0).unwrap()
}

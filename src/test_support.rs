//! Scripted collaborators for unit tests

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use crate::broadcast::Message;
use crate::data::{DataSource, Reading, RecordStore};
use crate::error::{Error, Result};
use crate::registry::{ClientHandle, ClientId, Frame};

/// In-memory client that records every frame it receives
pub struct MockClient {
    id: ClientId,
    frames: Mutex<Vec<Frame>>,
    fail_sends: AtomicBool,
    send_delay: Mutex<Option<Duration>>,
    closed_with: Mutex<Option<(u16, String)>>,
}

impl MockClient {
    pub fn new(id: u64) -> Arc<Self> {
        Arc::new(Self {
            id: ClientId::new(id),
            frames: Mutex::new(Vec::new()),
            fail_sends: AtomicBool::new(false),
            send_delay: Mutex::new(None),
            closed_with: Mutex::new(None),
        })
    }

    /// Make every following send fail
    pub fn fail_sends(&self) {
        self.fail_sends.store(true, Ordering::SeqCst);
    }

    /// Delay every following send by `delay`
    pub fn slow_sends(&self, delay: Duration) {
        *self.send_delay.lock().unwrap() = Some(delay);
    }

    pub fn frames(&self) -> Vec<Frame> {
        self.frames.lock().unwrap().clone()
    }

    /// Decoded messages received so far
    pub fn messages(&self) -> Vec<Message> {
        self.frames()
            .iter()
            .map(|f| serde_json::from_str(f.as_str()).unwrap())
            .collect()
    }

    /// Readings received through `update` messages
    pub fn updates(&self) -> Vec<Reading> {
        self.messages()
            .into_iter()
            .filter_map(|m| match m {
                Message::Update(r) => Some(r),
                Message::Snapshot(_) => None,
            })
            .collect()
    }

    pub fn closed_with(&self) -> Option<(u16, String)> {
        self.closed_with.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClientHandle for MockClient {
    fn id(&self) -> ClientId {
        self.id
    }

    async fn send(&self, frame: Frame) -> Result<()> {
        let delay = *self.send_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(Error::ClientClosed(self.id));
        }
        self.frames.lock().unwrap().push(frame);
        Ok(())
    }

    async fn close(&self, code: u16, reason: &str) -> Result<()> {
        *self.closed_with.lock().unwrap() = Some((code, reason.to_string()));
        Ok(())
    }
}

/// Build a reading at `secs` seconds past a fixed epoch
pub fn reading_at(secs: i64) -> Reading {
    Reading {
        id: None,
        timestamp: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
        temperature: 21.5,
        humidity: 40.0,
    }
}

/// Source producing readings with increasing timestamps, optionally failing
pub struct CountingSource {
    calls: AtomicUsize,
    fail_on: Mutex<Vec<usize>>,
    in_flight: AtomicI64,
    max_in_flight: AtomicI64,
}

impl CountingSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail_on: Mutex::new(Vec::new()),
            in_flight: AtomicI64::new(0),
            max_in_flight: AtomicI64::new(0),
        })
    }

    /// Fail the `n`th call (1-based)
    pub fn fail_call(&self, n: usize) {
        self.fail_on.lock().unwrap().push(n);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of overlapping `next_reading` calls observed
    pub fn max_in_flight(&self) -> i64 {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataSource for CountingSource {
    async fn next_reading(&self) -> Result<Reading> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_on.lock().unwrap().contains(&n) {
            return Err(Error::Source(format!("call {} failed", n)));
        }
        Ok(Reading::now(20.0 + n as f64, 50.0))
    }
}

/// Store whose saves always fail
pub struct BrokenStore;

#[async_trait]
impl RecordStore for BrokenStore {
    async fn save(&self, _reading: Reading) -> Result<Reading> {
        Err(Error::Storage("disk unavailable".into()))
    }

    async fn query_recent(&self, _limit: usize) -> Result<Vec<Reading>> {
        Err(Error::Storage("disk unavailable".into()))
    }
}

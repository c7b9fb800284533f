//! Scripted in-memory transport

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use vision_sync::fetcher::{Transport, TransportError};

/// What the scripted host answers to one GET
#[derive(Debug, Clone)]
pub enum Reply {
    Body(Bytes),
    Status(u16),
    /// Never answers; the caller's timeout has to fire
    Hang,
}

impl Reply {
    pub fn text(body: impl Into<String>) -> Self {
        Reply::Body(Bytes::from(body.into()))
    }
}

type Responder = dyn Fn(&str, usize) -> Reply + Send + Sync;

/// Transport answering from a closure of `(url, nth call for that url)`
pub struct MockTransport {
    responder: Box<Responder>,
    delay: Duration,
    calls: Mutex<Vec<(String, Instant)>>,
    per_url: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl MockTransport {
    pub fn new(responder: impl Fn(&str, usize) -> Reply + Send + Sync + 'static) -> Self {
        Self {
            responder: Box::new(responder),
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            per_url: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Hold every request open for `delay` before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Every requested URL in request order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(url, _)| url.clone()).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Requests whose URL contains `needle`
    pub fn calls_containing(&self, needle: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(url, _)| url.contains(needle))
            .count()
    }

    /// When each request for `url` was issued
    pub fn call_times(&self, url: &str) -> Vec<Instant> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, _)| u == url)
            .map(|(_, at)| *at)
            .collect()
    }

    /// Highest number of simultaneously open requests
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, url: &str) -> Result<Bytes, TransportError> {
        let nth = {
            let mut per_url = self.per_url.lock().unwrap();
            let count = per_url.entry(url.to_string()).or_insert(0);
            let nth = *count;
            *count += 1;
            nth
        };
        self.calls.lock().unwrap().push((url.to_string(), Instant::now()));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match (self.responder)(url, nth) {
            Reply::Body(body) => Ok(body),
            Reply::Status(code) => Err(TransportError::Status(code)),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(24 * 3600)).await;
                Err(TransportError::Timeout)
            }
        }
    }
}

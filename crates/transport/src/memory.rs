//! In-process relay
//!
//! A pub/sub hub with the same contract as the relay server: every message
//! pushed to a stream is delivered to each puller subscribed at the time of
//! the push. Messages pushed with no subscriber are dropped.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use contracts::StreamRole;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::channel::{ChannelConnector, MessageChannel};
use crate::endpoint::Endpoint;
use crate::error::{Result, TransportError};

#[derive(Debug, Default)]
struct RelayState {
    subscribers: HashMap<String, Vec<mpsc::Sender<Bytes>>>,
    shut_down: bool,
}

/// Shared in-memory relay; clones refer to the same hub
#[derive(Debug, Clone)]
pub struct MemoryRelay {
    state: Arc<Mutex<RelayState>>,
    capacity: usize,
}

impl MemoryRelay {
    /// `capacity` bounds the per-subscriber queue; a full queue blocks the pusher
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(RelayState::default())),
            capacity: capacity.max(1),
        }
    }

    /// Live pullers on `stream`
    pub fn subscriber_count(&self, stream: &str) -> usize {
        self.lock()
            .subscribers
            .get(stream)
            .map(|subs| subs.iter().filter(|tx| !tx.is_closed()).count())
            .unwrap_or(0)
    }

    /// Close every channel and refuse new connections
    pub fn shutdown(&self) {
        let mut state = self.lock();
        state.shut_down = true;
        state.subscribers.clear();
        debug!("memory relay shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.lock().shut_down
    }

    fn lock(&self) -> MutexGuard<'_, RelayState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn subscribe(&self, stream: &str) -> Option<mpsc::Receiver<Bytes>> {
        let mut state = self.lock();
        if state.shut_down {
            return None;
        }
        let (tx, rx) = mpsc::channel(self.capacity);
        let subs = state.subscribers.entry(stream.to_string()).or_default();
        subs.retain(|tx| !tx.is_closed());
        subs.push(tx);
        Some(rx)
    }

    /// Snapshot of live subscribers, or `None` once shut down
    ///
    /// Subscribers whose receiver was dropped are pruned here as well.
    fn targets(&self, stream: &str) -> Option<Vec<mpsc::Sender<Bytes>>> {
        let mut state = self.lock();
        if state.shut_down {
            return None;
        }
        let Some(subs) = state.subscribers.get_mut(stream) else {
            return Some(Vec::new());
        };
        subs.retain(|tx| !tx.is_closed());
        Some(subs.clone())
    }

    #[cfg(test)]
    fn retained_senders(&self, stream: &str) -> usize {
        self.lock().subscribers.get(stream).map_or(0, Vec::len)
    }
}

impl Default for MemoryRelay {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl ChannelConnector for MemoryRelay {
    type Channel = MemoryChannel;

    async fn connect(&self, endpoint: &Endpoint) -> Result<MemoryChannel> {
        let url = endpoint.url();
        let stream = endpoint.stream().to_string();
        let inbox = match endpoint.role() {
            StreamRole::Pull => Some(
                self.subscribe(&stream)
                    .ok_or_else(|| TransportError::connect(&url, "relay is shut down"))?,
            ),
            StreamRole::Push if self.is_shut_down() => {
                return Err(TransportError::connect(&url, "relay is shut down"));
            }
            StreamRole::Push => None,
        };
        debug!(endpoint = %url, "memory channel connected");
        Ok(MemoryChannel {
            relay: self.clone(),
            url,
            stream,
            role: endpoint.role(),
            inbox,
            closed: false,
        })
    }
}

/// Channel handed out by [`MemoryRelay`]
#[derive(Debug)]
pub struct MemoryChannel {
    relay: MemoryRelay,
    url: String,
    stream: String,
    role: StreamRole,
    inbox: Option<mpsc::Receiver<Bytes>>,
    closed: bool,
}

impl MemoryChannel {
    fn wrong_role(&self, operation: &'static str) -> TransportError {
        TransportError::WrongRole {
            endpoint: self.url.clone(),
            role: self.role.as_str(),
            operation,
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(TransportError::closed(&self.url, "channel closed locally"));
        }
        Ok(())
    }
}

impl MessageChannel for MemoryChannel {
    async fn send(&mut self, message: Bytes) -> Result<()> {
        self.ensure_open()?;
        if self.role != StreamRole::Push {
            return Err(self.wrong_role("send"));
        }
        let targets = self
            .relay
            .targets(&self.stream)
            .ok_or_else(|| TransportError::closed(&self.url, "relay shut down"))?;
        trace!(subscribers = targets.len(), len = message.len(), "publishing");
        for tx in targets {
            // a departed subscriber is not an error for the publisher
            let _ = tx.send(message.clone()).await;
        }
        Ok(())
    }

    async fn recv(&mut self) -> Result<Bytes> {
        self.ensure_open()?;
        if self.inbox.is_none() {
            return Err(self.wrong_role("recv"));
        }
        let received = match self.inbox.as_mut() {
            Some(inbox) => inbox.recv().await,
            None => None,
        };
        received.ok_or_else(|| TransportError::closed(&self.url, "relay shut down"))
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        if let Some(mut inbox) = self.inbox.take() {
            inbox.close();
        }
        Ok(())
    }
}

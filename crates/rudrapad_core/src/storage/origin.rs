//! Shared origin store with change notifications.
//!
//! # Responsibility
//! - Serialize all key access of attached contexts through one backend.
//! - Deliver `StorageEvent` snapshots to every context except the writer.
//!
//! # Invariants
//! - Events are sent only after the backend write succeeded.
//! - Contexts whose event receiver was dropped are pruned on the next broadcast.

use super::{KeyValueStore, SqliteKvStore, StorageError, StorageEvent, StorageResult};
use log::debug;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex, MutexGuard};

/// Identity of one attached context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl Display for ContextId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ctx-{}", self.0)
    }
}

struct Subscriber {
    context: ContextId,
    sender: Sender<StorageEvent>,
}

struct OriginState {
    backend: SqliteKvStore,
    subscribers: Vec<Subscriber>,
    next_context: u64,
}

/// One storage origin shared by any number of contexts.
///
/// Cloning an `Origin` yields another handle to the same backend.
#[derive(Clone)]
pub struct Origin {
    state: Arc<Mutex<OriginState>>,
}

impl Origin {
    pub fn new(backend: SqliteKvStore) -> Self {
        Self {
            state: Arc::new(Mutex::new(OriginState {
                backend,
                subscribers: Vec::new(),
                next_context: 1,
            })),
        }
    }

    /// Opens a file-backed origin with an optional byte quota.
    pub fn open(path: impl AsRef<Path>, quota_bytes: Option<usize>) -> StorageResult<Self> {
        Ok(Self::new(SqliteKvStore::open(path)?.with_quota(quota_bytes)))
    }

    /// Opens an in-memory origin with an optional byte quota.
    pub fn open_in_memory(quota_bytes: Option<usize>) -> StorageResult<Self> {
        Ok(Self::new(
            SqliteKvStore::open_in_memory()?.with_quota(quota_bytes),
        ))
    }

    /// Attaches a new context and returns its storage handle and event stream.
    pub fn attach(&self) -> StorageResult<(ContextStorage, StorageEvents)> {
        let mut state = lock(&self.state)?;
        let context = ContextId(state.next_context);
        state.next_context += 1;

        let (sender, receiver) = channel();
        state.subscribers.push(Subscriber { context, sender });
        debug!(
            "event=context_attach module=storage status=ok context={} contexts={}",
            context,
            state.subscribers.len()
        );

        Ok((
            ContextStorage {
                context,
                origin: self.clone(),
            },
            StorageEvents { receiver },
        ))
    }

    /// Number of contexts still subscribed.
    pub fn context_count(&self) -> StorageResult<usize> {
        Ok(lock(&self.state)?.subscribers.len())
    }

    fn write(&self, writer: ContextId, key: &str, value: Option<&str>) -> StorageResult<()> {
        let mut state = lock(&self.state)?;
        let old_value = state.backend.get(key)?;
        if old_value.as_deref() == value {
            return Ok(());
        }

        match value {
            Some(value) => state.backend.set(key, value)?,
            None => state.backend.remove(key)?,
        }

        let event = StorageEvent {
            key: key.to_string(),
            old_value,
            new_value: value.map(str::to_string),
        };
        state.subscribers.retain(|subscriber| {
            subscriber.context == writer || subscriber.sender.send(event.clone()).is_ok()
        });
        Ok(())
    }
}

/// Storage handle of one context.
///
/// Implements `KeyValueStore`; writes made through it are broadcast to all
/// other contexts of the same origin.
#[derive(Clone)]
pub struct ContextStorage {
    context: ContextId,
    origin: Origin,
}

impl ContextStorage {
    pub fn context(&self) -> ContextId {
        self.context
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }
}

impl KeyValueStore for ContextStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        lock(&self.origin.state)?.backend.get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> StorageResult<()> {
        self.origin.write(self.context, key, Some(value))
    }

    fn remove(&mut self, key: &str) -> StorageResult<()> {
        self.origin.write(self.context, key, None)
    }
}

/// Pending change notifications for one context, in arrival order.
pub struct StorageEvents {
    receiver: Receiver<StorageEvent>,
}

impl StorageEvents {
    /// Returns the next pending event without blocking.
    pub fn try_next(&self) -> Option<StorageEvent> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Takes every pending event.
    pub fn drain(&self) -> Vec<StorageEvent> {
        self.receiver.try_iter().collect()
    }
}

fn lock(state: &Mutex<OriginState>) -> StorageResult<MutexGuard<'_, OriginState>> {
    state.lock().map_err(|_| StorageError::Poisoned)
}

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use dispatch_bus::{Bus, BusError};
use tokio::sync::Mutex;

/// An in-memory stand-in for Redis, used by every test in this workspace
/// instead of a live server. TTLs are accepted but not enforced — nothing
/// in the test suite depends on a key expiring on its own, only on whether
/// it was set at all.
#[derive(Default)]
pub struct FakeBus {
    strings: Mutex<HashMap<String, String>>,
    lists: Mutex<HashMap<String, VecDeque<String>>>,
}

impl FakeBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test helper: read back whatever is currently queued for `key`,
    /// oldest-pushed-first, without consuming it.
    pub async fn list_snapshot(&self, key: &str) -> Vec<String> {
        self.lists
            .lock()
            .await
            .get(key)
            .map(|deque| deque.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Bus for FakeBus {
    async fn get(&self, key: &str) -> Result<Option<String>, BusError> {
        Ok(self.strings.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), BusError> {
        self.strings.lock().await.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn set_ex(&self, key: &str, value: &str, _ttl: Duration) -> Result<(), BusError> {
        self.set(key, value).await
    }

    async fn del(&self, key: &str) -> Result<(), BusError> {
        self.strings.lock().await.remove(key);
        self.lists.lock().await.remove(key);
        Ok(())
    }

    async fn lpush(&self, key: &str, value: &str) -> Result<(), BusError> {
        self.lists
            .lock()
            .await
            .entry(key.to_owned())
            .or_default()
            .push_front(value.to_owned());
        Ok(())
    }

    async fn rpop(&self, key: &str) -> Result<Option<String>, BusError> {
        Ok(self.lists.lock().await.get_mut(key).and_then(VecDeque::pop_back))
    }
}

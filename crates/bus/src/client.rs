use std::time::Duration;

use async_trait::async_trait;

use crate::error::BusError;

/// The operations the dispatcher needs from the Shared Bus, abstracted away
/// from the concrete Redis wire protocol so tests can swap in an in-memory
/// double (`FakeBus`, in `dispatch-test-support`).
///
/// Every method name matches the Redis command it maps to in
/// [`RedisBus`](crate::RedisBus) — there's no reason to rename GET to
/// `read_value` and invite confusion at the call site.
#[async_trait]
pub trait Bus: Send + Sync + 'static {
    async fn get(&self, key: &str) -> Result<Option<String>, BusError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), BusError>;

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), BusError>;

    async fn del(&self, key: &str) -> Result<(), BusError>;

    async fn lpush(&self, key: &str, value: &str) -> Result<(), BusError>;

    async fn rpop(&self, key: &str) -> Result<Option<String>, BusError>;
}

//! Test doubles shared across the workspace: an in-memory Shared Bus and a
//! raw-TCP device client, so integration tests never need a live Redis
//! server or a real escape-room device.

mod fake_bus;
mod mock_device;

pub use fake_bus::FakeBus;
pub use mock_device::MockDeviceClient;

//! Helpers for integration tests: throwaway databases, a scriptable gateway and a controllable clock.
mod fake_gateway;
mod fixed_clock;
pub mod prepare_env;
mod test_system;

pub use fake_gateway::{FakeGateway, TEST_GATEWAY_PUBLIC_KEY, TEST_GATEWAY_SECRET};
pub use fixed_clock::FixedClock;
pub use test_system::TestSystem;

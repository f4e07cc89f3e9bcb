//! # Adapters
//!
//! In-memory implementations of the outbound ports, used by the test suites
//! and local runs. Production embedders supply their own.

pub mod asset;
pub mod callback;
pub mod clock;
pub mod event_log;

pub use asset::InMemoryAsset;
pub use callback::{ConsumerBehavior, MeteredCallback, RecordedInvocation};
pub use clock::{ManualClock, SystemClock};
pub use event_log::InMemoryEventLog;

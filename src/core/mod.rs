pub mod clock;
pub mod metrics;
pub mod ring;
pub mod thread;
pub mod types;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use metrics::{LatencyStats, LatencyTracker};
pub use ring::{InvalidCapacity, RingBuffer};
pub use thread::{pin_to_cpu, promote_to_realtime};
pub use types::{Price, Quantity, Timestamp};

//! Small timing utilities shared by the poller, the follower and probes.

pub mod timeout;

pub use timeout::{Deadline, TimeoutExt};

//! Log following.
//!
//! A [`LogFollower`] owns one connection to a [`LogSource`] at a time,
//! decodes it into lines and appends them to a [`StreamBuffer`](crate::StreamBuffer).

mod decoder;
mod follower;
mod reconnect;
mod source;

pub use decoder::LineDecoder;
pub use follower::{LogFollower, follow};
pub use reconnect::ReconnectPolicy;
pub use source::{ChannelSource, CommandSource, FrameStream, LogSink, LogSource, TcpSource};

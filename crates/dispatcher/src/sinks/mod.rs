//! Destination backends driven by a `TransportHandle` worker
//!
//! `log` only records summaries, `file` appends JSON lines per project,
//! `network` sends one UDP datagram per envelope.

mod file;
mod log;
mod network;

pub use self::file::FileSink;
pub use self::log::LogSink;
pub use self::network::{NetworkFormat, NetworkSink, NetworkSinkConfig};

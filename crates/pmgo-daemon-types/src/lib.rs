//! Types exchanged between the pmgo client and the supervisor daemon.
//!
//! The daemon owns every value defined here; the client only decodes and
//! renders them. [`request`] describes the newline-delimited JSON envelopes
//! carried over the control socket.

pub mod process;
pub mod request;

pub use process::{ProcessDescriptor, ProcessDetail, ProcessSet, ProcessStatus};
pub use request::{DaemonRequest, DaemonResponse, SourceLaunch};

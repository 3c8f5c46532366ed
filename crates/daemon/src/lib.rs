//! zotsync daemon library: scheduling, signal handling, and config lookup
//! for the `zotsync-daemon` binary.

pub mod config_path;
pub mod scheduler;
pub mod signals;

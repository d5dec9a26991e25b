//! Foreground watch runtime: startup pull, connectivity probe, file watcher.

mod error;
pub mod paths;
mod runtime;

pub use error::DaemonError;
pub use runtime::{run, start_blocking, WatchOptions};

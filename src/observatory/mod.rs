//! Mozilla HTTP Observatory watcher
//!
//! Requests a scan for one site, waits until the remote scan has finished,
//! compares the result with the last one seen and emits an event when the
//! score changed.
//!
//! - **ScanRequester**: builds the endpoint URL and performs one POST
//! - **PollLoop**: repeats the request until the scan is terminal
//! - **ChangeDetector**: decides emit/suppress against the stored result
//! - **StateStore**: single-slot durable last-known result
//! - **ObservatoryAgent**: ties the above into one check cycle

pub mod agent;
pub mod api;
pub mod detector;
pub mod error;
pub mod health;
pub mod options;
pub mod poll;
pub mod requester;
pub mod state;
pub mod types;

pub use error::{ObservatoryError, ObservatoryResult};

#[cfg(test)]
pub(crate) mod tests;

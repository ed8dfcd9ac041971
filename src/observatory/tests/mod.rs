//! Test modules for the observatory watcher

pub mod helpers;

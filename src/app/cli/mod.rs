//! Command line parsing and configuration layering

pub mod args;
pub mod config;

#[cfg(test)]
mod tests;

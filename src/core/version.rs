//! Build metadata shared by the binary and the state store.
//! The generated version.rs from the build script is included here so there
//! is a single source of truth.

include!(concat!(env!("OUT_DIR"), "/version.rs"));

/// Format version written into persisted state files.
/// Falls back to 0 if the manifest value could not be parsed.
pub fn state_format_version() -> u32 {
    STATE_FORMAT_VERSION.parse().unwrap_or(0)
}

/// Build time string from the build script (UTC)
pub fn build_time() -> &'static str {
    BUILD_TIME
}

/// Short git hash captured by the build script
pub fn git_hash() -> &'static str {
    GIT_HASH
}

/// Long version line for `--version`
pub fn long_version() -> String {
    format!(
        "{} (git {}, built {})",
        env!("CARGO_PKG_VERSION"),
        git_hash(),
        build_time()
    )
}

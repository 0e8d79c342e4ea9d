//! Build-time metadata embedded by the build script.
//!
//! Used for `dockhand version`, start-up logging, and the default
//! `User-Agent` the client identifies itself with.

/// The git commit hash at build time (short form).
pub const GIT_HASH: &str = env!("DOCKHAND_GIT_HASH");

/// The build timestamp as a Unix epoch string.
pub const BUILD_TIMESTAMP: &str = env!("DOCKHAND_BUILD_TIMESTAMP");

/// The build profile (`debug` or `release`).
pub const BUILD_PROFILE: &str = env!("DOCKHAND_BUILD_PROFILE");

/// The crate version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default `User-Agent` header value sent to the engine.
pub const USER_AGENT: &str = dockhand_config::DEFAULT_USER_AGENT;

/// Return a formatted version string including git hash and profile.
///
/// Example: `"0.1.0 (abc1234, debug)"`
pub fn version_string() -> String {
    format!("{VERSION} ({GIT_HASH}, {BUILD_PROFILE})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_string_contains_version() {
        let v = version_string();
        assert!(v.starts_with(VERSION));
        assert!(v.contains(GIT_HASH));
    }

    #[test]
    fn test_user_agent_names_the_client() {
        assert_eq!(USER_AGENT, format!("dockhand/{VERSION}"));
    }

    #[test]
    fn test_build_timestamp_is_numeric() {
        assert!(BUILD_TIMESTAMP.parse::<u64>().is_ok());
    }
}

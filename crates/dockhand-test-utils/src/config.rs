//! Configuration builders for tests.
//!
//! Use [`TestConfigBuilder`] to create customised [`AppConfig`] values without
//! repeating boilerplate across crate boundaries.

use std::path::Path;

use dockhand_config::AppConfig;

/// Fluent builder for [`AppConfig`] in tests.
///
/// ```ignore
/// let config = TestConfigBuilder::new()
///     .socket_path(daemon.socket_path())
///     .docker_bin("/usr/local/bin/podman")
///     .build();
/// ```
pub struct TestConfigBuilder {
    config: AppConfig,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    pub fn socket_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config.engine.transport = "unix".to_string();
        self.config.engine.socket_path = path.as_ref().to_string_lossy().into_owned();
        self
    }

    pub fn tcp(mut self, host: &str, port: u16) -> Self {
        self.config.engine.transport = "tcp".to_string();
        self.config.engine.tcp_host = host.to_string();
        self.config.engine.tcp_port = port;
        self
    }

    pub fn user_agent(mut self, user_agent: &str) -> Self {
        self.config.engine.user_agent = user_agent.to_string();
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.engine.timeout_secs = secs;
        self
    }

    pub fn docker_bin(mut self, bin: &str) -> Self {
        self.config.cli.docker_bin = bin.to_string();
        self
    }

    pub fn log_level(mut self, level: &str) -> Self {
        self.config.logging.level = level.to_string();
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

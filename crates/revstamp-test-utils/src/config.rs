//! Configuration builders for tests.
//!
//! Use [`TestConfigBuilder`] to create customised [`AppConfig`] values without
//! repeating boilerplate across crate boundaries.

use std::path::Path;

use revstamp_config::AppConfig;

/// Fluent builder for [`AppConfig`] in tests.
///
/// Starts from an isolated configuration: `PATH` search is disabled and
/// there are no fallback roots, so nothing on the host is picked up unless a
/// test asks for it.
///
/// # Example
///
/// ```ignore
/// let config = TestConfigBuilder::new()
///     .binary(vcs.path())
///     .timeout_ms(500)
///     .build();
/// ```
pub struct TestConfigBuilder {
    config: AppConfig,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        let mut config = AppConfig::default();
        config.locator.use_path = false;
        config.locator.fallback_roots.clear();
        Self { config }
    }

    pub fn binary(mut self, path: &Path) -> Self {
        self.config.locator.binary = Some(path.to_string_lossy().into_owned());
        self
    }

    pub fn fallback_root(mut self, root: &Path) -> Self {
        self.config
            .locator
            .fallback_roots
            .push(root.to_string_lossy().into_owned());
        self
    }

    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.config.resolver.timeout_ms = ms;
        self
    }

    pub fn quiet(mut self, quiet: bool) -> Self {
        self.config.resolver.quiet = quiet;
        self
    }

    pub fn default_format(mut self, format: &str) -> Self {
        self.config.template.default_format = format.to_string();
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }

    /// Render the configuration as TOML, for tests that go through a file.
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(&self.config).unwrap_or_default()
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

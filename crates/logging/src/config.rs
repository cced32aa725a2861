//! crates/logging/src/config.rs
//! Subscriber configuration.

/// Environment variable that overrides [`LogConfig::filter`] when set.
pub const LOG_ENV_VAR: &str = "HANDOFF_LOG";

const DEFAULT_FILTER: &str = "warn";

/// Configuration consumed by [`init_tracing`](crate::init_tracing).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LogConfig {
    /// `EnvFilter` directive, e.g. `handoff::replay=debug,warn`.
    pub filter: String,
    /// Emit ANSI colour sequences.
    pub ansi: bool,
    /// Include the event target in each line.
    pub with_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_owned(),
            ansi: false,
            with_target: true,
        }
    }
}

impl LogConfig {
    /// Replaces the filter directive.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Enables or disables ANSI output.
    pub const fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }

    /// Enables or disables target names in output.
    pub const fn with_target(mut self, with_target: bool) -> Self {
        self.with_target = with_target;
        self
    }

    /// Returns the configured filter directive.
    #[must_use]
    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Picks the directive to use: a non-empty override wins over the configured filter.
    pub(crate) fn effective_filter(&self, env_override: Option<&str>) -> String {
        match env_override.map(str::trim) {
            Some(directive) if !directive.is_empty() => directive.to_owned(),
            _ => self.filter.clone(),
        }
    }
}

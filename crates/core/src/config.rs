//! TOML-based configuration for conflict scanning and resolution.
//!
//! The host hands the TOML text in; this crate never reads files. Individual
//! settings can be overridden from `MERGECONFLICTS_*` environment variables
//! via [`ResolverConfig::apply_env_overrides`].

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::ConfigError;

/// Environment variable overriding `resolution.policy`.
pub const POLICY_ENV: &str = "MERGECONFLICTS_POLICY";
/// Environment variable overriding `scanner.strict_markers`.
pub const STRICT_MARKERS_ENV: &str = "MERGECONFLICTS_STRICT_MARKERS";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolverConfig {
    /// How resolution requests are handled.
    #[serde(default)]
    pub resolution: ResolutionConfig,

    /// How marker blocks are recognized.
    #[serde(default)]
    pub scanner: ScannerConfig,
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// What happens when an already-resolved conflict is resolved again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionPolicy {
    /// Reject the second resolution with `ConflictError::AlreadyResolved`.
    #[default]
    Strict,
    /// Overwrite the earlier choice and fire the resolve event again.
    Permissive,
}

impl FromStr for ResolutionPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "permissive" => Ok(Self::Permissive),
            other => Err(ConfigError::InvalidValue {
                field: "resolution.policy".into(),
                detail: format!("unknown policy '{other}' (expected 'strict' or 'permissive')"),
            }),
        }
    }
}

impl std::fmt::Display for ResolutionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::Permissive => write!(f, "permissive"),
        }
    }
}

/// `[resolution]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolutionConfig {
    #[serde(default)]
    pub policy: ResolutionPolicy,
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

/// `[scanner]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScannerConfig {
    /// Fail the build when any marker line is unbalanced or nested, instead
    /// of skipping the malformed block.
    #[serde(default)]
    pub strict_markers: bool,
}

// ---------------------------------------------------------------------------
// Loading & overrides
// ---------------------------------------------------------------------------

impl ResolverConfig {
    /// Parse a configuration from TOML text. Missing sections take their
    /// defaults; unknown keys are rejected.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: ResolverConfig =
            toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        debug!(
            policy = %config.resolution.policy,
            strict_markers = config.scanner.strict_markers,
            "configuration parsed successfully"
        );
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides using `lookup` to fetch variable values. Unset or empty
    /// variables leave the current value alone.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(value) = non_empty(lookup(POLICY_ENV)) {
            self.resolution.policy = value.parse()?;
            info!(policy = %self.resolution.policy, env = POLICY_ENV, "policy overridden");
        }
        if let Some(value) = non_empty(lookup(STRICT_MARKERS_ENV)) {
            self.scanner.strict_markers = parse_bool(&value, "scanner.strict_markers")?;
            info!(
                strict_markers = self.scanner.strict_markers,
                env = STRICT_MARKERS_ENV,
                "strict marker mode overridden"
            );
        }
        Ok(())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_bool(value: &str, field: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            field: field.into(),
            detail: format!("expected a boolean, got '{other}'"),
        }),
    }
}

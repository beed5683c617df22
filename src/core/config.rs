//! Context configuration
//!
//! Settings come from [`ContextConfig::default`], serde, the builder setters
//! or `VISIONPILOT_*` environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Options for creating an [`AutomationContext`](super::context::AutomationContext)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// `auto`, `generic` or `native`
    pub backend: String,
    /// Seconds to pause after every action
    pub action_delay: f64,
    /// Capture directory; a fresh per-context directory is created when unset
    pub screenshot_dir: Option<PathBuf>,
    /// Scratch directory; a fresh per-context directory is created when unset
    pub temp_dir: Option<PathBuf>,
    /// Delete self-created directories when the context closes
    pub cleanup_on_close: bool,
    /// Caller metadata, reported verbatim in stats
    pub metadata: Map<String, Value>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            backend: "auto".to_string(),
            action_delay: 0.5,
            screenshot_dir: None,
            temp_dir: None,
            cleanup_on_close: true,
            metadata: Map::new(),
        }
    }
}

impl ContextConfig {
    /// Defaults overridden by `VISIONPILOT_*` environment variables.
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        Self::from_vars(|name| env::var(name).ok())
    }

    fn from_vars<F>(var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            backend: var("VISIONPILOT_BACKEND").unwrap_or(defaults.backend),
            action_delay: var("VISIONPILOT_ACTION_DELAY")
                .and_then(|d| d.trim().parse().ok())
                .unwrap_or(defaults.action_delay),
            screenshot_dir: var("VISIONPILOT_SCREENSHOT_DIR").map(PathBuf::from),
            temp_dir: var("VISIONPILOT_TEMP_DIR").map(PathBuf::from),
            cleanup_on_close: var("VISIONPILOT_CLEANUP")
                .and_then(|c| parse_flag(&c))
                .unwrap_or(defaults.cleanup_on_close),
            metadata: defaults.metadata,
        }
    }

    pub fn backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = backend.into();
        self
    }

    pub fn action_delay(mut self, seconds: f64) -> Self {
        self.action_delay = seconds;
        self
    }

    pub fn screenshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.screenshot_dir = Some(dir.into());
        self
    }

    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    pub fn cleanup_on_close(mut self, cleanup: bool) -> Self {
        self.cleanup_on_close = cleanup;
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Action delay as a duration; negative or non-finite values mean no delay
    pub fn action_delay_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.action_delay).unwrap_or(Duration::ZERO)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ContextConfig::default();
        assert_eq!(config.backend, "auto");
        assert_eq!(config.action_delay_duration(), Duration::from_millis(500));
        assert!(config.cleanup_on_close);
        assert!(config.screenshot_dir.is_none());
        assert!(config.metadata.is_empty());
    }

    #[test]
    fn test_builder() {
        let config = ContextConfig::default()
            .backend("generic")
            .action_delay(0.0)
            .cleanup_on_close(false)
            .metadata("task", "login")
            .metadata("attempt", 2);
        assert_eq!(config.backend, "generic");
        assert_eq!(config.action_delay_duration(), Duration::ZERO);
        assert!(!config.cleanup_on_close);
        assert_eq!(config.metadata["task"], "login");
        assert_eq!(config.metadata["attempt"], 2);
    }

    #[test]
    fn test_invalid_delay_is_zero() {
        assert_eq!(
            ContextConfig::default().action_delay(-1.0).action_delay_duration(),
            Duration::ZERO
        );
        assert_eq!(
            ContextConfig::default().action_delay(f64::NAN).action_delay_duration(),
            Duration::ZERO
        );
    }

    #[test]
    fn test_deserialize_partial() {
        let config: ContextConfig =
            serde_json::from_str(r#"{"backend": "native", "metadata": {"run": 7}}"#).unwrap();
        assert_eq!(config.backend, "native");
        assert_eq!(config.action_delay, 0.5);
        assert_eq!(config.metadata["run"], 7);
    }

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_from_env_overrides() {
        let config = ContextConfig::from_vars(vars(&[
            ("VISIONPILOT_BACKEND", "native"),
            ("VISIONPILOT_ACTION_DELAY", " 0.25 "),
            ("VISIONPILOT_SCREENSHOT_DIR", "/tmp/shots"),
            ("VISIONPILOT_TEMP_DIR", "/tmp/scratch"),
            ("VISIONPILOT_CLEANUP", "no"),
        ]));
        assert_eq!(config.backend, "native");
        assert_eq!(config.action_delay_duration(), Duration::from_millis(250));
        assert_eq!(config.screenshot_dir, Some(PathBuf::from("/tmp/shots")));
        assert_eq!(config.temp_dir, Some(PathBuf::from("/tmp/scratch")));
        assert!(!config.cleanup_on_close);
    }

    #[test]
    fn test_from_env_ignores_bad_values() {
        let config = ContextConfig::from_vars(vars(&[
            ("VISIONPILOT_ACTION_DELAY", "soon"),
            ("VISIONPILOT_CLEANUP", "maybe"),
        ]));
        assert_eq!(config, ContextConfig::default());
        assert_eq!(ContextConfig::from_vars(vars(&[])), ContextConfig::default());
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}

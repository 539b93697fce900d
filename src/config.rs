// Configuration file handling

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::client::LaunchMeta;
use crate::execution::ReporterOptions;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub portal: PortalConfig,

    #[serde(default)]
    pub reporter: ReporterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortalConfig {
    /// Reporting portal base URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Project the launches belong to
    #[serde(default = "default_project")]
    pub project: String,

    /// API token, never written to the outbox
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Launch name
    #[serde(default = "default_launch")]
    pub launch: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            project: default_project(),
            token: None,
            launch: default_launch(),
            description: None,
            tags: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReporterConfig {
    /// Attach a screenshot to failed tests and hooks
    #[serde(default = "default_attach_screenshots")]
    pub attach_screenshots: bool,

    /// Report hooks that pass
    #[serde(default)]
    pub show_passed_hooks: bool,

    /// Maximum wait for one portal operation (milliseconds)
    #[serde(default = "default_wait_time_ms")]
    pub wait_time_ms: u64,

    /// Directory screenshots are picked up from
    #[serde(default)]
    pub screenshots_dir: Option<PathBuf>,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            attach_screenshots: default_attach_screenshots(),
            show_passed_hooks: false,
            wait_time_ms: default_wait_time_ms(),
            screenshots_dir: None,
        }
    }
}

// Default values
pub const ENV_RP_ENDPOINT: &str = "RP_ENDPOINT";
pub const ENV_RP_TOKEN: &str = "RP_TOKEN";

pub fn default_endpoint() -> String {
    String::from("http://localhost:8080/api/v1")
}

fn default_project() -> String {
    String::from("default_personal")
}

fn default_launch() -> String {
    String::from("Test launch")
}

fn default_attach_screenshots() -> bool {
    true
}

pub fn default_wait_time_ms() -> u64 {
    30_000
}

impl Config {
    /// Load configuration from default locations, falling back to defaults.
    /// Environment variables are applied on top either way.
    pub fn load() -> Self {
        let mut config = Self::discover()
            .and_then(|path| Self::load_from_file(&path))
            .unwrap_or_default();
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// First existing config file, in lookup order:
    /// 1. .rpreporterrc (current directory)
    /// 2. ~/.rpreporterrc (home directory)
    /// 3. .rpreporterrc.toml (current directory)
    /// 4. ~/.rpreporterrc.toml (home directory)
    pub fn discover() -> Option<PathBuf> {
        let cwd = std::env::current_dir().ok();
        let home = dirs::home_dir();

        [".rpreporterrc", ".rpreporterrc.toml"]
            .iter()
            .flat_map(|name| {
                [
                    cwd.as_ref().map(|dir| dir.join(name)),
                    home.as_ref().map(|dir| dir.join(name)),
                ]
            })
            .flatten()
            .find(|path| path.exists())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> Option<Self> {
        toml::from_str(content).ok()
    }

    /// Generate configuration as TOML
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_else(|_| String::new())
    }

    /// Override file values with `RP_ENDPOINT` and `RP_TOKEN`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup(ENV_RP_ENDPOINT).filter(|v| !v.is_empty()) {
            self.portal.endpoint = endpoint;
        }
        if let Some(token) = lookup(ENV_RP_TOKEN).filter(|v| !v.is_empty()) {
            self.portal.token = Some(token);
        }
    }

    pub fn launch_meta(&self) -> LaunchMeta {
        LaunchMeta {
            name: self.portal.launch.clone(),
            description: self.portal.description.clone(),
            tags: self.portal.tags.clone(),
        }
    }

    pub fn reporter_options(&self) -> ReporterOptions {
        ReporterOptions {
            show_passed_hooks: self.reporter.show_passed_hooks,
            attach_screenshots: self.reporter.attach_screenshots,
            wait_time: Duration::from_millis(self.reporter.wait_time_ms),
            launch: self.launch_meta(),
        }
    }

    /// Token with everything but the last four characters hidden.
    pub fn masked_token(&self) -> Option<String> {
        self.portal.token.as_ref().map(|token| {
            let visible: String = token
                .chars()
                .rev()
                .take(4)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            format!("****{}", visible)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml = r#"
[portal]
endpoint = "https://rp.example.com/api/v1"
project = "web"
launch = "nightly"
description = "e2e suite"
tags = ["smoke", "chrome"]

[reporter]
attach_screenshots = false
show_passed_hooks = true
wait_time_ms = 5000
screenshots_dir = "shots"
"#;

        let config = Config::parse(toml).expect("Failed to parse config");
        assert_eq!(config.portal.endpoint, "https://rp.example.com/api/v1");
        assert_eq!(config.portal.project, "web");
        assert_eq!(config.portal.tags, vec!["smoke", "chrome"]);
        assert!(!config.reporter.attach_screenshots);
        assert!(config.reporter.show_passed_hooks);
        assert_eq!(config.reporter.screenshots_dir, Some(PathBuf::from("shots")));

        let options = config.reporter_options();
        assert_eq!(options.wait_time, Duration::from_millis(5000));
        assert_eq!(options.launch.name, "nightly");
        assert_eq!(options.launch.description.as_deref(), Some("e2e suite"));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = Config::parse("[portal]\nproject = \"p\"\n").unwrap();
        assert_eq!(config.portal.launch, "Test launch");
        assert!(config.reporter.attach_screenshots);
        assert!(!config.reporter.show_passed_hooks);
        assert_eq!(config.reporter.wait_time_ms, 30_000);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(Config::parse("[portal\nendpoint=").is_none());
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = Config::default();
        config.apply_env(|key| match key {
            ENV_RP_ENDPOINT => Some("https://env.example.com".to_string()),
            ENV_RP_TOKEN => Some("secret-token-1234".to_string()),
            _ => None,
        });
        assert_eq!(config.portal.endpoint, "https://env.example.com");
        assert_eq!(config.masked_token().as_deref(), Some("****1234"));
    }

    #[test]
    fn test_token_not_serialized_when_absent() {
        let toml = Config::default().to_toml();
        assert!(!toml.contains("token"));
        assert!(toml.contains("[reporter]"));
        assert_eq!(Config::parse(&toml), Some(Config::default()));
    }
}

//! CLI argument definitions for the Wattwise application.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

use wattwise_engine::ActionContext;

/// Wattwise: energy-saving optimizations for an open browser session.
#[derive(Parser, Debug)]
#[command(name = "wattwise", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// JSON browser snapshot (tabs, metrics, battery) to optimize.
    #[arg(short = 's', long = "snapshot")]
    pub snapshot: Option<PathBuf>,

    /// Action to run. Repeat to run several in order; defaults to the
    /// configured schedule actions.
    #[arg(short = 'a', long = "action")]
    pub actions: Vec<String>,

    /// Action context as inline JSON, e.g. '{"tab_id": 3, "hour": 22}'.
    #[arg(long = "context")]
    pub context: Option<String>,

    /// Keep running the configured schedule until interrupted.
    #[arg(short = 'w', long = "watch")]
    pub watch: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > WATTWISE_CONFIG env var > platform default (~/.wattwise/config.toml).
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("WATTWISE_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }

    /// Parse `--context`, or an empty context when the flag is absent.
    pub fn parse_context(&self) -> Result<ActionContext, serde_json::Error> {
        match self.context.as_deref() {
            Some(json) => serde_json::from_str(json),
            None => Ok(ActionContext::default()),
        }
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".wattwise").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".wattwise").join("config.toml");
    }
    PathBuf::from("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wattwise_engine::{TabId, VideoQuality};

    #[test]
    fn test_parse_repeated_actions() {
        let args = CliArgs::try_parse_from([
            "wattwise",
            "--action",
            "intelligentTabSuspension",
            "-a",
            "adaptiveDarkMode",
        ])
        .unwrap();
        assert_eq!(args.actions, vec!["intelligentTabSuspension", "adaptiveDarkMode"]);
        assert!(!args.watch);
    }

    #[test]
    fn test_config_flag_wins() {
        let args =
            CliArgs::try_parse_from(["wattwise", "--config", "/tmp/wattwise.toml"]).unwrap();
        assert_eq!(args.resolve_config_path(), PathBuf::from("/tmp/wattwise.toml"));
    }

    #[test]
    fn test_log_level_falls_back_to_config() {
        let args = CliArgs::try_parse_from(["wattwise"]).unwrap();
        assert_eq!(args.resolve_log_level("warn"), "warn");
        let args = CliArgs::try_parse_from(["wattwise", "-l", "debug"]).unwrap();
        assert_eq!(args.resolve_log_level("warn"), "debug");
    }

    #[test]
    fn test_parse_context_json() {
        let args = CliArgs::try_parse_from([
            "wattwise",
            "--context",
            r#"{"tab_id": 3, "current_quality": "720p", "hour": 22}"#,
        ])
        .unwrap();
        let ctx = args.parse_context().unwrap();
        assert_eq!(ctx.tab_id, Some(TabId(3)));
        assert_eq!(ctx.current_quality, Some(VideoQuality::P720));
        assert_eq!(ctx.hour, Some(22));
        assert_eq!(ctx.active_tabs, None);
    }

    #[test]
    fn test_parse_context_rejects_bad_json() {
        let args = CliArgs::try_parse_from(["wattwise", "--context", "{tab_id"]).unwrap();
        assert!(args.parse_context().is_err());
    }
}

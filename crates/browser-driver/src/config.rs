use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use which::which;

/// Launch and tuning parameters for the Chromium-backed driver.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CdpConfig {
    pub executable: PathBuf,
    pub user_data_dir: PathBuf,
    pub headless: bool,
    pub default_deadline_ms: u64,
    pub websocket_url: Option<String>,
    pub heartbeat_interval_ms: u64,
    pub download_dir: Option<PathBuf>,
    pub navigation_timeout_ms: u64,
}

impl Default for CdpConfig {
    fn default() -> Self {
        Self {
            executable: detect_chrome_executable().unwrap_or_default(),
            user_data_dir: default_profile_dir(),
            headless: resolve_headless_default(),
            default_deadline_ms: 30_000,
            websocket_url: resolve_ws_url(),
            heartbeat_interval_ms: 15_000,
            download_dir: None,
            navigation_timeout_ms: 30_000,
        }
    }
}

impl CdpConfig {
    /// Re-applies `BIC_*` environment overrides on top of values loaded from a file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(value) = env::var("BIC_HEADLESS") {
            self.headless = parse_headless(&value);
        }
        if let Some(path) = env_path("BIC_CHROME") {
            self.executable = path;
        }
        if let Some(path) = env_path("BIC_CHROME_PROFILE") {
            self.user_data_dir = path;
        }
        if let Some(url) = resolve_ws_url() {
            self.websocket_url = Some(url);
        }
    }

    /// The configured executable when it exists, otherwise whatever detection finds.
    pub fn resolve_executable(&self) -> Option<PathBuf> {
        if !self.executable.as_os_str().is_empty() && self.executable.exists() {
            return Some(self.executable.clone());
        }
        detect_chrome_executable()
    }
}

fn parse_headless(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}

fn resolve_headless_default() -> bool {
    env::var("BIC_HEADLESS")
        .map(|value| parse_headless(&value))
        .unwrap_or(true)
}

fn resolve_ws_url() -> Option<String> {
    env::var("BIC_WS_URL")
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

fn default_profile_dir() -> PathBuf {
    env_path("BIC_CHROME_PROFILE").unwrap_or_else(|| Path::new("./.bic-profile").into())
}

pub fn detect_chrome_executable() -> Option<PathBuf> {
    if let Some(candidate) = env_path("BIC_CHROME") {
        if candidate.exists() {
            return Some(candidate);
        }
    }

    for name in chrome_executable_names() {
        if let Ok(path) = which(name) {
            return Some(path);
        }
    }

    os_specific_chrome_paths()
        .into_iter()
        .find(|candidate| candidate.exists())
}

fn chrome_executable_names() -> &'static [&'static str] {
    #[cfg(target_os = "windows")]
    {
        &["chrome.exe", "chromium.exe", "msedge.exe"]
    }

    #[cfg(not(target_os = "windows"))]
    {
        &[
            "google-chrome-stable",
            "google-chrome",
            "chromium",
            "chromium-browser",
        ]
    }
}

fn os_specific_chrome_paths() -> Vec<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        vec![
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"),
            PathBuf::from("/Applications/Chromium.app/Contents/MacOS/Chromium"),
        ]
    }

    #[cfg(any(target_os = "linux", target_os = "freebsd"))]
    {
        vec![
            PathBuf::from("/usr/bin/google-chrome-stable"),
            PathBuf::from("/usr/bin/google-chrome"),
            PathBuf::from("/usr/bin/chromium-browser"),
            PathBuf::from("/usr/bin/chromium"),
        ]
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "freebsd")))]
    {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn headless_flag_parsing() {
        assert!(parse_headless("1"));
        assert!(parse_headless("yes"));
        assert!(!parse_headless("Off"));
        assert!(!parse_headless(" false "));
    }

    #[test]
    fn detects_from_env_var() {
        let dir = tempdir().unwrap();
        let exe_path = dir.path().join("my-chrome");
        fs::write(&exe_path, b"").unwrap();
        let original = env::var("BIC_CHROME").ok();
        env::set_var("BIC_CHROME", exe_path.to_string_lossy().to_string());
        let detected = detect_chrome_executable();
        if let Some(value) = original {
            env::set_var("BIC_CHROME", value);
        } else {
            env::remove_var("BIC_CHROME");
        }
        assert_eq!(detected, Some(exe_path));
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let cfg: CdpConfig =
            serde_json::from_value(serde_json::json!({ "navigation_timeout_ms": 5000 })).unwrap();
        assert_eq!(cfg.navigation_timeout_ms, 5000);
        assert_eq!(cfg.default_deadline_ms, 30_000);
    }
}

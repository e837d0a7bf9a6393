// src/config/tracker.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

pub const ENV_CONFIG_PATH: &str = "TRACKER_CONFIG_PATH";
pub const ENV_MOCK_MODE: &str = "TRACKER_MOCK_MODE";
pub const ENV_HISTORY_PATH: &str = "TRACKER_HISTORY_PATH";

const DEFAULT_PHU_QUY_URL: &str =
    "https://be.phuquy.com.vn/jewelry/product-payment-service/api/products/get-price";
const DEFAULT_BTMC_URL: &str =
    "http://api.btmc.vn/api/BTMCAPI/getpricebtmc?key=3kd8ub1llcg9t45hnoh8hmn7t5kc2v";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 30;
const DEFAULT_WINDOW_HOURS: u32 = 24;
const DEFAULT_HISTORY_CAPACITY: usize = 50_000;

/// Everything the tracker needs at construction time. Passed explicitly to
/// providers, the scheduler and the HTTP layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub phu_quy_url: String,
    pub btmc_url: String,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub refresh_interval_secs: u64,
    /// BCP 47 tag used for number formatting, e.g. "vi-VN".
    pub locale: String,
    /// Window used by the history endpoints when the caller gives none.
    pub default_window_hours: u32,
    /// JSON-lines history file. In-memory history when unset.
    pub history_path: Option<PathBuf>,
    pub history_capacity: usize,
    /// Serve bundled sample payloads instead of calling the vendors.
    pub mock_mode: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            phu_quy_url: DEFAULT_PHU_QUY_URL.to_string(),
            btmc_url: DEFAULT_BTMC_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            locale: "vi-VN".to_string(),
            default_window_hours: DEFAULT_WINDOW_HOURS,
            history_path: None,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            mock_mode: false,
        }
    }
}

impl TrackerConfig {
    /// Load from an explicit path. Supports TOML or JSON formats.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading tracker config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg = parse(&content, ext.as_str())
            .with_context(|| format!("parsing tracker config {}", path.display()))?;
        Ok(cfg.sanitized())
    }

    /// Load using env var + fallbacks, then apply env overrides:
    /// 1) $TRACKER_CONFIG_PATH
    /// 2) config/tracker.toml
    /// 3) config/tracker.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self> {
        let mut cfg = Self::load_file_default()?;
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    fn load_file_default() -> Result<Self> {
        if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        for candidate in ["config/tracker.toml", "config/tracker.json"] {
            let p = PathBuf::from(candidate);
            if p.exists() {
                return Self::load_from(&p);
            }
        }
        Ok(Self::default())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = env::var(ENV_MOCK_MODE) {
            self.mock_mode = matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Ok(p) = env::var(ENV_HISTORY_PATH) {
            let p = p.trim();
            self.history_path = (!p.is_empty()).then(|| PathBuf::from(p));
        }
    }

    /// Zero intervals, windows or capacities fall back to defaults.
    fn sanitized(mut self) -> Self {
        if self.request_timeout_secs == 0 {
            self.request_timeout_secs = DEFAULT_REQUEST_TIMEOUT_SECS;
        }
        if self.refresh_interval_secs == 0 {
            self.refresh_interval_secs = DEFAULT_REFRESH_INTERVAL_SECS;
        }
        if self.default_window_hours == 0 {
            self.default_window_hours = DEFAULT_WINDOW_HOURS;
        }
        if self.history_capacity == 0 {
            self.history_capacity = DEFAULT_HISTORY_CAPACITY;
        }
        if self.locale.trim().is_empty() {
            self.locale = "vi-VN".to_string();
        }
        self
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse(s: &str, hint_ext: &str) -> Result<TrackerConfig> {
    match hint_ext {
        "toml" => Ok(toml::from_str(s)?),
        "json" => Ok(serde_json::from_str(s)?),
        _ => serde_json::from_str::<TrackerConfig>(s)
            .or_else(|_| toml::from_str(s))
            .map_err(|_| anyhow!("unsupported tracker config format")),
    }
}

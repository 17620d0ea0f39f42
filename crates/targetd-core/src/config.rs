use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Configuration invariant violated; rejected before the refresher starts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("base backoff {base:?} exceeds max backoff {max:?}")]
    BackoffOrder { base: Duration, max: Duration },
    #[error("refresh interval must be greater than zero")]
    ZeroInterval,
    #[error("refresh timeout must be greater than zero")]
    ZeroTimeout,
    #[error("{field} of {value:?} is too long to schedule")]
    Unrepresentable { field: &'static str, value: Duration },
}

/// Validated refresh policy, fixed for the lifetime of a refresher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshConfig {
    /// Time between scheduled refreshes.
    pub interval: Duration,
    /// Discovery calls allowed per refresh cycle.
    pub max_retries: u32,
    /// Delay before the second attempt of a cycle.
    pub base_backoff: Duration,
    /// Cap on any single backoff delay.
    pub max_backoff: Duration,
    /// Minimum spacing between accepted manual triggers.
    pub rate_limit_window: Duration,
    /// Deadline for one discovery call.
    pub refresh_timeout: Duration,
    /// Delay before the first scheduled refresh.
    pub warmup_period: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            max_retries: 5,
            base_backoff: Duration::from_secs(30),
            max_backoff: Duration::from_secs(300),
            rate_limit_window: Duration::from_secs(60),
            refresh_timeout: Duration::from_secs(30),
            warmup_period: Duration::from_secs(30),
        }
    }
}

impl RefreshConfig {
    pub fn with_interval(mut self, d: Duration) -> Self {
        self.interval = d;
        self
    }

    pub fn with_max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    pub fn with_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.base_backoff = base;
        self.max_backoff = max;
        self
    }

    pub fn with_rate_limit_window(mut self, d: Duration) -> Self {
        self.rate_limit_window = d;
        self
    }

    pub fn with_refresh_timeout(mut self, d: Duration) -> Self {
        self.refresh_timeout = d;
        self
    }

    pub fn with_warmup_period(mut self, d: Duration) -> Self {
        self.warmup_period = d;
        self
    }

    /// Check invariants. Values are never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_backoff > self.max_backoff {
            return Err(ConfigError::BackoffOrder {
                base: self.base_backoff,
                max: self.max_backoff,
            });
        }
        if self.interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        if self.refresh_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        let now = Instant::now();
        for (field, value) in [("warmup period", self.warmup_period), ("interval", self.interval)] {
            if now.checked_add(value).is_none() {
                return Err(ConfigError::Unrepresentable { field, value });
            }
        }
        Ok(())
    }
}

/// `[refresh]` section of config.toml, in whole seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshSection {
    pub interval_secs: u64,
    pub max_retries: u32,
    pub base_backoff_secs: u64,
    pub max_backoff_secs: u64,
    pub rate_limit_window_secs: u64,
    pub refresh_timeout_secs: u64,
    pub warmup_secs: u64,
}

impl Default for RefreshSection {
    fn default() -> Self {
        let d = RefreshConfig::default();
        Self {
            interval_secs: d.interval.as_secs(),
            max_retries: d.max_retries,
            base_backoff_secs: d.base_backoff.as_secs(),
            max_backoff_secs: d.max_backoff.as_secs(),
            rate_limit_window_secs: d.rate_limit_window.as_secs(),
            refresh_timeout_secs: d.refresh_timeout.as_secs(),
            warmup_secs: d.warmup_period.as_secs(),
        }
    }
}

impl RefreshSection {
    /// Convert to a validated [`RefreshConfig`].
    pub fn to_refresh_config(&self) -> Result<RefreshConfig, ConfigError> {
        let cfg = RefreshConfig {
            interval: Duration::from_secs(self.interval_secs),
            max_retries: self.max_retries,
            base_backoff: Duration::from_secs(self.base_backoff_secs),
            max_backoff: Duration::from_secs(self.max_backoff_secs),
            rate_limit_window: Duration::from_secs(self.rate_limit_window_secs),
            refresh_timeout: Duration::from_secs(self.refresh_timeout_secs),
            warmup_period: Duration::from_secs(self.warmup_secs),
        };
        cfg.validate()?;
        Ok(cfg)
    }
}

/// Global configuration loaded from `~/.config/targetd/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetdConfig {
    /// JSON file read by the file discovery source. Overridden by `--targets`.
    #[serde(default)]
    pub targets_path: Option<PathBuf>,
    /// How long a graceful stop may take before the refresh is abandoned.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
    #[serde(default)]
    pub refresh: RefreshSection,
}

fn default_shutdown_timeout_secs() -> u64 {
    10
}

impl Default for TargetdConfig {
    fn default() -> Self {
        Self {
            targets_path: None,
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
            refresh: RefreshSection::default(),
        }
    }
}

impl TargetdConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("targetd")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<TargetdConfig> {
    load_or_init_at(&config_path()?)
}

/// Same as [`load_or_init`] for an explicit path.
pub fn load_or_init_at(path: &Path) -> Result<TargetdConfig> {
    if !path.exists() {
        let default_cfg = TargetdConfig::default();
        let toml = default_cfg.to_toml()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path)?;
    let cfg: TargetdConfig = toml::from_str(&data)
        .map_err(|e| anyhow::anyhow!("parse {}: {}", path.display(), e))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_refresh_values() {
        let cfg = RefreshConfig::default();
        assert_eq!(cfg.interval, Duration::from_secs(300));
        assert_eq!(cfg.max_retries, 5);
        assert_eq!(cfg.base_backoff, Duration::from_secs(30));
        assert_eq!(cfg.max_backoff, Duration::from_secs(300));
        assert_eq!(cfg.rate_limit_window, Duration::from_secs(60));
        assert_eq!(cfg.refresh_timeout, Duration::from_secs(30));
        assert_eq!(cfg.warmup_period, Duration::from_secs(30));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn base_above_max_is_rejected_not_clamped() {
        let cfg = RefreshConfig::default()
            .with_backoff(Duration::from_secs(600), Duration::from_secs(300));
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::BackoffOrder {
                base: Duration::from_secs(600),
                max: Duration::from_secs(300),
            })
        );
    }

    #[test]
    fn zero_interval_and_timeout_rejected() {
        let cfg = RefreshConfig::default().with_interval(Duration::ZERO);
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroInterval));
        let cfg = RefreshConfig::default().with_refresh_timeout(Duration::ZERO);
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroTimeout));
    }

    #[test]
    fn unschedulable_durations_rejected() {
        let huge = Duration::from_secs(u64::MAX);
        let cfg = RefreshConfig::default().with_warmup_period(huge);
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::Unrepresentable {
                field: "warmup period",
                value: huge,
            })
        );
        let cfg = RefreshConfig::default().with_interval(huge);
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Unrepresentable { field: "interval", .. })
        ));
    }

    #[test]
    fn config_toml_huge_warmup_fails_conversion() {
        let toml = "[refresh]\nwarmup_secs = 9223372036854775807\n";
        let cfg: TargetdConfig = toml::from_str(toml).unwrap();
        assert!(matches!(
            cfg.refresh.to_refresh_config(),
            Err(ConfigError::Unrepresentable { .. })
        ));
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = TargetdConfig::default();
        let toml = cfg.to_toml().unwrap();
        let parsed: TargetdConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, cfg);
        assert_eq!(parsed.refresh.to_refresh_config().unwrap(), RefreshConfig::default());
    }

    #[test]
    fn empty_toml_uses_defaults() {
        let cfg: TargetdConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, TargetdConfig::default());
        assert_eq!(cfg.shutdown_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn config_toml_partial_refresh_section() {
        let toml = r#"
            targets_path = "/etc/targetd/targets.json"

            [refresh]
            interval_secs = 60
            max_retries = 2
        "#;
        let cfg: TargetdConfig = toml::from_str(toml).unwrap();
        assert_eq!(
            cfg.targets_path.as_deref(),
            Some(std::path::Path::new("/etc/targetd/targets.json"))
        );
        let refresh = cfg.refresh.to_refresh_config().unwrap();
        assert_eq!(refresh.interval, Duration::from_secs(60));
        assert_eq!(refresh.max_retries, 2);
        assert_eq!(refresh.base_backoff, Duration::from_secs(30));
        assert_eq!(refresh.warmup_period, Duration::from_secs(30));
    }

    #[test]
    fn load_or_init_creates_then_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let created = load_or_init_at(&path).unwrap();
        assert_eq!(created, TargetdConfig::default());
        assert!(path.exists());

        fs::write(&path, "shutdown_timeout_secs = 3\n[refresh]\nwarmup_secs = 0\n").unwrap();
        let loaded = load_or_init_at(&path).unwrap();
        assert_eq!(loaded.shutdown_timeout(), Duration::from_secs(3));
        assert_eq!(loaded.refresh.warmup_secs, 0);
    }

    #[test]
    fn load_reports_parse_errors_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "refresh = 5").unwrap();
        let err = load_or_init_at(&path).unwrap_err();
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn config_toml_invalid_backoff_fails_conversion() {
        let toml = r#"
            [refresh]
            base_backoff_secs = 120
            max_backoff_secs = 60
        "#;
        let cfg: TargetdConfig = toml::from_str(toml).unwrap();
        assert!(matches!(
            cfg.refresh.to_refresh_config(),
            Err(ConfigError::BackoffOrder { .. })
        ));
    }
}

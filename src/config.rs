use chrono::Duration;
use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub services: ServicesConfig,
  #[serde(default = "default_request_timeout_secs")]
  pub request_timeout_secs: u64,
  #[serde(default)]
  pub cache: CacheConfig,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      services: ServicesConfig::default(),
      request_timeout_secs: default_request_timeout_secs(),
      cache: CacheConfig::default(),
    }
  }
}

fn default_request_timeout_secs() -> u64 {
  30
}

/// Base URLs of the backend services.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
  pub accounts: String,
  pub transactions: String,
  pub capital_markets: String,
  pub open_finance: String,
  pub chatbot: String,
}

impl Default for ServicesConfig {
  fn default() -> Self {
    Self {
      accounts: "http://localhost:8001".to_string(),
      transactions: "http://localhost:8002".to_string(),
      capital_markets: "http://localhost:8003".to_string(),
      open_finance: "http://localhost:8004".to_string(),
      chatbot: "http://localhost:8005".to_string(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  pub enabled: bool,
  /// Staleness window for the macro indicator cache
  pub ttl_secs: u64,
  /// Share one background refresh between concurrent stale hits
  pub coalesce_refreshes: bool,
  /// Entries older than this are never served
  pub max_age_secs: Option<u64>,
  /// Cache database location (default: $XDG_DATA_HOME/bankview/cache.db)
  pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      ttl_secs: 6 * 60 * 60,
      coalesce_refreshes: false,
      max_age_secs: None,
      path: None,
    }
  }
}

impl CacheConfig {
  pub fn ttl(&self) -> Result<Duration> {
    seconds("cache.ttl_secs", self.ttl_secs)
  }

  pub fn max_age(&self) -> Result<Option<Duration>> {
    self
      .max_age_secs
      .map(|secs| seconds("cache.max_age_secs", secs))
      .transpose()
  }
}

fn seconds(name: &str, secs: u64) -> Result<Duration> {
  i64::try_from(secs)
    .ok()
    .and_then(Duration::try_seconds)
    .ok_or_else(|| eyre!("{} is out of range: {}", name, secs))
}

impl Config {
  /// Load configuration from file, then apply environment overrides.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./bankview.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/bankview/config.yaml
  ///
  /// Built-in defaults are used when no file exists.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Self::default(),
    };

    config.apply_env(|name| std::env::var(name).ok())?;
    config.validate()?;

    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("bankview.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("bankview").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn from_yaml(contents: &str) -> Result<Self> {
    Ok(serde_yaml::from_str(contents)?)
  }

  /// Override base URLs and the cache ttl from environment variables.
  ///
  /// Recognized: BANKVIEW_{ACCOUNTS,TRANSACTIONS,CAPITAL_MARKETS,OPEN_FINANCE,CHATBOT}_URL
  /// and BANKVIEW_CACHE_TTL_SECS.
  pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
  where
    F: Fn(&str) -> Option<String>,
  {
    let services = &mut self.services;
    for (name, target) in [
      ("BANKVIEW_ACCOUNTS_URL", &mut services.accounts),
      ("BANKVIEW_TRANSACTIONS_URL", &mut services.transactions),
      ("BANKVIEW_CAPITAL_MARKETS_URL", &mut services.capital_markets),
      ("BANKVIEW_OPEN_FINANCE_URL", &mut services.open_finance),
      ("BANKVIEW_CHATBOT_URL", &mut services.chatbot),
    ] {
      if let Some(value) = lookup(name) {
        *target = value;
      }
    }

    if let Some(ttl) = lookup("BANKVIEW_CACHE_TTL_SECS") {
      self.cache.ttl_secs = ttl
        .trim()
        .parse()
        .map_err(|e| eyre!("Invalid BANKVIEW_CACHE_TTL_SECS '{}': {}", ttl, e))?;
    }

    Ok(())
  }

  pub fn validate(&self) -> Result<()> {
    for (name, url) in [
      ("accounts", &self.services.accounts),
      ("transactions", &self.services.transactions),
      ("capital_markets", &self.services.capital_markets),
      ("open_finance", &self.services.open_finance),
      ("chatbot", &self.services.chatbot),
    ] {
      Url::parse(url).map_err(|e| eyre!("Invalid {} service URL '{}': {}", name, url, e))?;
    }

    if self.cache.ttl_secs == 0 {
      return Err(eyre!("cache.ttl_secs must be positive"));
    }
    let ttl = self.cache.ttl()?;

    // Stale entries are served between ttl and max age
    if let Some(max_age) = self.cache.max_age()? {
      if max_age <= ttl {
        return Err(eyre!(
          "cache.max_age_secs ({}) must be greater than cache.ttl_secs ({})",
          max_age.num_seconds(),
          ttl.num_seconds()
        ));
      }
    }

    Ok(())
  }
}

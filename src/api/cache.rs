//! Cache keys for banking service queries.

use sha2::{Digest, Sha256};

use crate::cache::CacheKey;

/// Query key types for cached service calls.
#[derive(Clone, Debug)]
pub enum BankQueryKey {
  /// Macroeconomic indicators, optionally for one region
  MacroIndicators { region: Option<String> },
}

impl CacheKey for BankQueryKey {
  fn cache_hash(&self) -> String {
    let input = match self {
      Self::MacroIndicators { region } => format!(
        "macro_indicators:{}",
        region.as_deref().map(normalize_region).unwrap_or_default()
      ),
    };

    // SHA256 hash for stable, fixed-length keys
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
  }

  fn description(&self) -> String {
    match self {
      Self::MacroIndicators { region: Some(r) } => {
        format!("macro indicators ({})", normalize_region(r))
      }
      Self::MacroIndicators { region: None } => "macro indicators".to_string(),
    }
  }
}

/// Region codes are case-insensitive.
fn normalize_region(region: &str) -> String {
  region.trim().to_uppercase()
}

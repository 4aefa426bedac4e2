//! Serde types matching the backend service payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Accounts and transactions
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub account_type: String,
  pub balance: f64,
  #[serde(default = "default_currency")]
  pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
  pub id: String,
  pub account_id: String,
  pub amount: f64,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub category: Option<String>,
  /// ISO 8601 date or timestamp
  pub date: String,
  #[serde(default = "default_currency")]
  pub currency: String,
}

fn default_currency() -> String {
  "USD".to_string()
}

// ============================================================================
// Capital markets
// ============================================================================

/// One named macroeconomic indicator reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroIndicator {
  pub name: String,
  pub value: f64,
  #[serde(default)]
  pub unit: Option<String>,
  /// Percent change versus the previous reading
  #[serde(default)]
  pub change_pct: Option<f64>,
  #[serde(default)]
  pub as_of: Option<String>,
}

/// Indicators response; accepts either a bare list or `{"indicators": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MacroIndicatorsResponse {
  Wrapped { indicators: Vec<MacroIndicator> },
  List(Vec<MacroIndicator>),
}

impl From<MacroIndicatorsResponse> for Vec<MacroIndicator> {
  fn from(response: MacroIndicatorsResponse) -> Self {
    match response {
      MacroIndicatorsResponse::Wrapped { indicators } => indicators,
      MacroIndicatorsResponse::List(indicators) => indicators,
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct MarketAnalysisRequest {
  pub symbols: Vec<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub question: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketAnalysis {
  #[serde(default)]
  pub summary: String,
  /// Sentiment in [-1, 1] per symbol, when the agents produce one
  #[serde(default)]
  pub sentiment: Vec<SymbolSentiment>,
  #[serde(default)]
  pub recommendation: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SymbolSentiment {
  pub symbol: String,
  pub score: f64,
}

// ============================================================================
// Open finance
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct OpenFinanceAccount {
  pub institution: String,
  pub name: String,
  pub balance: f64,
  #[serde(default = "default_currency")]
  pub currency: String,
}

// ============================================================================
// Chatbot
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
  pub question: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatAnswer {
  pub answer: String,
  #[serde(default)]
  pub sources: Vec<String>,
}

// ============================================================================
// Errors
// ============================================================================

/// Error body returned with non-2xx responses.
#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
  pub detail: Option<Value>,
  pub error: Option<Value>,
}

impl ApiErrorBody {
  /// The failure reason, preferring `detail` over `error`.
  pub fn reason(&self) -> Option<String> {
    [&self.detail, &self.error]
      .into_iter()
      .flatten()
      .find_map(|v| match v {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
      })
  }
}

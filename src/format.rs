//! Presentation helpers for terminal output.

use chrono::{DateTime, NaiveDate, Utc};

/// Change (in percent) at or beyond which an indicator is flagged
const CHANGE_THRESHOLD_PCT: f64 = 0.5;

/// Status badge derived from threshold comparisons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Badge {
  Positive,
  Warning,
  Negative,
  Neutral,
}

impl Badge {
  pub fn label(&self) -> &'static str {
    match self {
      Badge::Positive => "▲",
      Badge::Warning => "!",
      Badge::Negative => "▼",
      Badge::Neutral => "•",
    }
  }
}

/// Badge for a percent change
pub fn change_badge(change_pct: f64) -> Badge {
  if change_pct >= CHANGE_THRESHOLD_PCT {
    Badge::Positive
  } else if change_pct <= -CHANGE_THRESHOLD_PCT {
    Badge::Negative
  } else {
    Badge::Neutral
  }
}

/// Badge for an account balance against a low-balance threshold
pub fn balance_badge(balance: f64, low_threshold: f64) -> Badge {
  if balance < 0.0 {
    Badge::Negative
  } else if balance < low_threshold {
    Badge::Warning
  } else {
    Badge::Positive
  }
}

/// Format an amount with thousands separators and two decimals.
///
/// USD, EUR and GBP get a leading symbol; other codes are appended.
pub fn format_currency(amount: f64, currency: &str) -> String {
  let cents = (amount.abs() * 100.0).round() as u64;
  let whole = group_thousands(cents / 100);
  let number = format!("{}.{:02}", whole, cents % 100);
  let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };

  let code = currency.trim().to_uppercase();
  match code.as_str() {
    "USD" => format!("{}${}", sign, number),
    "EUR" => format!("{}€{}", sign, number),
    "GBP" => format!("{}£{}", sign, number),
    _ => format!("{}{} {}", sign, number, code),
  }
}

fn group_thousands(n: u64) -> String {
  let digits = n.to_string();
  let mut out = String::with_capacity(digits.len() + digits.len() / 3);
  for (i, c) in digits.chars().enumerate() {
    if i > 0 && (digits.len() - i) % 3 == 0 {
      out.push(',');
    }
    out.push(c);
  }
  out
}

/// Format an RFC 3339 timestamp or `YYYY-MM-DD` date as `Oct 18, 2026`.
/// Unparseable input is returned unchanged.
pub fn format_date(value: &str) -> String {
  let value = value.trim();
  if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
    return dt.format("%b %-d, %Y").to_string();
  }
  if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
    return date.format("%b %-d, %Y").to_string();
  }
  value.to_string()
}

/// Coarse age of a timestamp relative to `now`
pub fn format_age(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
  let secs = (now - at).num_seconds().max(0);
  match secs {
    0..=59 => "just now".to_string(),
    60..=3599 => format!("{}m ago", secs / 60),
    3600..=86399 => format!("{}h ago", secs / 3600),
    _ => format!("{}d ago", secs / 86400),
  }
}

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

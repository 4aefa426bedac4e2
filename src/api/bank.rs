use color_eyre::{eyre::eyre, Result};
use std::time::Duration;

use crate::config::Config;

use super::auth;
use super::client::ServiceClient;
use super::types::{
  Account, ChatAnswer, ChatRequest, MacroIndicator, MacroIndicatorsResponse, MarketAnalysis,
  MarketAnalysisRequest, OpenFinanceAccount, Transaction,
};

/// Client for the banking backend services
#[derive(Clone)]
pub struct BankClient {
  accounts: ServiceClient,
  transactions: ServiceClient,
  capital_markets: ServiceClient,
  open_finance: ServiceClient,
  chatbot: ServiceClient,
}

impl BankClient {
  pub fn new(config: &Config) -> Result<Self> {
    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.request_timeout_secs))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    let services = &config.services;
    Ok(Self {
      accounts: ServiceClient::with_http("accounts", &services.accounts, http.clone())?,
      transactions: ServiceClient::with_http("transactions", &services.transactions, http.clone())?,
      capital_markets: ServiceClient::with_http(
        "capital-markets",
        &services.capital_markets,
        http.clone(),
      )?,
      open_finance: ServiceClient::with_http("open-finance", &services.open_finance, http.clone())?,
      chatbot: ServiceClient::with_http("chatbot", &services.chatbot, http)?,
    })
  }

  /// List all accounts
  pub async fn list_accounts(&self) -> Result<Vec<Account>> {
    self.accounts.get_json(&["accounts"], &[]).await
  }

  /// Get a single account by id
  pub async fn get_account(&self, id: &str) -> Result<Account> {
    // Dot segments would be dropped from the path, turning this into a list call
    if matches!(id.trim(), "" | "." | "..") {
      return Err(eyre!("Invalid account id '{}'", id));
    }
    self.accounts.get_json(&["accounts", id], &[]).await
  }

  /// List recent transactions of an account
  pub async fn list_transactions(&self, account_id: &str, limit: usize) -> Result<Vec<Transaction>> {
    self
      .transactions
      .get_json(
        &["transactions"],
        &[
          ("account_id", account_id.to_string()),
          ("limit", limit.to_string()),
        ],
      )
      .await
  }

  /// Get the current macroeconomic indicators, optionally for one region
  pub async fn macro_indicators(&self, region: Option<&str>) -> Result<Vec<MacroIndicator>> {
    let query: Vec<(&str, String)> = region
      .map(|r| ("region", r.to_string()))
      .into_iter()
      .collect();

    let response: MacroIndicatorsResponse = self
      .capital_markets
      .get_json(&["macro-indicators"], &query)
      .await?;
    Ok(response.into())
  }

  /// Run the capital-markets agents on a set of symbols
  pub async fn analyze_market(&self, request: &MarketAnalysisRequest) -> Result<MarketAnalysis> {
    if request.symbols.is_empty() {
      return Err(eyre!("At least one symbol is required for analysis"));
    }
    self.capital_markets.post_json(&["analyze"], request).await
  }

  /// List a demo user's linked open-finance accounts
  pub async fn open_finance_accounts(&self, user: &str) -> Result<Vec<OpenFinanceAccount>> {
    let token = auth::bearer_token(user).ok_or_else(|| {
      eyre!(
        "Unknown open-finance user '{}'. Known users: {}",
        user,
        auth::demo_users().collect::<Vec<_>>().join(", ")
      )
    })?;

    self
      .open_finance
      .with_bearer(token)
      .get_json(&["accounts"], &[])
      .await
  }

  /// Ask the document chatbot a question
  pub async fn ask_chatbot(&self, question: &str) -> Result<ChatAnswer> {
    let question = question.trim();
    if question.is_empty() {
      return Err(eyre!("Question must not be empty"));
    }

    self
      .chatbot
      .post_json(
        &["chat"],
        &ChatRequest {
          question: question.to_string(),
        },
      )
      .await
  }
}

use color_eyre::{eyre::eyre, Result};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use url::Url;

use super::types::ApiErrorBody;

/// JSON client for one backend service.
#[derive(Clone)]
pub struct ServiceClient {
  name: &'static str,
  http: reqwest::Client,
  base: Url,
  bearer: Option<String>,
}

impl ServiceClient {
  /// Build on a shared reqwest client; timeouts are configured on `http`.
  pub fn with_http(name: &'static str, base_url: &str, http: reqwest::Client) -> Result<Self> {
    let base = parse_base_url(base_url)
      .map_err(|e| eyre!("Invalid {} base URL '{}': {}", name, base_url, e))?;

    Ok(Self {
      name,
      http,
      base,
      bearer: None,
    })
  }

  /// Copy of this client that authenticates with `token`.
  pub fn with_bearer(&self, token: impl Into<String>) -> Self {
    Self {
      bearer: Some(token.into()),
      ..self.clone()
    }
  }

  /// Endpoint URL under the base path; each segment is percent-encoded.
  pub fn url(&self, segments: &[&str]) -> Result<Url> {
    let mut url = self.base.clone();
    url
      .path_segments_mut()
      .map_err(|_| eyre!("{} base URL '{}' cannot have a path", self.name, self.base))?
      .pop_if_empty()
      .extend(segments);
    Ok(url)
  }

  /// GET an idempotent resource with query parameters.
  pub async fn get_json<T: DeserializeOwned>(
    &self,
    segments: &[&str],
    query: &[(&str, String)],
  ) -> Result<T> {
    let url = self.url(segments)?;
    let path = url.path().to_string();
    self.send(self.http.get(url).query(query), &path).await
  }

  /// POST an action or query with a JSON body.
  pub async fn post_json<B, T>(&self, segments: &[&str], body: &B) -> Result<T>
  where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
  {
    let url = self.url(segments)?;
    let path = url.path().to_string();
    self.send(self.http.post(url).json(body), &path).await
  }

  async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, path: &str) -> Result<T> {
    let request = match &self.bearer {
      Some(token) => request.bearer_auth(token),
      None => request,
    };

    let response = request
      .send()
      .await
      .map_err(|e| eyre!("Request to {} {} failed: {}", self.name, path, e))?;

    let response = self.check_status(response, path).await?;

    let body = response
      .bytes()
      .await
      .map_err(|e| eyre!("Failed to read {} response for {}: {}", self.name, path, e))?;

    serde_json::from_slice(&body)
      .map_err(|e| eyre!("Failed to parse {} response for {}: {}", self.name, path, e))
  }

  async fn check_status(&self, response: Response, path: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
      return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(eyre!(
      "{} {} returned {}: {}",
      self.name,
      path,
      status.as_u16(),
      failure_reason(status, &body)
    ))
  }
}

/// A base URL without a trailing slash would drop its last segment on join.
fn parse_base_url(base_url: &str) -> std::result::Result<Url, url::ParseError> {
  let mut base = Url::parse(base_url.trim())?;
  if !base.path().ends_with('/') {
    let path = format!("{}/", base.path());
    base.set_path(&path);
  }
  Ok(base)
}

/// Extract the error reason from a non-2xx body (`detail` or `error`).
pub fn failure_reason(status: StatusCode, body: &str) -> String {
  serde_json::from_str::<ApiErrorBody>(body)
    .ok()
    .and_then(|b| b.reason())
    .unwrap_or_else(|| {
      status
        .canonical_reason()
        .unwrap_or("unexpected status")
        .to_string()
    })
}

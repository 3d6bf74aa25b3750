use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::errors::ExchangeError;

/// Shared HTTP client for every adapter. `timeout` bounds a single request.
pub fn build_http_client(timeout: Duration) -> Result<Client, ExchangeError> {
    let http = Client::builder()
        .timeout(timeout)
        .pool_idle_timeout(Duration::from_secs(30))
        .tcp_keepalive(Duration::from_secs(30))
        // Coinbase rejects requests without a user agent.
        .user_agent(concat!("spreadwatch/", env!("CARGO_PKG_VERSION")))
        .build()?;

    Ok(http)
}

/// GET `url` and decode the body as JSON, mapping non-2xx answers to
/// [`ExchangeError::Status`].
pub async fn get_json(http: &Client, url: &str) -> Result<Value, ExchangeError> {
    let resp = http.get(url).send().await?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ExchangeError::Status {
            status: status.as_u16(),
            body,
        });
    }

    Ok(resp.json().await?)
}

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::config::Config;

/// Uniform timeout applied to every outbound call.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// The completion backend may legitimately take longer than the feeds.
const COMPLETION_TIMEOUT: Duration = Duration::from_secs(30);

/// System turn prefixed to every completion request.
const SYSTEM_PROMPT: &str = "You are TiffyAI, a powerful blockchain oracle and strategist.";

/// Any way an outbound API call can fail to yield a usable payload.
///
/// Handlers never need a secondary try path: timeout, bad status, undecodable
/// body and missing fields all arrive here.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(StatusCode),
    #[error("decode: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("missing field `{0}` in response")]
    MissingField(&'static str),
}

/// One holder-list entry as returned by the block explorer.
#[derive(Debug, Clone, Deserialize)]
pub struct Holder {
    #[serde(rename = "TokenHolderAddress")]
    pub address: String,
    /// Balance in token minor units (10^18 per whole token), as a decimal string.
    #[serde(rename = "TokenHolderQuantity")]
    pub quantity: String,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// Outbound API surface the command handlers depend on.
#[async_trait]
pub trait TokenApi: Send + Sync {
    /// Current token price in USD. Refetched on every call, no caching.
    async fn price(&self) -> Result<f64, FetchError>;

    /// Top holders in the explorer's own ordering.
    async fn top_holders(&self) -> Result<Vec<Holder>, FetchError>;

    /// Single-turn completion for the given user text.
    async fn complete(&self, text: &str) -> Result<String, FetchError>;
}

/// `TokenApi` over the real price feed, block explorer and AI backend.
pub struct HttpApi {
    client: reqwest::Client,
    price_api_url: String,
    explorer_api_url: String,
    explorer_api_key: String,
    token_contract: String,
    ai_backend_url: String,
}

impl HttpApi {
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            price_api_url: config.price_api_url.clone(),
            explorer_api_url: config.explorer_api_url.clone(),
            explorer_api_key: config.explorer_api_key.clone(),
            token_contract: config.token_contract.clone(),
            ai_backend_url: config.ai_backend_url.clone(),
        })
    }
}

fn check_status(response: reqwest::Response) -> Result<reqwest::Response, FetchError> {
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status));
    }
    Ok(response)
}

#[async_trait]
impl TokenApi for HttpApi {
    async fn price(&self) -> Result<f64, FetchError> {
        debug!("fetching price from {}", self.price_api_url);

        let response = check_status(self.client.get(&self.price_api_url).send().await?)?;
        let body: Value = response.json().await?;

        // Absent field is coerced to 0; a present but non-numeric value is
        // a malformed payload.
        match body.get("tiffyToUSD") {
            None => Ok(0.0),
            Some(value) => value
                .as_f64()
                .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
                .ok_or(FetchError::MissingField("tiffyToUSD")),
        }
    }

    async fn top_holders(&self) -> Result<Vec<Holder>, FetchError> {
        debug!("fetching holder list from {}", self.explorer_api_url);

        let response = self
            .client
            .get(&self.explorer_api_url)
            .query(&[
                ("module", "token"),
                ("action", "tokenholderlist"),
                ("contractaddress", self.token_contract.as_str()),
                ("page", "1"),
                ("offset", "5"),
                ("apikey", self.explorer_api_key.as_str()),
            ])
            .send()
            .await?;
        let body: Value = check_status(response)?.json().await?;

        // On errors the explorer puts a message string under "result", which
        // fails to decode as a holder list and lands in Decode.
        let result = body
            .get("result")
            .cloned()
            .ok_or(FetchError::MissingField("result"))?;
        Ok(serde_json::from_value(result)?)
    }

    async fn complete(&self, text: &str) -> Result<String, FetchError> {
        debug!("sending completion request to {}", self.ai_backend_url);

        let request = CompletionRequest {
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
        };

        let response = self
            .client
            .post(&self.ai_backend_url)
            .timeout(COMPLETION_TIMEOUT)
            .json(&request)
            .send()
            .await?;
        let body: CompletionResponse = check_status(response)?.json().await?;

        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(FetchError::MissingField("choices"))
    }
}

use anyhow::{Context, Result};
use reqwest::Url;

/// Default published price feed for the token.
const DEFAULT_PRICE_API_URL: &str = "https://tiffyai.github.io/TIFFY-Market-Value/price.json";

/// Default block-explorer API root for the holder list.
const DEFAULT_EXPLORER_API_URL: &str = "https://api.bscscan.com/api";

fn default_port() -> u16 {
    8000
}

/// Runtime configuration, read from the environment at startup.
///
/// Every required variable is validated up front so the service refuses to
/// start rather than failing at first use with an empty URL or token.
#[derive(Debug, Clone)]
pub struct Config {
    /// Telegram bot session token.
    pub bot_token: String,
    /// Externally reachable base URL of this deployment (webhook target).
    pub public_url: Url,
    /// Completion backend endpoint.
    pub ai_backend_url: String,
    /// Block-explorer API key for the holder list.
    pub explorer_api_key: String,
    /// Token contract address queried for holders.
    pub token_contract: String,
    /// Price feed endpoint.
    pub price_api_url: String,
    /// Block-explorer API root.
    pub explorer_api_url: String,
    /// HTTP listen port.
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from a variable lookup. Extracted so it can be
    /// unit-tested without touching the process environment.
    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |name: &str| -> Result<String> {
            var(name)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("missing required environment variable {name}"))
        };

        let public_url_raw = required("PUBLIC_URL")?;
        let public_url = Url::parse(&public_url_raw)
            .with_context(|| format!("PUBLIC_URL is not a valid URL: {public_url_raw}"))?;

        let port = match var("PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("PORT is not a valid port number: {raw}"))?,
            None => default_port(),
        };

        Ok(Self {
            bot_token: required("BOT_TOKEN")?,
            public_url,
            ai_backend_url: required("AI_BACKEND_URL")?,
            explorer_api_key: required("BSCSCAN_API_KEY")?,
            token_contract: required("TOKEN_CONTRACT")?,
            price_api_url: var("PRICE_API_URL")
                .unwrap_or_else(|| DEFAULT_PRICE_API_URL.to_string()),
            explorer_api_url: var("EXPLORER_API_URL")
                .unwrap_or_else(|| DEFAULT_EXPLORER_API_URL.to_string()),
            port,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn full_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("BOT_TOKEN", "123456:token"),
            ("PUBLIC_URL", "https://bot.example.com"),
            ("AI_BACKEND_URL", "https://ai.example.com/ask"),
            ("BSCSCAN_API_KEY", "apikey"),
            ("TOKEN_CONTRACT", "0xE488253DD6B4D31431142F1b7601C96f24Fb7dd5"),
        ])
    }

    fn load(env: &HashMap<&str, &str>) -> Result<Config> {
        Config::from_lookup(|name| env.get(name).map(|v| v.to_string()))
    }

    #[test]
    fn test_loads_with_all_required_vars() {
        let config = load(&full_env()).unwrap();
        assert_eq!(config.bot_token, "123456:token");
        assert_eq!(config.public_url.as_str(), "https://bot.example.com/");
        assert_eq!(config.port, 8000);
        assert_eq!(config.price_api_url, DEFAULT_PRICE_API_URL);
        assert_eq!(config.explorer_api_url, DEFAULT_EXPLORER_API_URL);
    }

    #[test]
    fn test_missing_bot_token_fails() {
        let mut env = full_env();
        env.remove("BOT_TOKEN");
        let err = load(&env).unwrap_err();
        assert!(err.to_string().contains("BOT_TOKEN"));
    }

    #[test]
    fn test_empty_required_var_fails() {
        let mut env = full_env();
        env.insert("BSCSCAN_API_KEY", "   ");
        let err = load(&env).unwrap_err();
        assert!(err.to_string().contains("BSCSCAN_API_KEY"));
    }

    #[test]
    fn test_invalid_public_url_fails() {
        let mut env = full_env();
        env.insert("PUBLIC_URL", "not a url");
        assert!(load(&env).is_err());
    }

    #[test]
    fn test_optional_overrides() {
        let mut env = full_env();
        env.insert("PORT", "9090");
        env.insert("PRICE_API_URL", "https://feed.example.com/price.json");
        let config = load(&env).unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.price_api_url, "https://feed.example.com/price.json");
    }

    #[test]
    fn test_invalid_port_fails() {
        let mut env = full_env();
        env.insert("PORT", "ninety");
        assert!(load(&env).is_err());
    }
}

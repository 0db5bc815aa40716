use std::sync::Arc;

use tracing::error;

use crate::api::TokenApi;
use crate::format;

/// Fixed apologies, one per fallible command.
pub const PRICE_UNAVAILABLE: &str = "⚠️ Couldn't fetch price.";
pub const LEADERBOARD_UNAVAILABLE: &str = "⚠️ Leaderboard unavailable.";
pub const AI_UNAVAILABLE: &str = "⚠️ AI backend error.";

/// Sent when /ai is invoked without a prompt.
pub const AI_USAGE_HINT: &str = "🤖 Ask something after /ai, like /ai What is TiffyAI?";

const PORTAL_LINK: &str = "https://t.me/TiffyAI_Bot?start=portal";

const WELCOME: &str = "🔵 Welcome to TiffyAI.\n\nYour Blue Key awaits.\n\n🎯 Every 10 minutes is a chance to claim, win, or unlock something powerful.\n\nUse /claim to begin.";

const WALLETS: &str = "💼 Choose your wallet:\n\n🔗 MetaMask: Paste link in Discover\n🔗 TrustWallet: Open with DApp browser\n🔗 OKX: Use DApp scanner";

const HELP: &str = "📖 Commands:\n\n/start — welcome\n/claim — enter the portal\n/wallet — supported wallets\n/trade — token stats & trade info\n/price — current $TIFFY price\n/leaderboard — top holders\n/ai <text> — ask the oracle\n/info — token info\n/help — this list";

/// Maps a command name plus argument text to exactly one reply.
///
/// The command set is fixed at startup; nothing is registered or removed at
/// runtime. Every fallible handler converts its failure into a fixed apology
/// here, so no error can escape into the update loop and stall the queue.
pub struct Router {
    api: Arc<dyn TokenApi>,
    token_contract: String,
}

impl Router {
    pub fn new(api: Arc<dyn TokenApi>, token_contract: String) -> Self {
        Self {
            api,
            token_contract,
        }
    }

    /// Returns the reply for a recognized command, or `None` for an unknown
    /// one (unknown commands are a deliberate silent no-op).
    pub async fn dispatch(&self, command: &str, args: &str) -> Option<String> {
        let reply = match command {
            "start" => WELCOME.to_string(),
            "claim" => format!("🚪 Tap to enter the portal:\n{PORTAL_LINK}"),
            "wallet" => WALLETS.to_string(),
            "trade" => format!(
                "📊 Token Stats & Trade Info:\n\n📍 Contract: {}\n\n📈 Trade: https://pancakeswap.finance/swap\n\n🔁 Slippage: ~2-5%\n\nUse /price to check current value.",
                self.token_contract
            ),
            "info" => format!(
                "ℹ️ TiffyAI ($TIFFY)\n\n📍 Contract: {}\n🚪 Portal: {PORTAL_LINK}\n\nUse /help for all commands.",
                self.token_contract
            ),
            "help" => HELP.to_string(),
            "price" => self.price().await,
            "leaderboard" => self.leaderboard().await,
            "ai" => self.ai(args).await,
            _ => return None,
        };
        Some(reply)
    }

    async fn price(&self) -> String {
        match self.api.price().await {
            Ok(price) => format::format_price(price),
            Err(e) => {
                error!("price fetch failed: {e}");
                PRICE_UNAVAILABLE.to_string()
            }
        }
    }

    async fn leaderboard(&self) -> String {
        match self.api.top_holders().await {
            Ok(holders) => format::format_holders(&holders),
            Err(e) => {
                error!("leaderboard fetch failed: {e}");
                LEADERBOARD_UNAVAILABLE.to_string()
            }
        }
    }

    async fn ai(&self, args: &str) -> String {
        let prompt = args.trim();
        if prompt.is_empty() {
            return AI_USAGE_HINT.to_string();
        }
        match self.api.complete(prompt).await {
            Ok(text) => format::format_completion(&text),
            Err(e) => {
                error!("ai completion failed: {e}");
                AI_UNAVAILABLE.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{FetchError, Holder};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts calls and answers from canned results.
    #[derive(Default)]
    struct StubApi {
        calls: AtomicUsize,
        fail: bool,
    }

    impl StubApi {
        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: true,
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl crate::api::TokenApi for StubApi {
        async fn price(&self) -> Result<f64, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(FetchError::MissingField("tiffyToUSD"));
            }
            Ok(0.1234)
        }

        async fn top_holders(&self) -> Result<Vec<Holder>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(FetchError::MissingField("result"));
            }
            Ok(vec![Holder {
                address: "0x1234567890abcdef".to_string(),
                quantity: "2000000000000000000".to_string(),
            }])
        }

        async fn complete(&self, text: &str) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(FetchError::MissingField("choices"));
            }
            Ok(format!("echo: {text}"))
        }
    }

    fn router(api: Arc<StubApi>) -> Router {
        Router::new(api, "0xE488253DD6B4D31431142F1b7601C96f24Fb7dd5".to_string())
    }

    #[tokio::test]
    async fn test_unknown_command_is_silent() {
        let api = Arc::new(StubApi::default());
        let reply = router(api.clone()).dispatch("bogus", "").await;
        assert!(reply.is_none());
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn test_ai_without_args_hints_and_calls_nothing() {
        let api = Arc::new(StubApi::default());
        let reply = router(api.clone()).dispatch("ai", "   ").await;
        assert_eq!(reply.as_deref(), Some(AI_USAGE_HINT));
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn test_ai_failure_yields_fixed_apology() {
        let api = Arc::new(StubApi::failing());
        let reply = router(api.clone()).dispatch("ai", "What is X?").await;
        assert_eq!(reply.as_deref(), Some(AI_UNAVAILABLE));
        assert_eq!(api.call_count(), 1);
    }

    #[tokio::test]
    async fn test_ai_success_passes_model_text_through() {
        let api = Arc::new(StubApi::default());
        let reply = router(api).dispatch("ai", "What is X?").await;
        assert_eq!(reply.as_deref(), Some("echo: What is X?"));
    }

    #[tokio::test]
    async fn test_price_failure_yields_fixed_apology() {
        let api = Arc::new(StubApi::failing());
        let reply = router(api).dispatch("price", "").await;
        assert_eq!(reply.as_deref(), Some(PRICE_UNAVAILABLE));
    }

    #[tokio::test]
    async fn test_price_success_embeds_formatted_quote() {
        let api = Arc::new(StubApi::default());
        let reply = router(api).dispatch("price", "").await.unwrap();
        assert!(reply.contains("$0.1234"));
    }

    #[tokio::test]
    async fn test_leaderboard_failure_yields_fixed_apology() {
        let api = Arc::new(StubApi::failing());
        let reply = router(api).dispatch("leaderboard", "").await;
        assert_eq!(reply.as_deref(), Some(LEADERBOARD_UNAVAILABLE));
    }

    #[tokio::test]
    async fn test_leaderboard_success_embeds_holder_lines() {
        let api = Arc::new(StubApi::default());
        let reply = router(api).dispatch("leaderboard", "").await.unwrap();
        assert!(reply.contains("0x1234...cdef"));
        assert!(reply.contains("2.00 $TIFFY"));
    }

    #[tokio::test]
    async fn test_static_commands_reply_without_api_calls() {
        let api = Arc::new(StubApi::default());
        let r = router(api.clone());
        for cmd in ["start", "claim", "wallet", "trade", "info", "help"] {
            assert!(r.dispatch(cmd, "").await.is_some(), "no reply for /{cmd}");
        }
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn test_command_names_are_case_sensitive() {
        let api = Arc::new(StubApi::default());
        assert!(router(api).dispatch("Price", "").await.is_none());
    }
}

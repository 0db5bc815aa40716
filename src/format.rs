//! Pure reply formatting. No I/O here; everything is deterministic and
//! total, so a bad payload upstream can never turn into a panic downstream.

use crate::api::Holder;

/// Header line above the holder list.
const HOLDERS_HEADER: &str = "🏆 Top $TIFFY Holders:";

/// At most this many holder lines are rendered, whatever the feed returned.
const MAX_HOLDER_LINES: usize = 5;

/// Minor units per whole token.
const UNITS_PER_TOKEN: f64 = 1e18;

/// Renders the price quote to 4 decimal places.
pub fn format_price(price: f64) -> String {
    format!("💎 Current $TIFFY: ${price:.4}")
}

/// Renders up to five holder entries below a fixed header, one line per
/// entry, in the order the explorer returned them. An empty list still
/// produces the header.
pub fn format_holders(holders: &[Holder]) -> String {
    let mut out = String::from(HOLDERS_HEADER);
    for holder in holders.iter().take(MAX_HOLDER_LINES) {
        let balance = holder.quantity.parse::<f64>().unwrap_or(0.0) / UNITS_PER_TOKEN;
        let address = elide_address(&holder.address);
        out.push_str(&format!("\n{address} — {balance:.2} $TIFFY"));
    }
    out
}

/// Completion text is passed through untouched; the model owns its wording.
pub fn format_completion(text: &str) -> String {
    text.to_string()
}

/// Shortens an address to `first6...last4`. Addresses too short to elide
/// (or with awkward char boundaries) come back unmodified rather than
/// panicking on a slice.
fn elide_address(address: &str) -> String {
    let len = address.len();
    if len <= 10 || !address.is_char_boundary(6) || !address.is_char_boundary(len - 4) {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[len - 4..])
}

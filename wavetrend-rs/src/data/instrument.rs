//! Instrument name normalization

/// Normalize pair format to "BASE/QUOTE" (e.g., "BTCUSDT" -> "BTC/USDT", "inj_usdt" -> "INJ/USDT")
pub fn normalize_pair(pair: &str) -> Option<(String, String)> {
    let pair_upper = pair.trim().to_uppercase();

    for separator in ['/', '_', '-'] {
        if pair_upper.contains(separator) {
            let parts: Vec<&str> = pair_upper.split(separator).collect();
            if parts.len() == 2 && !parts[0].is_empty() && !parts[1].is_empty() {
                return Some((parts[0].to_string(), parts[1].to_string()));
            }
            return None;
        }
    }

    // Try to detect common quote currencies at the end
    let common_quotes = ["USDT", "USDC", "BUSD", "BTC", "ETH", "BNB", "EUR", "USD"];

    for quote in common_quotes {
        if pair_upper.ends_with(quote) && pair_upper.len() > quote.len() {
            let base = &pair_upper[..pair_upper.len() - quote.len()];
            return Some((base.to_string(), quote.to_string()));
        }
    }

    None
}

/// Canonical instrument name, "BASE/QUOTE"
pub fn instrument_name(base: &str, quote: &str) -> String {
    format!("{}/{}", base.to_uppercase(), quote.to_uppercase())
}

/// Normalize any accepted spelling straight to "BASE/QUOTE"
pub fn canonical_instrument(pair: &str) -> Option<String> {
    normalize_pair(pair).map(|(base, quote)| instrument_name(&base, &quote))
}

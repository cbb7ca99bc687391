/// Suffix KuCoin appends to USDT-margined perpetual contracts.
pub const FUTURES_SUFFIX: &str = "USDTM";

/// Expand a base ticker into the futures instrument name.
///
/// `ETH` becomes `ETHUSDTM`; `ETHUSDTM` is returned unchanged.
pub fn instrument_symbol(symbol: &str) -> String {
    let upper = symbol.trim().to_uppercase();
    if upper.ends_with(FUTURES_SUFFIX) {
        upper
    } else {
        format!("{upper}{FUTURES_SUFFIX}")
    }
}

/// Strip the futures suffix, leaving the base ticker used in alerts and the log.
pub fn base_symbol(symbol: &str) -> String {
    let upper = symbol.trim().to_uppercase();
    upper
        .strip_suffix(FUTURES_SUFFIX)
        .map(str::to_string)
        .unwrap_or(upper)
}

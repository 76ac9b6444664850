// src/edgar/tickers.rs
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Companies served out of the box, ticker -> zero-padded 10-digit CIK.
const BUILTIN_CIKS: &[(&str, &str)] = &[
    ("NVDA", "0001045810"),
    ("AAPL", "0000320193"),
    ("MSFT", "0000789019"),
    ("GOOGL", "0001652044"),
    ("GOOG", "0001652044"),
    ("AMZN", "0001018724"),
    ("TSLA", "0001318605"),
    ("META", "0001326801"),
];

pub static DEFAULT_TICKERS: Lazy<TickerTable> =
    Lazy::new(|| TickerTable::from_pairs(BUILTIN_CIKS.iter().copied()));

/// Static ticker -> CIK lookup. No network access, no fuzzy matching.
#[derive(Debug, Clone, Default)]
pub struct TickerTable {
    ciks: HashMap<String, String>,
}

impl TickerTable {
    pub fn from_pairs<T, C>(pairs: impl IntoIterator<Item = (T, C)>) -> Self
    where
        T: AsRef<str>,
        C: Into<String>,
    {
        let ciks = pairs
            .into_iter()
            .map(|(ticker, cik)| (ticker.as_ref().trim().to_uppercase(), cik.into()))
            .collect();
        Self { ciks }
    }

    /// Gets the CIK (Central Index Key) for a ticker symbol, ignoring case.
    pub fn resolve(&self, ticker: &str) -> Option<&str> {
        self.ciks
            .get(&ticker.trim().to_uppercase())
            .map(String::as_str)
    }

    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.ciks.keys().map(String::as_str)
    }
}

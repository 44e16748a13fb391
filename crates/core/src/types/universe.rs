use serde::{Deserialize, Serialize};

/// A selectable instrument as listed by the universe endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instrument {
    pub ticker: String,
}

impl Instrument {
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
        }
    }
}

/// Ticker strings of a universe, in listing order.
pub fn tickers(universe: &[Instrument]) -> Vec<String> {
    universe.iter().map(|i| i.ticker.clone()).collect()
}

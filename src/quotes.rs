use crate::errors::{PricingError, PricingResult};
use std::collections::HashMap;

/// Supplies the current underlying price for a ticker.
///
/// Injected into the service so pricing never performs I/O itself and
/// tests can substitute a fixed table.
pub trait SpotSource: Send + Sync {
    fn spot(&self, ticker: &str) -> PricingResult<f64>;
}

/// Any `Fn(&str) -> PricingResult<f64>` closure is a spot source.
impl<F> SpotSource for F
where
    F: Fn(&str) -> PricingResult<f64> + Send + Sync,
{
    fn spot(&self, ticker: &str) -> PricingResult<f64> {
        self(ticker)
    }
}

/// Static ticker -> last close table.
#[derive(Debug, Clone, Default)]
pub struct SpotTable {
    prices: HashMap<String, f64>,
}

impl SpotTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, ticker: &str, price: f64) -> Self {
        self.prices.insert(ticker.to_ascii_uppercase(), price);
        self
    }

    /// Parses `AAPL=189.5,MSFT=402.1`. Blank input yields an empty table.
    pub fn parse(raw: &str) -> PricingResult<Self> {
        let mut table = Self::new();
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (ticker, price) = entry
                .split_once('=')
                .ok_or_else(|| PricingError::Config(format!("spot table entry without '=': {entry}")))?;
            let ticker = ticker.trim();
            if ticker.is_empty() {
                return Err(PricingError::Config(format!("spot table entry without ticker: {entry}")));
            }
            let price: f64 = price
                .trim()
                .parse()
                .map_err(|_| PricingError::Config(format!("invalid price for {ticker}: {price}")))?;
            if price <= 0.0 || !price.is_finite() {
                return Err(PricingError::Config(format!("invalid price for {ticker}: {price}")));
            }
            table = table.with_price(ticker, price);
        }
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl SpotSource for SpotTable {
    fn spot(&self, ticker: &str) -> PricingResult<f64> {
        self.prices
            .get(&ticker.trim().to_ascii_uppercase())
            .copied()
            .ok_or_else(|| PricingError::Quote(format!("unknown ticker: {ticker}")))
    }
}

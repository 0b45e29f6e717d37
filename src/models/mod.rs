pub mod black_scholes;

use crate::errors::{PricingError, PricingResult};

/// All pricing models implement this trait.
/// price() must be a pure function: deterministic output from inputs only.
/// Send + Sync required so a single pricer can be shared by grid workers.
pub trait OptionPricer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Theoretical call and put values for one contract.
    fn price(&self, params: &ContractParams) -> PricingResult<OptionValues>;

    /// Model value minus market price, for both legs.
    ///
    /// A positive number means the model values the option above the quote.
    fn pnl(&self, params: &ContractParams, quote: &MarketQuote) -> PricingResult<OptionPnl> {
        quote.validate()?;
        let values = self.price(params)?;
        Ok(OptionPnl {
            call: values.call - quote.call,
            put: values.put - quote.put,
        })
    }
}

/// Market and contract inputs for a single valuation. Stack-allocated, Copy.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ContractParams {
    pub spot: f64,
    /// Annualized standard deviation of log-returns
    pub volatility: f64,
    /// Annualized risk-free rate, may be negative
    pub rate: f64,
    pub strike: f64,
    /// In years
    pub time_to_maturity: f64,
}

impl ContractParams {
    /// Rejects inputs that make the model undefined.
    ///
    /// Zero volatility passes here: it is well-formed on its own and is
    /// reported by the pricer as a degenerate combination instead.
    pub fn validate(&self) -> PricingResult<()> {
        positive("spot", self.spot)?;
        if !self.volatility.is_finite() || self.volatility < 0.0 {
            return Err(PricingError::InvalidParameter {
                name: "volatility",
                value: self.volatility,
            });
        }
        self.validate_fixed()
    }

    /// Checks only the fields a grid holds constant (strike, maturity, rate).
    pub fn validate_fixed(&self) -> PricingResult<()> {
        positive("strike", self.strike)?;
        positive("time_to_maturity", self.time_to_maturity)?;
        if !self.rate.is_finite() {
            return Err(PricingError::InvalidParameter {
                name: "rate",
                value: self.rate,
            });
        }
        Ok(())
    }

    /// Same contract with a different spot and volatility (one grid cell).
    #[inline]
    pub fn with_spot_vol(&self, spot: f64, volatility: f64) -> Self {
        Self {
            spot,
            volatility,
            ..*self
        }
    }

    /// Present value of the strike, X * e^(-R*T).
    #[inline]
    pub fn discounted_strike(&self) -> f64 {
        self.strike * (-self.rate * self.time_to_maturity).exp()
    }
}

fn positive(name: &'static str, value: f64) -> PricingResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(PricingError::InvalidParameter { name, value })
    }
}

/// Theoretical option values.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct OptionValues {
    pub call: f64,
    pub put: f64,
}

/// Observed market prices for the call and put on the same contract.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MarketQuote {
    pub call: f64,
    pub put: f64,
}

impl MarketQuote {
    pub fn validate(&self) -> PricingResult<()> {
        if !self.call.is_finite() {
            return Err(PricingError::InvalidParameter {
                name: "market_call",
                value: self.call,
            });
        }
        if !self.put.is_finite() {
            return Err(PricingError::InvalidParameter {
                name: "market_put",
                value: self.put,
            });
        }
        Ok(())
    }
}

/// Model value minus market quote.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct OptionPnl {
    pub call: f64,
    pub put: f64,
}

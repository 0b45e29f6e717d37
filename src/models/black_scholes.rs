use crate::errors::{PricingError, PricingResult};
use crate::models::{ContractParams, OptionPricer, OptionValues};
use statrs::distribution::{ContinuousCDF, Normal};

/// Black-Scholes European option pricing.
///
/// d1 = (ln(S/X) + (R + V^2/2)*T) / (V * sqrt(T))
/// d2 = d1 - V * sqrt(T)
///
/// call = S*Phi(d1) - X*e^(-R*T)*Phi(d2)
/// put  = X*e^(-R*T)*Phi(-d2) - S*Phi(-d1)
///
/// Phi is statrs' erfc-based normal CDF, accurate to double precision.
#[derive(Debug, Clone)]
pub struct BlackScholes {
    /// Standard normal distribution (created once, reused)
    normal: Normal,
}

impl BlackScholes {
    pub fn new() -> Self {
        Self {
            normal: Normal::standard(),
        }
    }

    #[inline]
    fn phi(&self, x: f64) -> f64 {
        self.normal.cdf(x)
    }
}

impl Default for BlackScholes {
    fn default() -> Self {
        Self::new()
    }
}

/// Precomputed intermediate terms for one valuation. Stack-allocated.
#[derive(Debug, Clone, Copy)]
struct Terms {
    d1: f64,
    d2: f64,
    discounted_strike: f64,
}

impl Terms {
    fn new(params: &ContractParams) -> PricingResult<Self> {
        let sigma_sqrt_t = params.volatility * params.time_to_maturity.sqrt();
        if sigma_sqrt_t == 0.0 {
            return Err(PricingError::Degenerate(format!(
                "volatility * sqrt(T) is zero (volatility={}, T={})",
                params.volatility, params.time_to_maturity
            )));
        }

        let ln_s_x = (params.spot / params.strike).ln();
        let drift = (params.rate + 0.5 * params.volatility * params.volatility)
            * params.time_to_maturity;
        let d1 = (ln_s_x + drift) / sigma_sqrt_t;
        let d2 = d1 - sigma_sqrt_t;

        if !d1.is_finite() || !d2.is_finite() {
            return Err(PricingError::Degenerate(format!(
                "non-finite normal argument (d1={d1}, d2={d2})"
            )));
        }

        let discounted_strike = params.discounted_strike();
        if !discounted_strike.is_finite() {
            return Err(PricingError::Degenerate(format!(
                "discounted strike overflows (R*T={})",
                params.rate * params.time_to_maturity
            )));
        }

        Ok(Self {
            d1,
            d2,
            discounted_strike,
        })
    }
}

impl OptionPricer for BlackScholes {
    #[inline]
    fn name(&self) -> &'static str {
        "Black-Scholes"
    }

    fn price(&self, params: &ContractParams) -> PricingResult<OptionValues> {
        params.validate()?;
        let terms = Terms::new(params)?;
        let s = params.spot;
        let k = terms.discounted_strike;

        let call = s * self.phi(terms.d1) - k * self.phi(terms.d2);
        let put = k * self.phi(-terms.d2) - s * self.phi(-terms.d1);

        if !call.is_finite() || !put.is_finite() {
            return Err(PricingError::Degenerate(format!(
                "non-finite option value (call={call}, put={put})"
            )));
        }

        // Cancellation can leave a value a few ulps below zero deep out of the money
        Ok(OptionValues {
            call: call.max(0.0),
            put: put.max(0.0),
        })
    }
}

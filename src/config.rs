use crate::errors::{PricingError, PricingResult};
use crate::models::{ContractParams, MarketQuote};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_port: u16,
    /// Samples per heatmap axis
    pub grid_points: usize,
    /// Default spot axis spans spot * (1 - band) .. spot * (1 + band)
    pub spot_band: f64,
    /// Default vol axis spans vol * (1 - band) .. vol * (1 + band)
    pub vol_band: f64,
    /// Grids smaller than this are swept on the calling thread
    pub parallel_min_cells: usize,
    pub default_contract: ContractParams,
    pub default_quote: MarketQuote,
    /// Raw `TICKER=price,...` table for the static spot source
    pub spot_table: String,
}

impl AppConfig {
    pub fn from_env() -> PricingResult<Self> {
        dotenvy::dotenv().ok();

        let server_port = env_var_or("SERVER_PORT", "3001")
            .parse::<u16>()
            .map_err(|e| PricingError::Config(format!("SERVER_PORT: {e}")))?;

        let grid_points = env_var_or("GRID_POINTS", "10")
            .parse::<usize>()
            .map_err(|e| PricingError::Config(format!("GRID_POINTS: {e}")))?;
        if grid_points == 0 {
            return Err(PricingError::Config("GRID_POINTS must be at least 1".into()));
        }

        let spot_band = parse_f64("SPOT_BAND", "0.2")?;
        let vol_band = parse_f64("VOL_BAND", "0.5")?;
        for (key, band) in [("SPOT_BAND", spot_band), ("VOL_BAND", vol_band)] {
            if !(0.0..1.0).contains(&band) {
                return Err(PricingError::Config(format!("{key} must be in [0, 1): {band}")));
            }
        }

        let parallel_min_cells = env_var_or("PARALLEL_MIN_CELLS", "64")
            .parse::<usize>()
            .map_err(|e| PricingError::Config(format!("PARALLEL_MIN_CELLS: {e}")))?;

        let default_contract = ContractParams {
            spot: parse_f64("DEFAULT_SPOT", "100.0")?,
            volatility: parse_f64("DEFAULT_VOL", "0.2")?,
            rate: parse_f64("DEFAULT_RATE", "0.2")?,
            strike: parse_f64("DEFAULT_STRIKE", "200.0")?,
            time_to_maturity: parse_f64("DEFAULT_TTM", "1.0")?,
        };
        default_contract
            .validate()
            .map_err(|e| PricingError::Config(format!("default contract: {e}")))?;

        let default_quote = MarketQuote {
            call: parse_f64("DEFAULT_MARKET_CALL", "100.0")?,
            put: parse_f64("DEFAULT_MARKET_PUT", "100.0")?,
        };

        Ok(Self {
            server_port,
            grid_points,
            spot_band,
            vol_band,
            parallel_min_cells,
            default_contract,
            default_quote,
            spot_table: env_var_or("SPOT_TABLE", ""),
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_port: 3001,
            grid_points: 10,
            spot_band: 0.2,
            vol_band: 0.5,
            parallel_min_cells: 64,
            default_contract: ContractParams {
                spot: 100.0,
                volatility: 0.2,
                rate: 0.2,
                strike: 200.0,
                time_to_maturity: 1.0,
            },
            default_quote: MarketQuote { call: 100.0, put: 100.0 },
            spot_table: String::new(),
        }
    }
}

fn parse_f64(key: &str, default: &str) -> PricingResult<f64> {
    let value = env_var_or(key, default)
        .parse::<f64>()
        .map_err(|e| PricingError::Config(format!("{key}: {e}")))?;
    if !value.is_finite() {
        return Err(PricingError::Config(format!("{key}: not finite")));
    }
    Ok(value)
}

fn env_var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

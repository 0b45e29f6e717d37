use crate::config::AppConfig;
use crate::errors::PricingResult;
use crate::grid::GridEvaluator;
use crate::models::black_scholes::BlackScholes;
use crate::quotes::{SpotSource, SpotTable};
use portable_atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// ── Performance Counters (lock-free) ──

pub struct PerfCounters {
    pub prices_computed: AtomicU64,
    pub grids_evaluated: AtomicU64,
    pub cells_evaluated: AtomicU64,
    pub requests_rejected: AtomicU64,
}

impl PerfCounters {
    pub fn new() -> Self {
        Self {
            prices_computed: AtomicU64::new(0),
            grids_evaluated: AtomicU64::new(0),
            cells_evaluated: AtomicU64::new(0),
            requests_rejected: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_grid(&self, cells: usize) {
        self.grids_evaluated.fetch_add(1, Ordering::Relaxed);
        self.cells_evaluated.fetch_add(cells as u64, Ordering::Relaxed);
    }
}

impl Default for PerfCounters {
    fn default() -> Self {
        Self::new()
    }
}

// ── Application shared state (immutable after startup, no locks) ──

pub struct AppState {
    pub config: AppConfig,
    pub evaluator: GridEvaluator<BlackScholes>,
    pub spots: Arc<dyn SpotSource>,
    pub counters: PerfCounters,
}

impl AppState {
    pub fn new(config: AppConfig, spots: Arc<dyn SpotSource>) -> Arc<Self> {
        let evaluator =
            GridEvaluator::new(BlackScholes::new()).with_parallel_min_cells(config.parallel_min_cells);

        Arc::new(Self {
            config,
            evaluator,
            spots,
            counters: PerfCounters::new(),
        })
    }

    /// State backed by the static spot table named in the config.
    pub fn from_config(config: AppConfig) -> PricingResult<Arc<Self>> {
        let table = SpotTable::parse(&config.spot_table)?;
        tracing::info!(tickers = table.len(), "spot table loaded");
        Ok(Self::new(config, Arc::new(table)))
    }
}

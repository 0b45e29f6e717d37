pub mod axis;

use crate::errors::{PricingError, PricingResult};
use crate::models::{ContractParams, MarketQuote, OptionPricer};
use rayon::prelude::*;
use std::time::Instant;

pub use axis::SampleAxis;

/// Grids with fewer cells than this are swept on the calling thread.
pub const DEFAULT_PARALLEL_MIN_CELLS: usize = 64;

/// Dense row-major matrix. Row = volatility sample, column = spot sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Grid {
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Value at [vol_index][spot_index].
    #[inline]
    pub fn get(&self, vol_index: usize, spot_index: usize) -> Option<f64> {
        if vol_index < self.rows && spot_index < self.cols {
            Some(self.data[vol_index * self.cols + spot_index])
        } else {
            None
        }
    }

    pub fn row(&self, vol_index: usize) -> Option<&[f64]> {
        if vol_index < self.rows {
            let start = vol_index * self.cols;
            Some(&self.data[start..start + self.cols])
        } else {
            None
        }
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks(self.cols.max(1))
    }
}

impl std::ops::Index<(usize, usize)> for Grid {
    type Output = f64;

    fn index(&self, (vol_index, spot_index): (usize, usize)) -> &f64 {
        assert!(spot_index < self.cols, "spot index {spot_index} out of range");
        &self.data[vol_index * self.cols + spot_index]
    }
}

/// Serialized as nested rows so JSON consumers see `[[..], [..]]`.
impl serde::Serialize for Grid {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter_rows())
    }
}

/// Call and put value matrices plus the axes they were evaluated on.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ValueGrid {
    pub vol_axis: SampleAxis,
    pub spot_axis: SampleAxis,
    pub call: Grid,
    pub put: Grid,
}

/// Call and put P&L matrices (model value minus `quote`) plus their axes.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PnlGrid {
    pub vol_axis: SampleAxis,
    pub spot_axis: SampleAxis,
    pub quote: MarketQuote,
    pub call_pnl: Grid,
    pub put_pnl: Grid,
}

/// Sweeps a pricer over vol_axis x spot_axis.
///
/// Every cell is an independent pure evaluation. Rows are computed in
/// parallel on the rayon pool and merged back in index order, so the
/// output never depends on scheduling. Any failing cell aborts the
/// whole sweep; the lowest failing (vol_index, spot_index) is reported.
#[derive(Debug, Clone)]
pub struct GridEvaluator<P: OptionPricer> {
    pricer: P,
    parallel_min_cells: usize,
}

impl<P: OptionPricer> GridEvaluator<P> {
    pub fn new(pricer: P) -> Self {
        Self {
            pricer,
            parallel_min_cells: DEFAULT_PARALLEL_MIN_CELLS,
        }
    }

    pub fn with_parallel_min_cells(mut self, cells: usize) -> Self {
        self.parallel_min_cells = cells;
        self
    }

    #[inline]
    pub fn pricer(&self) -> &P {
        &self.pricer
    }

    /// Call/put values at every (vol, spot) pair, indexed [vol_index][spot_index].
    pub fn evaluate_grid(
        &self,
        rate: f64,
        time_to_maturity: f64,
        strike: f64,
        vol_axis: &SampleAxis,
        spot_axis: &SampleAxis,
    ) -> PricingResult<ValueGrid> {
        let base = fixed_contract(rate, time_to_maturity, strike, vol_axis, spot_axis)?;

        let (call, put) = self.sweep(vol_axis, spot_axis, |spot, vol| {
            let values = self.pricer.price(&base.with_spot_vol(spot, vol))?;
            Ok((values.call, values.put))
        })?;

        Ok(ValueGrid {
            vol_axis: vol_axis.clone(),
            spot_axis: spot_axis.clone(),
            call,
            put,
        })
    }

    /// Model value minus the fixed `quote` at every (vol, spot) pair.
    pub fn evaluate_pnl_grid(
        &self,
        rate: f64,
        time_to_maturity: f64,
        strike: f64,
        vol_axis: &SampleAxis,
        spot_axis: &SampleAxis,
        quote: MarketQuote,
    ) -> PricingResult<PnlGrid> {
        let base = fixed_contract(rate, time_to_maturity, strike, vol_axis, spot_axis)?;
        quote.validate()?;

        let (call_pnl, put_pnl) = self.sweep(vol_axis, spot_axis, |spot, vol| {
            let pnl = self.pricer.pnl(&base.with_spot_vol(spot, vol), &quote)?;
            Ok((pnl.call, pnl.put))
        })?;

        Ok(PnlGrid {
            vol_axis: vol_axis.clone(),
            spot_axis: spot_axis.clone(),
            quote,
            call_pnl,
            put_pnl,
        })
    }

    /// Shared iteration skeleton. `cell(spot, vol)` yields the (call, put) pair.
    fn sweep<F>(&self, vol_axis: &SampleAxis, spot_axis: &SampleAxis, cell: F) -> PricingResult<(Grid, Grid)>
    where
        F: Fn(f64, f64) -> PricingResult<(f64, f64)> + Sync,
    {
        let started = Instant::now();
        let rows = vol_axis.len();
        let cols = spot_axis.len();

        let compute_row = |(vol_index, &vol): (usize, &f64)| -> PricingResult<Vec<(f64, f64)>> {
            spot_axis
                .values()
                .iter()
                .enumerate()
                .map(|(spot_index, &spot)| {
                    cell(spot, vol).map_err(|e| PricingError::GridCell {
                        vol_index,
                        spot_index,
                        source: Box::new(e),
                    })
                })
                .collect()
        };

        // Collected in row order before short-circuiting: the lowest failing row wins.
        let row_results: Vec<PricingResult<Vec<(f64, f64)>>> = if rows * cols < self.parallel_min_cells {
            vol_axis.values().iter().enumerate().map(&compute_row).collect()
        } else {
            vol_axis.values().par_iter().enumerate().map(&compute_row).collect()
        };

        let mut call = Vec::with_capacity(rows * cols);
        let mut put = Vec::with_capacity(rows * cols);
        for row in row_results {
            let row = row.map_err(|e| {
                tracing::warn!(error = %e, rows, cols, "grid sweep aborted");
                e
            })?;
            for (c, p) in row {
                call.push(c);
                put.push(p);
            }
        }

        tracing::debug!(
            rows,
            cols,
            elapsed_us = started.elapsed().as_micros() as u64,
            "grid sweep complete"
        );

        Ok((
            Grid { rows, cols, data: call },
            Grid { rows, cols, data: put },
        ))
    }
}

/// Contract template for a sweep; rejects bad fixed inputs before any cell runs.
fn fixed_contract(
    rate: f64,
    time_to_maturity: f64,
    strike: f64,
    vol_axis: &SampleAxis,
    spot_axis: &SampleAxis,
) -> PricingResult<ContractParams> {
    let base = ContractParams {
        spot: spot_axis.first(),
        volatility: vol_axis.first(),
        rate,
        strike,
        time_to_maturity,
    };
    base.validate_fixed()?;
    Ok(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::black_scholes::BlackScholes;

    const RATE: f64 = 0.05;
    const TTM: f64 = 1.0;
    const STRIKE: f64 = 100.0;

    fn axes() -> (SampleAxis, SampleAxis) {
        let vols = SampleAxis::linspace(0.1, 0.5, 10).unwrap();
        let spots = SampleAxis::linspace(80.0, 120.0, 5).unwrap();
        (vols, spots)
    }

    fn base() -> ContractParams {
        ContractParams {
            spot: 100.0,
            volatility: 0.2,
            rate: RATE,
            strike: STRIKE,
            time_to_maturity: TTM,
        }
    }

    #[test]
    fn test_grid_shape_and_exact_cells() {
        let evaluator = GridEvaluator::new(BlackScholes::new());
        let (vols, spots) = axes();
        let grid = evaluator.evaluate_grid(RATE, TTM, STRIKE, &vols, &spots).unwrap();

        assert_eq!((grid.call.rows(), grid.call.cols()), (10, 5));
        assert_eq!((grid.put.rows(), grid.put.cols()), (10, 5));

        let model = BlackScholes::new();
        for (j, &vol) in vols.values().iter().enumerate() {
            for (i, &spot) in spots.values().iter().enumerate() {
                let expected = model.price(&base().with_spot_vol(spot, vol)).unwrap();
                assert_eq!(grid.call[(j, i)], expected.call, "call at [{j}][{i}]");
                assert_eq!(grid.put[(j, i)], expected.put, "put at [{j}][{i}]");
            }
        }
    }

    #[test]
    fn test_rows_follow_vol_and_columns_follow_spot() {
        let evaluator = GridEvaluator::new(BlackScholes::new());
        let vols = SampleAxis::new(vec![0.1, 0.6]).unwrap();
        let spots = SampleAxis::new(vec![90.0, 100.0, 110.0]).unwrap();
        let grid = evaluator.evaluate_grid(RATE, TTM, STRIKE, &vols, &spots).unwrap();

        assert_eq!(grid.call.rows(), 2);
        assert_eq!(grid.call.cols(), 3);
        // Call rises left to right (spot) and top to bottom (vol)
        let first = grid.call.row(0).unwrap();
        assert!(first[0] < first[1] && first[1] < first[2]);
        assert!(grid.call[(1, 0)] > grid.call[(0, 0)]);
    }

    #[test]
    fn test_axes_are_passed_through() {
        let evaluator = GridEvaluator::new(BlackScholes::new());
        let (vols, spots) = axes();
        let grid = evaluator.evaluate_grid(RATE, TTM, STRIKE, &vols, &spots).unwrap();
        assert_eq!(grid.vol_axis, vols);
        assert_eq!(grid.spot_axis, spots);
    }

    #[test]
    fn test_pnl_identity_per_cell() {
        let evaluator = GridEvaluator::new(BlackScholes::new());
        let (vols, spots) = axes();
        let quote = MarketQuote { call: 10.0, put: 5.5 };

        let values = evaluator.evaluate_grid(RATE, TTM, STRIKE, &vols, &spots).unwrap();
        let pnl = evaluator
            .evaluate_pnl_grid(RATE, TTM, STRIKE, &vols, &spots, quote)
            .unwrap();

        assert_eq!(pnl.quote, quote);
        for j in 0..vols.len() {
            for i in 0..spots.len() {
                assert_eq!(pnl.call_pnl[(j, i)], values.call[(j, i)] - quote.call);
                assert_eq!(pnl.put_pnl[(j, i)], values.put[(j, i)] - quote.put);
            }
        }
    }

    #[test]
    fn test_parallel_and_sequential_agree() {
        let vols = SampleAxis::linspace(0.05, 0.9, 40).unwrap();
        let spots = SampleAxis::linspace(50.0, 150.0, 40).unwrap();

        let sequential = GridEvaluator::new(BlackScholes::new()).with_parallel_min_cells(usize::MAX);
        let parallel = GridEvaluator::new(BlackScholes::new()).with_parallel_min_cells(0);

        let a = sequential.evaluate_grid(RATE, TTM, STRIKE, &vols, &spots).unwrap();
        let b = parallel.evaluate_grid(RATE, TTM, STRIKE, &vols, &spots).unwrap();
        assert_eq!(a.call, b.call);
        assert_eq!(a.put, b.put);
    }

    #[test]
    fn test_bad_cell_aborts_whole_grid_with_index() {
        let evaluator = GridEvaluator::new(BlackScholes::new()).with_parallel_min_cells(0);
        let vols = SampleAxis::new(vec![-0.2, -0.1, 0.0, 0.1, 0.2]).unwrap();
        let spots = SampleAxis::linspace(80.0, 120.0, 4).unwrap();

        let err = evaluator
            .evaluate_grid(RATE, TTM, STRIKE, &vols, &spots)
            .unwrap_err();
        match err {
            PricingError::GridCell { vol_index, spot_index, source } => {
                assert_eq!((vol_index, spot_index), (0, 0));
                assert!(matches!(*source, PricingError::InvalidParameter { name: "volatility", .. }));
            }
            other => panic!("expected grid cell error, got {other}"),
        }
    }

    #[test]
    fn test_zero_vol_row_reports_degenerate_cell() {
        let evaluator = GridEvaluator::new(BlackScholes::new());
        let vols = SampleAxis::new(vec![0.0, 0.2]).unwrap();
        let spots = SampleAxis::new(vec![90.0, 110.0]).unwrap();
        let quote = MarketQuote { call: 1.0, put: 1.0 };

        let err = evaluator
            .evaluate_pnl_grid(RATE, TTM, STRIKE, &vols, &spots, quote)
            .unwrap_err();
        assert!(matches!(
            err,
            PricingError::GridCell { vol_index: 0, spot_index: 0, ref source }
                if matches!(**source, PricingError::Degenerate(_))
        ));
    }

    #[test]
    fn test_overflowing_cell_is_wrapped_degenerate() {
        let evaluator = GridEvaluator::new(BlackScholes::new());
        let vols = SampleAxis::new(vec![0.2, 0.3]).unwrap();
        let spots = SampleAxis::new(vec![1.0, 1e308]).unwrap();
        let err = evaluator
            .evaluate_grid(0.0, TTM, 1e-308, &vols, &spots)
            .unwrap_err();
        assert!(matches!(
            err,
            PricingError::GridCell { vol_index: 0, spot_index: 1, ref source }
                if matches!(**source, PricingError::Degenerate(_))
        ));
    }

    #[test]
    fn test_get_checks_bounds() {
        let evaluator = GridEvaluator::new(BlackScholes::new());
        let (vols, spots) = axes();
        let grid = evaluator.evaluate_grid(RATE, TTM, STRIKE, &vols, &spots).unwrap();
        assert_eq!(grid.call.get(9, 4), Some(grid.call[(9, 4)]));
        assert_eq!(grid.call.get(10, 0), None);
        assert_eq!(grid.call.get(0, 5), None);
    }

    #[test]
    fn test_bad_spot_sample_reports_first_cell() {
        let evaluator = GridEvaluator::new(BlackScholes::new());
        let vols = SampleAxis::new(vec![0.2, 0.3]).unwrap();
        let spots = SampleAxis::new(vec![-10.0, 0.0, 50.0]).unwrap();
        let err = evaluator
            .evaluate_grid(RATE, TTM, STRIKE, &vols, &spots)
            .unwrap_err();
        assert!(matches!(err, PricingError::GridCell { vol_index: 0, spot_index: 0, .. }));
    }

    /// Fails at one chosen (spot, vol) point, prices 1.0/2.0 elsewhere.
    #[derive(Clone, Copy)]
    struct FailAt {
        spot: f64,
        vol: f64,
    }

    impl OptionPricer for FailAt {
        fn name(&self) -> &'static str {
            "fail-at"
        }

        fn price(&self, params: &ContractParams) -> PricingResult<crate::models::OptionValues> {
            if params.spot == self.spot && params.volatility == self.vol {
                return Err(PricingError::Degenerate("planted".into()));
            }
            Ok(crate::models::OptionValues { call: 1.0, put: 2.0 })
        }
    }

    #[test]
    fn test_failure_index_maps_to_axes() {
        let vols = SampleAxis::linspace(0.1, 1.0, 10).unwrap();
        let spots = SampleAxis::linspace(10.0, 100.0, 10).unwrap();
        let planted = FailAt {
            spot: spots.values()[7],
            vol: vols.values()[4],
        };

        for threshold in [0, usize::MAX] {
            let evaluator = GridEvaluator::new(planted).with_parallel_min_cells(threshold);
            let err = evaluator
                .evaluate_grid(RATE, TTM, STRIKE, &vols, &spots)
                .unwrap_err();
            assert!(
                matches!(err, PricingError::GridCell { vol_index: 4, spot_index: 7, .. }),
                "threshold {threshold}: got {err}"
            );
        }
    }

    #[test]
    fn test_invalid_fixed_params_rejected_before_sweep() {
        let evaluator = GridEvaluator::new(BlackScholes::new());
        let (vols, spots) = axes();
        let err = evaluator
            .evaluate_grid(RATE, 0.0, STRIKE, &vols, &spots)
            .unwrap_err();
        assert!(matches!(
            err,
            PricingError::InvalidParameter { name: "time_to_maturity", .. }
        ));

        let err = evaluator
            .evaluate_pnl_grid(RATE, TTM, STRIKE, &vols, &spots, MarketQuote { call: f64::NAN, put: 1.0 })
            .unwrap_err();
        assert!(matches!(err, PricingError::InvalidParameter { name: "market_call", .. }));
    }

    #[test]
    fn test_grid_serializes_as_nested_rows() {
        let evaluator = GridEvaluator::new(BlackScholes::new());
        let vols = SampleAxis::new(vec![0.2, 0.3]).unwrap();
        let spots = SampleAxis::new(vec![90.0, 100.0, 110.0]).unwrap();
        let grid = evaluator.evaluate_grid(RATE, TTM, STRIKE, &vols, &spots).unwrap();

        let json = serde_json::to_value(&grid).unwrap();
        let call = json["call"].as_array().unwrap();
        assert_eq!(call.len(), 2);
        assert_eq!(call[1].as_array().unwrap().len(), 3);
        assert_eq!(call[1][2].as_f64().unwrap(), grid.call[(1, 2)]);
        assert_eq!(json["vol_axis"][1].as_f64().unwrap(), 0.3);
    }
}

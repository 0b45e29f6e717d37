//! Black-Scholes valuation over spot x volatility grids.
//!
//! [`models`] holds the scalar pricer, [`grid`] sweeps it across two sample
//! axes, and [`server`] exposes both as a JSON API.

pub mod config;
pub mod display;
pub mod errors;
pub mod grid;
pub mod models;
pub mod quotes;
pub mod server;
pub mod state;

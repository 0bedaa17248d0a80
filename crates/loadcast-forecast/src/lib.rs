//! loadcast-forecast: bounded-horizon forecasting that never fails.
//!
//! # Policy
//!
//! ```text
//! points < min_points      → repeat last value H times   (Fallback)
//! auto-ARIMA fit succeeds  → H-step point predictions    (Model)
//! fit / predict fails      → repeat last value H times   (Fallback)
//! ```
//!
//! The auto-ARIMA search picks `d` by repeated KPSS tests, then fits every
//! `(p, q)` with `p ≤ max_p`, `q ≤ max_q`, `p + q ≤ max_order` by
//! conditional sum of squares and keeps the lowest AIC.
//!
//! Forecast timestamps are hourly, starting one hour after the last
//! aggregated point. Values are not clipped.

pub mod arima;
pub mod engine;
pub mod error;
mod ols;
mod optimize;
pub mod stationarity;

pub use arima::{ArimaModel, ArimaOrder, ArimaSearch};
pub use engine::{FallbackReason, Forecast, ForecastEngine, ForecastSeries};
pub use error::FitError;

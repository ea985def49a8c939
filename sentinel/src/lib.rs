//! Library surface of the sentinel client: API access, metric series, chart state and views.

pub mod api;
pub mod app;
pub mod chart;
pub mod config;
pub mod error;
pub mod logging;
pub mod profiles;
pub mod series;
pub mod time_sync;
pub mod types;
pub mod ui;

//! Collector 작업 모듈.

pub mod breadth;
pub mod cache_admin;
pub mod ohlcv_update;
pub mod source;

pub use breadth::{render_breadth_report, run_breadth, BreadthOptions};
pub use cache_admin::{render_cache_stats, render_history};
pub use ohlcv_update::{resolve_symbols, run_update};
pub use source::{build_source, PriceSources};

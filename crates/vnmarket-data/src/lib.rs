//! OHLCV 가격 캐시와 Market Breadth 엔진.
//!
//! 이 crate는 다음을 제공합니다:
//! - SQLite OHLCV 가격 캐시 (`PriceStore`)
//! - 가격 데이터 소스 계약과 조합 (`PriceSource`, `FallbackSource`, `ThrottledSource`)
//! - 증분 업데이터 (`IncrementalUpdater`)
//! - 병렬 breadth 분석기 (`BreadthAnalyzer`)와 결과 캐시 (`BreadthResultCache`)
//! - 일자별 breadth 이력

pub mod breadth_history;
pub mod error;
pub mod indicators;
pub mod locks;
pub mod manager;
pub mod market_breadth;
pub mod provider;
pub mod storage;
pub mod updater;

pub use error::{DataError, Result};
pub use manager::{BreadthResponse, MarketDataService};

pub use breadth_history::{compute_breadth_history, load_breadth_history, HistoryParams};
pub use locks::KeyedLocks;
pub use market_breadth::{
    evaluate_symbol, reduce_outcomes, BarReader, BreadthAnalyzer, BreadthParams, SymbolOutcome,
    SymbolResult,
};
pub use provider::{CsvDirSource, FallbackSource, PriceSource, ThrottledSource};
pub use storage::{BreadthResultCache, CacheStats, IntegrityStatus, PriceStore};
pub use updater::{
    plan_update, DateWindow, FullReason, IncrementalUpdater, Pacing, UpdateOutcome, UpdatePlan,
    UpdatePolicy, UpdateSummary,
};

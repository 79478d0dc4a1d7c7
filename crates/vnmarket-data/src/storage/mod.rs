//! 영속 저장소.
//!
//! - `ohlcv`: SQLite OHLCV 가격 캐시
//! - `breadth_cache`: breadth 결과 단일 슬롯 캐시

pub mod breadth_cache;
pub mod ohlcv;

pub use breadth_cache::BreadthResultCache;
pub use ohlcv::{CacheStats, IntegrityStatus, OhlcvMetadataRecord, OhlcvRecord, PriceStore};

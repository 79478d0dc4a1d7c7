//! Standalone OHLCV collector and market breadth CLI.
//!
//! 이 crate는 UI와 독립적으로 실행되는 바이너리를 제공합니다:
//! - OHLCV 증분 업데이트 (CSV 내보내기 디렉터리 소스)
//! - Market Breadth 계산 및 결과 캐시 조회
//! - 캐시 통계/삭제, breadth 이력

pub mod config;
pub mod error;
pub mod modules;
pub mod stats;

pub use config::CollectorConfig;
pub use error::{CollectorError, Result};
pub use stats::CollectionStats;

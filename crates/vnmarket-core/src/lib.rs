//! # VN Market Core
//!
//! 베트남 주식 OHLCV 캐시 및 Market Breadth 엔진의 핵심 도메인 타입을 제공합니다.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - OHLCV 일봉/주봉/월봉 데이터 구조체
//! - Market Breadth 집계 결과 및 스냅샷
//! - 주입 가능한 시계 (`Clock`)
//! - 설정 관리
//! - 로깅 인프라

pub mod clock;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock, VN_TZ};
pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
pub use types::*;

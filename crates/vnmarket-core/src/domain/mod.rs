//! 가격 캐시와 시장 폭 분석을 위한 도메인 모델.

mod market_breadth;
mod market_data;

pub use market_breadth::*;
pub use market_data::*;

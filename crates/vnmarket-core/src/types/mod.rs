//! 캐시와 분석기 전반에서 사용되는 공통 타입.

mod decimal;
mod resolution;
mod symbol;

pub use decimal::*;
pub use resolution::*;
pub use symbol::*;

//! 에러 타입 정의.

use thiserror::Error;
use vnmarket_core::CoreError;
use vnmarket_data::DataError;

/// Collector 에러 타입
#[derive(Debug, Error)]
pub enum CollectorError {
    /// 설정 에러
    #[error("Configuration error: {0}")]
    Config(String),

    /// 캐시/저장소 에러
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    /// 가격 소스 에러 (CSV 디렉터리 등)
    #[error("Data source error: {0}")]
    DataSource(String),

    /// 입력 에러 (종목 목록 등)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// 출력 직렬화 에러
    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),
}

impl From<CoreError> for CollectorError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidInput(msg) => Self::InvalidInput(msg),
            other => Self::Config(other.to_string()),
        }
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, CollectorError>;

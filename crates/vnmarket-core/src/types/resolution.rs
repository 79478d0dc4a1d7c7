//! 가격 봉 해상도 정의.
//!
//! 캐시는 일봉/주봉/월봉만 다룹니다. DB 저장 문자열은 기존 캐시 파일과
//! 호환되도록 `1D`, `1W`, `1M`을 사용합니다.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// 가격 봉 해상도.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Resolution {
    /// 일봉
    #[serde(rename = "1D")]
    Daily,
    /// 주봉
    #[serde(rename = "1W")]
    Weekly,
    /// 월봉
    #[serde(rename = "1M")]
    Monthly,
}

impl Resolution {
    /// 모든 해상도.
    pub const ALL: [Resolution; 3] = [Resolution::Daily, Resolution::Weekly, Resolution::Monthly];

    /// DB 저장용 문자열.
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Daily => "1D",
            Resolution::Weekly => "1W",
            Resolution::Monthly => "1M",
        }
    }

    /// 한 봉이 덮는 대략적인 달력 일수.
    pub fn approx_days(&self) -> i64 {
        match self {
            Resolution::Daily => 1,
            Resolution::Weekly => 7,
            Resolution::Monthly => 30, // 근사값
        }
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Resolution::Daily
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1D" | "D" | "1d" | "daily" => Ok(Resolution::Daily),
            "1W" | "W" | "1w" | "weekly" => Ok(Resolution::Weekly),
            "1M" | "M" | "monthly" => Ok(Resolution::Monthly),
            other => Err(CoreError::Parse(format!("Invalid resolution: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_round_trip_str() {
        for res in Resolution::ALL {
            assert_eq!(res.as_str().parse::<Resolution>().unwrap(), res);
        }
    }

    #[test]
    fn test_resolution_aliases() {
        assert_eq!("D".parse::<Resolution>().unwrap(), Resolution::Daily);
        assert_eq!("weekly".parse::<Resolution>().unwrap(), Resolution::Weekly);
        assert!("5m".parse::<Resolution>().is_err());
    }

    #[test]
    fn test_resolution_serde_uses_db_string() {
        let json = serde_json::to_string(&Resolution::Monthly).unwrap();
        assert_eq!(json, "\"1M\"");
    }
}

//! CSV 내보내기 디렉토리 소스.
//!
//! `<dir>/<SYMBOL>.csv` 파일을 읽습니다. 헤더는
//! `date,open,high,low,close,volume`이며 날짜는 `YYYY-MM-DD`입니다.
//! 파일이 없는 종목은 빈 결과입니다.

use super::PriceSource;
use crate::error::{DataError, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::debug;
use vnmarket_core::{OhlcvBar, Resolution};

#[derive(Debug, Deserialize)]
struct CsvRow {
    date: NaiveDate,
    #[serde(with = "rust_decimal::serde::str")]
    open: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    high: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    low: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    close: Decimal,
    volume: u64,
}

/// CSV 디렉토리 가격 소스. 일봉만 지원합니다.
#[derive(Debug, Clone)]
pub struct CsvDirSource {
    dir: PathBuf,
}

impl CsvDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn file_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", symbol))
    }

    /// 디렉토리의 CSV 파일 이름으로 종목 목록을 만듭니다 (정렬).
    pub async fn list_symbols(&self) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut symbols = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                // 파일 이름이 정규화된 종목 코드인 경우만 (대소문자 구분 파일 시스템)
                if vnmarket_core::normalize_symbol(stem).is_ok_and(|s| s == stem) {
                    symbols.push(stem.to_string());
                }
            }
        }
        symbols.sort();
        symbols.dedup();
        Ok(symbols)
    }
}

fn parse_csv(symbol: &str, bytes: &[u8]) -> Result<Vec<OhlcvBar>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(bytes);

    reader
        .deserialize::<CsvRow>()
        .map(|row| {
            let row = row.map_err(|e| DataError::ParseError(format!("{}.csv: {}", symbol, e)))?;
            Ok(OhlcvBar::daily(
                symbol, row.date, row.open, row.high, row.low, row.close, row.volume,
            ))
        })
        .collect()
}

#[async_trait]
impl PriceSource for CsvDirSource {
    fn name(&self) -> &str {
        "csv"
    }

    async fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        resolution: Resolution,
    ) -> Result<Vec<OhlcvBar>> {
        if resolution != Resolution::Daily {
            return Err(DataError::InvalidData(format!(
                "CSV 소스는 일봉만 지원합니다: {}",
                resolution
            )));
        }

        let path = self.file_for(symbol);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(symbol = symbol, path = %path.display(), "CSV 파일 없음");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut bars: Vec<OhlcvBar> = parse_csv(symbol, &bytes)?
            .into_iter()
            .filter(|b| b.date >= start && b.date <= end)
            .collect();
        bars.sort_by_key(|b| b.date);

        debug!(symbol = symbol, count = bars.len(), "CSV 데이터 읽기 완료");
        Ok(bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const SAMPLE: &str = "date,open,high,low,close,volume\n\
        2024-06-04,66.5,67.0,66.1,66.8,1200000\n\
        2024-06-03,66.0,66.7,65.8,66.4,1500000\n\
        2024-05-31,65.2,66.1,65.0,65.9,900000\n";

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_filters_window_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("VNM.csv"), SAMPLE).unwrap();
        let src = CsvDirSource::new(dir.path());

        let bars = src
            .fetch("VNM", date(2024, 6, 1), date(2024, 6, 30), Resolution::Daily)
            .await
            .unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, date(2024, 6, 3));
        assert_eq!(bars[1].close, dec!(66.8));
        assert_eq!(bars[1].volume, 1_200_000);
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let src = CsvDirSource::new(dir.path());
        let bars = src
            .fetch("XYZ", date(2024, 1, 1), date(2024, 12, 31), Resolution::Daily)
            .await
            .unwrap();
        assert!(bars.is_empty());
    }

    #[tokio::test]
    async fn test_bad_row_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("BAD.csv"),
            "date,open,high,low,close,volume\n2024-06-03,1,1,1,abc,10\n",
        )
        .unwrap();
        let src = CsvDirSource::new(dir.path());
        let err = src
            .fetch("BAD", date(2024, 1, 1), date(2024, 12, 31), Resolution::Daily)
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::ParseError(_)));
    }

    #[tokio::test]
    async fn test_list_symbols() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["VNM.csv", "HPG.csv", "lower.csv", "notes.txt"] {
            std::fs::write(dir.path().join(name), SAMPLE).unwrap();
        }
        let src = CsvDirSource::new(dir.path());
        assert_eq!(src.list_symbols().await.unwrap(), vec!["HPG", "VNM"]);
    }
}

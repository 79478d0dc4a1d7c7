//! 종목 코드 정규화.
//!
//! HOSE/HNX/UPCOM 종목 코드는 3자리 영문(예: HPG, VNM)이 대부분이지만
//! ETF/CW는 더 길 수 있습니다(예: E1VFVN30, FUEVFVND).

use crate::error::{CoreError, CoreResult};

/// 종목 코드 최대 길이.
pub const MAX_SYMBOL_LEN: usize = 12;

/// 종목 코드를 정규화합니다 (공백 제거, 대문자).
///
/// 빈 문자열, 영숫자 이외 문자, 최대 길이 초과는 에러입니다.
pub fn normalize_symbol(raw: &str) -> CoreResult<String> {
    let symbol = raw.trim().to_uppercase();

    if symbol.is_empty() {
        return Err(CoreError::InvalidInput("빈 종목 코드".to_string()));
    }
    if symbol.len() > MAX_SYMBOL_LEN {
        return Err(CoreError::InvalidInput(format!(
            "종목 코드가 너무 깁니다: {}",
            symbol
        )));
    }
    if !symbol.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(CoreError::InvalidInput(format!(
            "허용되지 않는 문자: {}",
            symbol
        )));
    }

    Ok(symbol)
}

/// 쉼표로 구분된 종목 목록을 파싱합니다.
///
/// 중복은 제거하고 입력 순서를 유지합니다.
pub fn parse_symbol_list(raw: &str) -> CoreResult<Vec<String>> {
    let mut symbols: Vec<String> = Vec::new();
    for part in raw.split(',').filter(|s| !s.trim().is_empty()) {
        let symbol = normalize_symbol(part)?;
        if !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }
    Ok(symbols)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_symbol() {
        assert_eq!(normalize_symbol(" hpg ").unwrap(), "HPG");
        assert_eq!(normalize_symbol("E1VFVN30").unwrap(), "E1VFVN30");
        assert!(normalize_symbol("").is_err());
        assert!(normalize_symbol("VN-30").is_err());
        assert!(normalize_symbol("ABCDEFGHIJKLM").is_err());
    }

    #[test]
    fn test_parse_symbol_list_dedup() {
        let list = parse_symbol_list("vnm, HPG,,vnm ,fpt").unwrap();
        assert_eq!(list, vec!["VNM", "HPG", "FPT"]);
    }
}

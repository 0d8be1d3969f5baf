use once_cell::sync::Lazy;
use regex::Regex;

static DIGIT_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+").expect("digit-run pattern is a valid regex"));

/// 从左到右提取最长连续数字串，保留为字符串（前导零不丢失，不会溢出）
pub fn parse_numbers(text: &str) -> Vec<String> {
    DIGIT_RUN
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_text() {
        assert_eq!(parse_numbers("a12b034"), vec!["12", "034"]);
    }

    #[test]
    fn test_parse_empty_and_no_digits() {
        assert!(parse_numbers("").is_empty());
        assert!(parse_numbers("no digits").is_empty());
    }

    #[test]
    fn test_parse_keeps_order_and_splits_on_punctuation() {
        assert_eq!(parse_numbers("12.5 -7\n003"), vec!["12", "5", "7", "003"]);
    }

    #[test]
    fn test_parse_huge_run_stays_a_string() {
        let long = "9".repeat(64);
        assert_eq!(parse_numbers(&format!("x{}y", long)), vec![long]);
    }
}

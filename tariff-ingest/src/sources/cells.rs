//! Parsing of individual CSV cells. Empty or unparseable cells are missing.

pub fn parse_optional_f64(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        trimmed.parse().ok().filter(|v: &f64| !v.is_nan())
    }
}

pub fn parse_optional_string(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// A non-negative integer, accepting float spellings such as `14328.0`.
pub fn parse_whole(s: &str) -> Option<u64> {
    let v = parse_optional_f64(s)?;
    if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= u64::MAX as f64 {
        Some(v as u64)
    } else {
        None
    }
}

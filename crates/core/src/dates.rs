use chrono::NaiveDate;

/// Reformat a compact statement timestamp (`YYYYMMDD…`) as `YYYY-MM-DD`.
/// Values that do not start with eight digits pass through unchanged.
pub fn normalize_date(raw: &str) -> String {
    let raw = raw.trim();
    let head: String = raw.chars().take(8).collect();
    if head.len() == 8 && head.bytes().all(|b| b.is_ascii_digit()) {
        format!("{}-{}-{}", &head[0..4], &head[4..6], &head[6..8])
    } else {
        raw.to_string()
    }
}

/// Inverse of [`normalize_date`]: `YYYY-MM-DD` becomes `YYYYMMDD`.
pub fn compact_date(date: &str) -> String {
    match parse_iso_date(date) {
        Some(d) => d.format("%Y%m%d").to_string(),
        None => date.trim().to_string(),
    }
}

pub fn parse_iso_date(date: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_full_timestamp() {
        assert_eq!(normalize_date("20240115093000"), "2024-01-15");
        assert_eq!(normalize_date("20240115120000[-3:BRT]"), "2024-01-15");
    }

    #[test]
    fn normalize_exactly_eight() {
        assert_eq!(normalize_date("20231231"), "2023-12-31");
    }

    #[test]
    fn short_values_pass_through() {
        assert_eq!(normalize_date("2024"), "2024");
        assert_eq!(normalize_date(""), "");
    }

    #[test]
    fn non_compact_values_pass_through() {
        assert_eq!(normalize_date("2024-01-15"), "2024-01-15");
        assert_eq!(normalize_date("15/01/2024"), "15/01/2024");
    }

    #[test]
    fn compact_is_inverse_for_iso_dates() {
        assert_eq!(compact_date("2024-01-15"), "20240115");
        assert_eq!(normalize_date(&compact_date("2024-02-29")), "2024-02-29");
        assert_eq!(compact_date("yesterday"), "yesterday");
    }
}

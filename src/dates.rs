use chrono::NaiveDate;

/// Parse a compact `YYYYMMDD` date cell. The corpus stores these as
/// integers, so a float round trip (`20240115.0`) and stray whitespace
/// are tolerated; anything else malformed yields `None` rather than an
/// error, one cell at a time.
pub fn parse_compact_date(raw: &str) -> Option<NaiveDate> {
    let mut digits = raw.trim();
    if let Some(stripped) = digits.strip_suffix(".0") {
        digits = stripped;
    }
    if digits.len() != 8 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = digits[0..4].parse().ok()?;
    let month: u32 = digits[4..6].parse().ok()?;
    let day: u32 = digits[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Compact date cell to ISO form, empty cell when malformed. ISO
/// strings sort lexicographically in date order, which the rank gap
/// fill relies on.
pub fn compact_to_iso(raw: &str) -> String {
    parse_compact_date(raw)
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

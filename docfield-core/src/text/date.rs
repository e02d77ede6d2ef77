use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

static RE_SEPARATED_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4})\s*[年.\-/]\s*(\d{1,2})\s*[月.\-/]\s*(\d{1,2})\s*日?")
        .expect("valid separated date regex")
});

static RE_COMPACT_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})(\d{2})(\d{2})$").expect("valid compact date regex"));

/// Calendar date from year/month/day digit strings.
pub fn ymd(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

/// Parses the first date in `text`.
///
/// Accepts `YYYY年M月D日`, `YYYY.M.D`, `YYYY-M-D`, `YYYY/M/D`, and a bare
/// `YYYYMMDD` when it is the whole string. Impossible calendar dates are
/// rejected.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if let Some(caps) = RE_COMPACT_DATE.captures(text) {
        return ymd(&caps[1], &caps[2], &caps[3]);
    }

    RE_SEPARATED_DATE
        .captures_iter(text)
        .find_map(|caps| ymd(&caps[1], &caps[2], &caps[3]))
}

/// Every separated date in `text`, in order of appearance.
pub fn find_dates(text: &str) -> Vec<NaiveDate> {
    RE_SEPARATED_DATE
        .captures_iter(text)
        .filter_map(|caps| ymd(&caps[1], &caps[2], &caps[3]))
        .collect()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Rewrites a date to `YYYY-MM-DD`, `None` when no date is found.
pub fn canonical_date(text: &str) -> Option<String> {
    parse_date(text).map(format_date)
}

/// Rewrites a validity period to `YYYY-MM-DD~YYYY-MM-DD`.
///
/// An open-ended period ("长期") keeps the word as its end.
pub fn canonical_date_range(text: &str) -> Option<String> {
    let dates = find_dates(text);
    match dates.as_slice() {
        [start, end, ..] => Some(format!("{}~{}", format_date(*start), format_date(*end))),
        [start] if text.contains("长期") => Some(format!("{}~长期", format_date(*start))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(1990, 3, 7);
        assert_eq!(parse_date("1990年3月7日"), expected);
        assert_eq!(parse_date("1990.03.07"), expected);
        assert_eq!(parse_date("1990-3-7"), expected);
        assert_eq!(parse_date("出生 1990 年 3 月 7 日"), expected);
        assert_eq!(parse_date("19900307"), expected);

        // Not a calendar date
        assert_eq!(parse_date("1990年2月30日"), None);
        assert_eq!(parse_date("no date here"), None);
    }

    #[test]
    fn test_find_dates() {
        let dates = find_dates("2015.06.01-2035.06.01");
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2015, 6, 1).unwrap(),
                NaiveDate::from_ymd_opt(2035, 6, 1).unwrap(),
            ]
        );

        // Compact digits inside longer numbers are not dates
        assert!(find_dates("44030419900307123X").is_empty());
    }

    #[test]
    fn test_canonical_forms() {
        assert_eq!(canonical_date("2001年12月9日").as_deref(), Some("2001-12-09"));
        assert_eq!(
            canonical_date_range("2015.06.01-2035.06.01").as_deref(),
            Some("2015-06-01~2035-06-01")
        );
        assert_eq!(
            canonical_date_range("2015.06.01-长期").as_deref(),
            Some("2015-06-01~长期")
        );
        assert_eq!(canonical_date_range("长期"), None);
    }
}

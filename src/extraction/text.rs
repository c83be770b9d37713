use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Selector};

pub const DESCRIPTION_LIMIT: usize = 200;

static TIME: Lazy<Selector> =
    Lazy::new(|| Selector::parse("time[datetime]").expect("valid time selector"));

/// Trim and squeeze every whitespace run to a single space.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text content exactly as the document holds it, line breaks included.
pub fn raw_text(element: ElementRef<'_>) -> String {
    element.text().collect()
}

pub fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&raw_text(element))
}

/// Cut to `max` characters with a trailing "..." when longer.
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max).collect();
    cut.push_str("...");
    cut
}

pub fn truncate_description(text: &str) -> Option<String> {
    let collapsed = collapse_whitespace(text);
    if collapsed.is_empty() {
        None
    } else {
        Some(truncate_chars(&collapsed, DESCRIPTION_LIMIT))
    }
}

/// First source line whose trimmed length falls in `min..max` characters.
pub fn first_line_within(raw: &str, min: usize, max: usize) -> Option<String> {
    raw.lines()
        .map(collapse_whitespace)
        .find(|line| {
            let len = line.chars().count();
            len > min && len < max
        })
}

/// Publication time from the first `<time datetime>` inside `element`.
pub fn published_time(element: ElementRef<'_>) -> Option<DateTime<Utc>> {
    element
        .select(&TIME)
        .filter_map(|time| time.value().attr("datetime"))
        .find_map(parse_datetime)
}

/// RFC 3339 timestamps, or bare dates taken as midnight UTC.
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use scraper::Html;

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  Breaking \n\t  news  "), "Breaking news");
        assert_eq!(collapse_whitespace(" \n "), "");
    }

    #[test]
    fn test_truncate_chars_counts_characters() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("abcdef", 3), "abc...");
        // Multi-byte characters are never split
        assert_eq!(truncate_chars("ニュース速報です", 4), "ニュース...");
    }

    #[test]
    fn test_truncate_description() {
        assert_eq!(truncate_description("   "), None);
        let long = "word ".repeat(100);
        let description = truncate_description(&long).unwrap();
        assert_eq!(description.chars().count(), DESCRIPTION_LIMIT + 3);
        assert!(description.ends_with("..."));
    }

    #[test]
    fn test_first_line_within() {
        let raw = "\n  Hi \n   A proper headline here  \nrest";
        assert_eq!(
            first_line_within(raw, 5, 200),
            Some("A proper headline here".to_string())
        );
        assert_eq!(first_line_within("tiny\nsmall", 5, 200), None);
    }

    #[test]
    fn test_parse_datetime_formats() {
        assert_eq!(
            parse_datetime("2024-03-05T10:30:00+02:00"),
            Some(Utc.with_ymd_and_hms(2024, 3, 5, 8, 30, 0).unwrap())
        );
        assert_eq!(
            parse_datetime("2024-03-05"),
            Some(Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_datetime("yesterday"), None);
    }

    #[test]
    fn test_published_time_skips_unparseable() {
        let html = Html::parse_fragment(
            r#"<div><time datetime="soon">Soon</time><time datetime="2024-01-02T00:00:00Z">Jan 2</time></div>"#,
        );
        let selector = Selector::parse("div").unwrap();
        let div = html.select(&selector).next().unwrap();

        assert_eq!(
            published_time(div),
            Some(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap())
        );
    }
}

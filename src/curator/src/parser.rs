//! Extraction of date-stamped index descriptors from the raw cluster listing.

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

/// Date format embedded in index names, e.g. `logstash-2024.01.31`
pub const INDEX_DATE_FORMAT: &str = "%Y.%m.%d";

/// A date-stamped index found in the listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexDescriptor {
    /// Canonical `prefix-YYYY.MM.DD` name
    pub name: String,
    /// UTC calendar day encoded in the name
    pub date: NaiveDate,
    pub is_closed: bool,
}

impl IndexDescriptor {
    /// Whole days between the index date and `today`. Negative for future-dated indices.
    pub fn age_days(&self, today: NaiveDate) -> i64 {
        (today - self.date).num_days()
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("index {index} carries an invalid date '{date}': {source}")]
    InvalidDate {
        index: String,
        date: String,
        #[source]
        source: chrono::ParseError,
    },
}

impl ParseError {
    pub fn index(&self) -> &str {
        match self {
            ParseError::InvalidDate { index, .. } => index,
        }
    }
}

/// Result of parsing a whole listing
#[derive(Debug, Default)]
pub struct ParsedListing {
    /// Number of non-blank lines, i.e. indices reported by the cluster
    pub entries: usize,
    pub descriptors: Vec<IndexDescriptor>,
    pub errors: Vec<ParseError>,
}

/// Parses listing lines for indices named `<prefix>-YYYY.MM.DD`
#[derive(Debug, Clone)]
pub struct IndexLineParser {
    pattern: Regex,
}

impl IndexLineParser {
    pub fn new(prefix: &str) -> Result<Self, regex::Error> {
        let pattern = Regex::new(&format!(
            r"(?i){}-([0-9]{{4}}\.[0-9]{{2}}\.[0-9]{{2}})",
            regex::escape(prefix)
        ))?;
        Ok(Self { pattern })
    }

    /// Parse a single listing line.
    ///
    /// Returns `Ok(None)` for lines without a date-stamped index name, and an
    /// error when the name matches but the date is not a real calendar day.
    pub fn parse_line(&self, line: &str) -> Result<Option<IndexDescriptor>, ParseError> {
        let Some(captures) = self.pattern.captures(line) else {
            return Ok(None);
        };

        let name = captures[0].to_string();
        let raw_date = &captures[1];
        let date = NaiveDate::parse_from_str(raw_date, INDEX_DATE_FORMAT).map_err(|source| {
            ParseError::InvalidDate {
                index: name.clone(),
                date: raw_date.to_string(),
                source,
            }
        })?;

        Ok(Some(IndexDescriptor {
            name,
            date,
            is_closed: is_closed(line),
        }))
    }

    /// Parse every line of a listing, collecting per-line errors instead of failing
    pub fn parse_listing(&self, listing: &str) -> ParsedListing {
        let mut parsed = ParsedListing::default();

        for line in listing.lines().filter(|line| !line.trim().is_empty()) {
            parsed.entries += 1;
            match self.parse_line(line) {
                Ok(Some(descriptor)) => parsed.descriptors.push(descriptor),
                Ok(None) => {}
                Err(e) => parsed.errors.push(e),
            }
        }

        parsed
    }
}

/// A line describes a closed index when it carries a `close` status token and
/// no `open` token.
fn is_closed(line: &str) -> bool {
    let mut closed = false;
    for token in line.split_whitespace() {
        if token.eq_ignore_ascii_case("open") {
            return false;
        }
        if token.eq_ignore_ascii_case("close") {
            closed = true;
        }
    }
    closed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> IndexLineParser {
        IndexLineParser::new("logstash").unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_open_index_line() {
        let descriptor = parser()
            .parse_line("green open logstash-2024.01.01 Xb3 5 1 1200 0 1.2mb 600kb")
            .unwrap()
            .unwrap();

        assert_eq!(descriptor.name, "logstash-2024.01.01");
        assert_eq!(descriptor.date, date(2024, 1, 1));
        assert!(!descriptor.is_closed);
    }

    #[test]
    fn test_parse_closed_index_line() {
        let descriptor = parser()
            .parse_line("       close logstash-2023.01.01 Yc4")
            .unwrap()
            .unwrap();

        assert_eq!(descriptor.name, "logstash-2023.01.01");
        assert!(descriptor.is_closed);
    }

    #[test]
    fn test_open_token_wins_over_close() {
        assert!(!is_closed("close open logstash-2023.01.01"));
        assert!(is_closed("CLOSE logstash-2023.01.01"));
        // Substrings of other words are not status tokens
        assert!(!is_closed("green opened closed logstash-2023.01.01"));
    }

    #[test]
    fn test_line_without_date_stamp_is_skipped() {
        let parser = parser();
        assert!(parser.parse_line("green open .kibana 1 1").unwrap().is_none());
        assert!(parser.parse_line("green open logstash-latest").unwrap().is_none());
        assert!(parser.parse_line("green open metrics-2024.01.01").unwrap().is_none());
    }

    #[test]
    fn test_invalid_calendar_date_is_an_error() {
        let err = parser()
            .parse_line("green open logstash-2024.13.45 Zz 1 1")
            .unwrap_err();

        assert_eq!(err.index(), "logstash-2024.13.45");
        assert!(err.to_string().contains("2024.13.45"));
    }

    #[test]
    fn test_first_match_is_used() {
        let descriptor = parser()
            .parse_line("green open logstash-2024.02.03 alias:logstash-2020.01.01")
            .unwrap()
            .unwrap();
        assert_eq!(descriptor.name, "logstash-2024.02.03");
    }

    #[test]
    fn test_prefix_is_matched_literally_and_case_insensitively() {
        let parser = IndexLineParser::new("app.logs").unwrap();
        assert!(parser.parse_line("open appXlogs-2024.01.01").unwrap().is_none());

        let descriptor = parser
            .parse_line("open APP.LOGS-2024.01.01")
            .unwrap()
            .unwrap();
        assert_eq!(descriptor.name, "APP.LOGS-2024.01.01");
    }

    #[test]
    fn test_date_round_trips_through_name() {
        let parser = parser();
        for name in [
            "logstash-2024.02.29",
            "logstash-1999.12.31",
            "logstash-2023.01.01",
        ] {
            let descriptor = parser.parse_line(name).unwrap().unwrap();
            let rendered = format!("logstash-{}", descriptor.date.format(INDEX_DATE_FORMAT));
            assert_eq!(rendered, name);
        }
    }

    #[test]
    fn test_parse_listing_collects_entries_and_errors() {
        let listing = "green open logstash-2024.01.01 a 1 1\n\
                       \n\
                       green open .kibana b 1 1\n\
                       close logstash-2023.01.01 c\n\
                       green open logstash-2023.02.30 d 1 1\n";

        let parsed = parser().parse_listing(listing);

        assert_eq!(parsed.entries, 4);
        assert_eq!(parsed.descriptors.len(), 2);
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.errors[0].index(), "logstash-2023.02.30");
    }

    #[test]
    fn test_parse_empty_listing() {
        let parsed = parser().parse_listing("");
        assert_eq!(parsed.entries, 0);
        assert!(parsed.descriptors.is_empty());
        assert!(parsed.errors.is_empty());
    }

    #[test]
    fn test_age_days() {
        let descriptor = parser()
            .parse_line("open logstash-2024.01.01")
            .unwrap()
            .unwrap();

        assert_eq!(descriptor.age_days(date(2024, 2, 1)), 31);
        assert_eq!(descriptor.age_days(date(2024, 1, 1)), 0);
        assert_eq!(descriptor.age_days(date(2023, 12, 31)), -1);
    }
}

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveTime};
use regex::Regex;
use scraper::Html;
use tracing::{debug, info, warn};

use crate::config::MIN_VENUE_CHARS;
use crate::scrape::tables::{extract_tables, normalize_header, Table};
use crate::types::FixtureRecord;

/// `15/06/2025`, `15-6-25`
static NUMERIC_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})[/-](\d{1,2})[/-](\d{2,4})\b").unwrap());

/// `15 June 2025`, `15 Jun 25`
static TEXT_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(\d{1,2})\s+(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+(\d{2,4})\b",
    )
    .unwrap()
});

/// `7:30`, `7:30pm`, `19:30 PM`. The suffix must end a word, so
/// `7:30 Ambassador Hall` reads as 7:30 at "Ambassador Hall".
static TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d{1,2}):(\d{2})(?:\s*([ap]m)\b)?").unwrap());

static VENUE_PUNCT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s]+").unwrap());

/// Column positions of a qualifying fixtures table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixtureColumns {
    pub header_row: usize,
    pub time_venue: usize,
    pub opponent: usize,
}

/// Parse a fetched fixtures page. Every qualifying table contributes rows.
pub fn parse_fixtures_page(html: &str) -> Vec<FixtureRecord> {
    let doc = Html::parse_document(html);
    let tables = extract_tables(&doc);

    let mut fixtures = Vec::new();
    let mut matched_tables = 0usize;
    for table in &tables {
        let Some(cols) = locate_columns(table) else {
            debug!(header = ?table.header(), "Table has no time/venue + versus columns");
            continue;
        };
        matched_tables += 1;
        fixtures.extend(parse_fixtures_table(table, cols));
    }

    if matched_tables == 0 {
        warn!(tables = tables.len(), "No fixtures table among {} tables", tables.len());
    }
    info!(
        fixtures = fixtures.len(),
        tables = matched_tables,
        "Extracted {} fixtures from {} tables",
        fixtures.len(),
        matched_tables,
    );
    fixtures
}

/// Scan rows top-down for the first one naming both a time-and-venue column
/// and a versus column.
pub fn locate_columns(table: &Table) -> Option<FixtureColumns> {
    for (idx, row) in table.rows.iter().enumerate() {
        let mut time_venue = None;
        let mut opponent = None;
        for (col, text) in row.iter().enumerate() {
            let t = normalize_header(text);
            if t.contains("time") && t.contains("venue") {
                time_venue.get_or_insert(col);
            } else if t.contains("versus") || t.contains("vs") {
                opponent.get_or_insert(col);
            }
        }
        if let (Some(time_venue), Some(opponent)) = (time_venue, opponent) {
            return Some(FixtureColumns { header_row: idx, time_venue, opponent });
        }
    }
    None
}

fn parse_fixtures_table(table: &Table, cols: FixtureColumns) -> Vec<FixtureRecord> {
    let needed = cols.time_venue.max(cols.opponent);
    table
        .rows
        .iter()
        .skip(cols.header_row + 1)
        .filter(|cells| cells.len() > needed)
        .filter_map(|cells| parse_fixture_row(&cells[cols.time_venue], &cells[cols.opponent]))
        .collect()
}

/// One fixture from its two cells. `None` only when either cell is blank;
/// an unreadable date or time still yields a record.
pub fn parse_fixture_row(time_venue: &str, versus: &str) -> Option<FixtureRecord> {
    let time_venue = time_venue.trim();
    let opponent = versus.trim();
    if time_venue.is_empty() || opponent.is_empty() {
        return None;
    }

    let date_text = find_date(time_venue);
    let time_text = TIME.find(time_venue).map(|m| m.as_str().to_string());

    let mut rest = time_venue.to_string();
    if let Some(ref d) = date_text {
        rest = rest.replace(d.as_str(), " ");
    }
    if let Some(ref t) = time_text {
        rest = rest.replace(t.as_str(), " ");
    }
    let rest = VENUE_PUNCT.replace_all(&rest, " ");
    let venue = rest.split_whitespace().collect::<Vec<_>>().join(" ");
    let venue = (venue.chars().count() > MIN_VENUE_CHARS).then_some(venue);

    Some(FixtureRecord {
        opponent_name: opponent.to_string(),
        date: date_text.as_deref().and_then(parse_date),
        time: time_text.as_deref().and_then(parse_time),
        venue,
        date_text,
        time_text,
    })
}

fn find_date(text: &str) -> Option<String> {
    NUMERIC_DATE
        .find(text)
        .or_else(|| TEXT_DATE.find(text))
        .map(|m| m.as_str().to_string())
}

/// Day-first dates: `15/06/2025`, `15-6-25`, `15 June 2025`, `15 Jun 2025`.
/// Two-digit years are 20xx.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    if let Some(c) = NUMERIC_DATE.captures(s) {
        let day = c[1].parse().ok()?;
        let month = c[2].parse().ok()?;
        let year = full_year(c[3].parse().ok()?);
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    if let Some(c) = TEXT_DATE.captures(s) {
        let day = c[1].parse().ok()?;
        let month = month_number(&c[2])?;
        let year = full_year(c[3].parse().ok()?);
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    None
}

/// `7:30pm` → 19:30, `12:15am` → 00:15, `18:45` → 18:45.
/// An hour past 12 is already 24-hour, so `19:30 PM` → 19:30.
pub fn parse_time(s: &str) -> Option<NaiveTime> {
    let c = TIME.captures(s)?;
    let mut hour: u32 = c[1].parse().ok()?;
    let minute: u32 = c[2].parse().ok()?;
    match c.get(3).map(|m| m.as_str().to_lowercase()).as_deref() {
        Some("pm") if (1..12).contains(&hour) => hour += 12,
        Some("am") if hour == 12 => hour = 0,
        Some(_) if hour == 0 => return None,
        _ => {}
    }
    NaiveTime::from_hms_opt(hour, minute, 0)
}

fn full_year(y: i32) -> i32 {
    if y < 100 {
        2000 + y
    } else {
        y
    }
}

fn month_number(name: &str) -> Option<u32> {
    let m = match name.to_lowercase().get(..3)? {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(m)
}

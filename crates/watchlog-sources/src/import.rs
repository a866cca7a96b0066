//! Parser for the hand-kept history log the club used before the app existed.
//!
//! The format is a year header followed by one line per movie:
//!
//! ```text
//! 2021
//!
//! Fast & furious (Tomi) - Tammikuu
//! Leffakerho 1v: Wayne's world (Mikkis) - Tammikuu
//! ```

use regex::Regex;
use std::sync::OnceLock;
use tracing::warn;
use watchlog_models::Person;

/// One parsed log line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub title: String,
    pub person: Person,
    pub year: i32,
    pub month: u32,
}

const FINNISH_MONTHS: [&str; 12] = [
    "tammikuu", "helmikuu", "maaliskuu", "huhtikuu", "toukokuu", "kesäkuu",
    "heinäkuu", "elokuu", "syyskuu", "lokakuu", "marraskuu", "joulukuu",
];

fn entry_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(.+)\((.+)\)\s*-\s*(.+)$").expect("valid entry pattern"))
}

fn anniversary_prefix() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)^Leffakerho \d+v:\s*").expect("valid prefix pattern"))
}

/// Month number for a Finnish month name; unknown names fall back to January
pub fn parse_finnish_month(name: &str) -> u32 {
    let wanted = name.trim().to_lowercase();
    FINNISH_MONTHS
        .iter()
        .position(|m| *m == wanted)
        .map(|idx| idx as u32 + 1)
        .unwrap_or(1)
}

fn is_year_header(line: &str) -> bool {
    line.len() == 4 && line.chars().all(|c| c.is_ascii_digit())
}

/// Parse the whole log. Lines that cannot be attributed are skipped with a warning.
pub fn parse_history_log(text: &str) -> Vec<LogEntry> {
    let mut current_year: Option<i32> = None;
    let mut entries = Vec::new();

    for (line_no, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if is_year_header(line) {
            current_year = line.parse().ok();
            continue;
        }

        let Some(caps) = entry_pattern().captures(line) else {
            warn!("History log line {}: unrecognised format: {}", line_no + 1, line);
            continue;
        };

        let Some(year) = current_year else {
            warn!("History log line {}: entry before any year header: {}", line_no + 1, line);
            continue;
        };

        let person = match caps[2].parse::<Person>() {
            Ok(person) => person,
            Err(e) => {
                warn!("History log line {}: {}", line_no + 1, e);
                continue;
            }
        };

        let title = anniversary_prefix().replace(caps[1].trim(), "").trim().to_string();
        if title.is_empty() {
            warn!("History log line {}: empty title", line_no + 1);
            continue;
        }

        entries.push(LogEntry {
            title,
            person,
            year,
            month: parse_finnish_month(&caps[3]),
        });
    }

    entries
}

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::TallyError;
use crate::NOT_AVAILABLE;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElapsedTime(u64);

impl ElapsedTime {
    pub fn from_secs(secs: u64) -> Self {
        ElapsedTime(secs)
    }

    pub fn as_secs(self) -> u64 {
        self.0
    }

    pub fn checked_add(self, other: ElapsedTime) -> Option<ElapsedTime> {
        self.0.checked_add(other.0).map(ElapsedTime)
    }
}

impl fmt::Display for ElapsedTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.0;
        write!(f, "{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

impl FromStr for ElapsedTime {
    type Err = TallyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || TallyError::MalformedTime(s.to_string());
        let mut parts = s.split(':');
        let (Some(hours), Some(minutes), Some(seconds), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed());
        };

        let hours = parse_field(hours).ok_or_else(malformed)?;
        let minutes = parse_field(minutes).ok_or_else(malformed)?;
        let seconds = parse_field(seconds).ok_or_else(malformed)?;

        hours
            .checked_mul(3600)
            .and_then(|total| total.checked_add(minutes.checked_mul(60)?))
            .and_then(|total| total.checked_add(seconds))
            .map(ElapsedTime)
            .ok_or_else(malformed)
    }
}

fn parse_field(text: &str) -> Option<u64> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

fn full_pattern() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"\b\d{1,9}:\d{2}:\d{2}\b")
            .expect("Invalid regex pattern - this is a programming error")
    })
}

fn minutes_pattern() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"\b(\d{1,2}):(\d{2})\b")
            .expect("Invalid regex pattern - this is a programming error")
    })
}

fn seconds_pattern() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"\b(\d{1,9})s\b")
            .expect("Invalid regex pattern - this is a programming error")
    })
}

/// Normalize free-form elapsed-time text to `h:mm:ss`.
///
/// Patterns are tried in order `h:mm:ss`, then `m:ss`/`mm:ss`, then a bare
/// second count such as `42s`; the first that matches wins. Text matching none
/// of them becomes `"N/A"`.
pub fn normalize(raw: &str) -> String {
    let raw = raw.trim();

    if let Some(found) = full_pattern().find(raw) {
        return found.as_str().to_string();
    }

    if let Some(caps) = minutes_pattern().captures(raw) {
        return format!("0:{:0>2}:{}", &caps[1], &caps[2]);
    }

    if let Some(secs) = seconds_pattern()
        .captures(raw)
        .and_then(|caps| caps[1].parse::<u64>().ok())
    {
        return to_canonical(secs);
    }

    NOT_AVAILABLE.to_string()
}

/// Anything other than `"N/A"` or strict `h:mm:ss` is a [`TallyError::MalformedTime`].
pub fn to_seconds(canonical: &str) -> Result<Option<u64>, TallyError> {
    if canonical == NOT_AVAILABLE {
        return Ok(None);
    }
    canonical.parse::<ElapsedTime>().map(|t| Some(t.as_secs()))
}

pub fn to_canonical(total_seconds: u64) -> String {
    ElapsedTime::from_secs(total_seconds).to_string()
}

//! Repeat rules and the next-occurrence calculator.
//!
//! A rule is parsed once from its textual form (`"d <n>"` or `"y"`) into a
//! [`RepeatRule`]; the evaluator then only deals with typed values.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, NaiveDate};

use crate::dates;
use crate::errors::RuleError;

/// Upper bound for the daily interval. Caps the stepping loop for stale dates.
pub const MAX_DAY_INTERVAL: u32 = 400;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RepeatRule {
    /// Every `interval` days, `1..=MAX_DAY_INTERVAL`.
    Daily { interval: u32 },
    /// One year per step. A step from Feb 29 lands on Mar 1 in common years,
    /// and the date stays on Mar 1 from then on.
    Yearly,
}

impl RepeatRule {
    /// Advance `start` by whole rule steps until the result is strictly after
    /// `now`. A start already after `now` is returned unchanged.
    pub fn next_after(&self, start: NaiveDate, now: NaiveDate) -> Result<NaiveDate, RuleError> {
        if start > now {
            return Ok(start);
        }

        let next = match *self {
            Self::Daily { interval } => {
                let step = Days::new(u64::from(interval));
                let mut date = start;
                loop {
                    date = date.checked_add_days(step).ok_or(RuleError::OutOfRange)?;
                    if date > now {
                        break date;
                    }
                }
            }
            Self::Yearly => {
                let mut date = start;
                loop {
                    let year = date.year().checked_add(1).ok_or(RuleError::OutOfRange)?;
                    date = NaiveDate::from_ymd_opt(year, date.month(), date.day())
                        // only Feb 29 can miss; a common year takes Mar 1
                        .or_else(|| NaiveDate::from_ymd_opt(year, 3, 1))
                        .ok_or(RuleError::OutOfRange)?;
                    if date > now {
                        break date;
                    }
                }
            }
        };

        if !dates::is_encodable(next) {
            return Err(RuleError::OutOfRange);
        }
        Ok(next)
    }
}

impl fmt::Display for RepeatRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily { interval } => write!(f, "d {interval}"),
            Self::Yearly => f.write_str("y"),
        }
    }
}

impl FromStr for RepeatRule {
    type Err = RuleError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        if text.is_empty() {
            return Err(RuleError::EmptyRule);
        }

        let mut tokens = text.split(' ');
        let kind = tokens.next().unwrap_or_default();
        let args: Vec<&str> = tokens.collect();

        match kind {
            "d" => {
                let [raw] = args.as_slice() else {
                    return Err(RuleError::InvalidInterval(format!(
                        "expected `d <days>`, got `{text}`"
                    )));
                };
                let interval: i64 = raw
                    .parse()
                    .map_err(|_| RuleError::InvalidInterval(format!("not a number: {raw}")))?;
                if interval <= 0 || interval > i64::from(MAX_DAY_INTERVAL) {
                    return Err(RuleError::InvalidInterval(format!(
                        "{interval} is outside 1..={MAX_DAY_INTERVAL}"
                    )));
                }
                Ok(Self::Daily {
                    interval: interval as u32,
                })
            }
            "y" if args.is_empty() => Ok(Self::Yearly),
            _ => Err(RuleError::UnsupportedRule(text.to_string())),
        }
    }
}

/// Textual next-occurrence contract: `start_text` is `YYYYMMDD`, `rule_text`
/// a repeat rule, and the result is the next occurrence as `YYYYMMDD`.
pub fn next_date(now: NaiveDate, start_text: &str, rule_text: &str) -> Result<String, RuleError> {
    if rule_text.is_empty() {
        return Err(RuleError::EmptyRule);
    }
    let start = dates::parse_date(start_text)?;
    let rule: RepeatRule = rule_text.parse()?;
    let next = rule.next_after(start, now)?;
    Ok(dates::format_date(next))
}

/// serde adapter for `Option<RepeatRule>` carried as a string, `""` meaning
/// no recurrence.
pub mod text {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::RepeatRule;

    pub fn serialize<S: Serializer>(
        rule: &Option<RepeatRule>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match rule {
            Some(rule) => serializer.collect_str(rule),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<RepeatRule>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw.is_empty() {
            return Ok(None);
        }
        raw.parse().map(Some).map_err(serde::de::Error::custom)
    }
}

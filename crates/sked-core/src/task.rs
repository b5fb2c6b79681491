use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::dates;
use crate::ids::TaskId;
use crate::repeat::{self, RepeatRule};

/// A persisted task. `date` is always a valid calendar date and `repeat`
/// always a parsed rule, so a `Task` can never hold malformed data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    #[serde(with = "dates::yyyymmdd")]
    pub date: NaiveDate,
    pub title: String,
    pub comment: String,
    #[serde(with = "repeat::text")]
    pub repeat: Option<RepeatRule>,
}

/// Validated payload for inserting or replacing a task.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewTask {
    pub date: NaiveDate,
    pub title: String,
    pub comment: String,
    pub repeat: Option<RepeatRule>,
}

impl NewTask {
    pub fn with_id(self, id: TaskId) -> Task {
        Task {
            id,
            date: self.date,
            title: self.title,
            comment: self.comment,
            repeat: self.repeat,
        }
    }
}

/// Inbound task payload as submitted by a client, before validation.
/// Missing fields default to empty strings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TaskDraft {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    pub date: String,
    pub title: String,
    pub comment: String,
    pub repeat: String,
}

/// Accept a string, a number, or null.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => Ok(String::new()),
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

/// A task search: an exact date when the input is a `DD.MM.YYYY` literal,
/// otherwise a case-insensitive substring of title or comment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchQuery {
    Date(NaiveDate),
    Text(String),
}

impl SearchQuery {
    pub fn parse(input: &str) -> Self {
        match dates::parse_search_date(input) {
            Some(date) => Self::Date(date),
            None => Self::Text(input.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Task {
        Task {
            id: TaskId::from_raw(3),
            date: NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
            title: "Pay rent".into(),
            comment: String::new(),
            repeat: Some(RepeatRule::Daily { interval: 30 }),
        }
    }

    #[test]
    fn task_wire_shape() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": "3",
                "date": "20240615",
                "title": "Pay rent",
                "comment": "",
                "repeat": "d 30",
            })
        );
    }

    #[test]
    fn draft_defaults_missing_fields() {
        let draft: TaskDraft = serde_json::from_str(r#"{"title":"Walk"}"#).unwrap();
        assert_eq!(draft.title, "Walk");
        assert!(draft.id.is_empty());
        assert!(draft.date.is_empty());
        assert!(draft.repeat.is_empty());
    }

    #[test]
    fn draft_accepts_numeric_or_null_id() {
        let draft: TaskDraft = serde_json::from_str(r#"{"id":17,"title":"x"}"#).unwrap();
        assert_eq!(draft.id, "17");
        let draft: TaskDraft = serde_json::from_str(r#"{"id":null,"title":"x"}"#).unwrap();
        assert!(draft.id.is_empty());
        assert!(serde_json::from_str::<TaskDraft>(r#"{"id":[1]}"#).is_err());
    }

    #[test]
    fn new_task_with_id() {
        let task = sample();
        let new = NewTask {
            date: task.date,
            title: task.title.clone(),
            comment: task.comment.clone(),
            repeat: task.repeat,
        };
        assert_eq!(new.with_id(task.id), task);
    }

    #[test]
    fn search_query_detects_date_literal() {
        assert_eq!(
            SearchQuery::parse("15.06.2024"),
            SearchQuery::Date(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap())
        );
        assert_eq!(SearchQuery::parse("rent"), SearchQuery::Text("rent".into()));
        assert_eq!(
            SearchQuery::parse("15.13.2024"),
            SearchQuery::Text("15.13.2024".into())
        );
    }
}

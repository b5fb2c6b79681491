use std::sync::Arc;

use chrono::NaiveDate;
use sked_core::{dates, next_date, NewTask, RepeatRule, SearchQuery, Task, TaskDraft, TaskId};
use sked_store::TaskStore;
use tracing::{debug, info, instrument};

use crate::error::EngineError;

/// Result-count cap for listing and searching.
pub const DEFAULT_LIST_LIMIT: u32 = 50;

/// Source of "today". Injected so tests can pin the date.
pub type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

/// What marking a task done did to it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DoneOutcome {
    /// One-off task, removed.
    Deleted,
    /// Recurring task, moved to its next occurrence.
    Rescheduled(NaiveDate),
}

/// Validates task payloads, normalizes dates and drives the store.
pub struct TaskService {
    store: Arc<dyn TaskStore>,
    clock: Clock,
}

impl TaskService {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self {
            store,
            clock: Arc::new(dates::today),
        }
    }

    pub fn with_clock(mut self, clock: impl Fn() -> NaiveDate + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn today(&self) -> NaiveDate {
        (self.clock)()
    }

    #[instrument(skip(self, draft), fields(title = %draft.title))]
    pub fn create(&self, draft: &TaskDraft) -> Result<TaskId, EngineError> {
        let task = self.normalize(draft)?;
        let id = self.store.insert(&task)?;
        info!(task_id = %id, date = %task.date, "task created");
        Ok(id)
    }

    #[instrument(skip(self))]
    pub fn get(&self, id: &str) -> Result<Task, EngineError> {
        let id = parse_id(id)?;
        Ok(self.store.get(id)?)
    }

    /// Full replace of an existing task. Returns the normalized task as stored.
    #[instrument(skip(self, draft), fields(task_id = %draft.id))]
    pub fn update(&self, draft: &TaskDraft) -> Result<Task, EngineError> {
        let id = parse_id(&draft.id)?;
        let task = self.normalize(draft)?.with_id(id);
        self.store.update(&task)?;
        info!(task_id = %id, date = %task.date, "task updated");
        Ok(task)
    }

    #[instrument(skip(self))]
    pub fn delete(&self, id: &str) -> Result<(), EngineError> {
        let id = parse_id(id)?;
        self.store.delete(id)?;
        info!(task_id = %id, "task deleted");
        Ok(())
    }

    /// One-off tasks are deleted; recurring ones move to their next occurrence.
    #[instrument(skip(self))]
    pub fn mark_done(&self, id: &str) -> Result<DoneOutcome, EngineError> {
        let id = parse_id(id)?;
        let task = self.store.get(id)?;

        let Some(rule) = task.repeat else {
            self.store.delete(id)?;
            info!(task_id = %id, "one-off task done, deleted");
            return Ok(DoneOutcome::Deleted);
        };

        let next = rule.next_after(task.date, self.today())?;
        self.store.update_date(id, next)?;
        info!(task_id = %id, next = %next, rule = %rule, "recurring task rescheduled");
        Ok(DoneOutcome::Rescheduled(next))
    }

    pub fn list(&self, limit: u32) -> Result<Vec<Task>, EngineError> {
        Ok(self.store.list(limit)?)
    }

    /// Search by `DD.MM.YYYY` date or by substring. Blank input lists everything.
    #[instrument(skip(self))]
    pub fn search(&self, text: &str, limit: u32) -> Result<Vec<Task>, EngineError> {
        if text.trim().is_empty() {
            return self.list(limit);
        }
        let query = SearchQuery::parse(text);
        debug!(?query, "searching tasks");
        Ok(self.store.search(&query, limit)?)
    }

    /// Next occurrence for arbitrary inputs. A missing `now` means today.
    pub fn preview(&self, now: Option<&str>, date: &str, repeat: &str) -> Result<String, EngineError> {
        let now = match now.filter(|n| !n.is_empty()) {
            Some(raw) => dates::parse_date(raw)?,
            None => self.today(),
        };
        Ok(next_date(now, date, repeat)?)
    }

    /// Validate a draft and settle its date: empty means today, a past date
    /// becomes today (one-off) or the next occurrence (recurring).
    fn normalize(&self, draft: &TaskDraft) -> Result<NewTask, EngineError> {
        if draft.title.trim().is_empty() {
            return Err(EngineError::MissingTitle);
        }

        let today = self.today();
        let date = if draft.date.is_empty() {
            today
        } else {
            dates::parse_date(&draft.date)?
        };

        let repeat: Option<RepeatRule> = if draft.repeat.is_empty() {
            None
        } else {
            Some(draft.repeat.parse()?)
        };

        let date = match repeat {
            _ if date >= today => date,
            None => today,
            Some(rule) => rule.next_after(date, today)?,
        };

        Ok(NewTask {
            date,
            title: draft.title.clone(),
            comment: draft.comment.clone(),
            repeat,
        })
    }
}

fn parse_id(raw: &str) -> Result<TaskId, EngineError> {
    if raw.trim().is_empty() {
        return Err(EngineError::MissingId);
    }
    raw.parse().map_err(|_| EngineError::InvalidId(raw.to_string()))
}

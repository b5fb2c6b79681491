pub mod dates;
pub mod errors;
pub mod ids;
pub mod repeat;
pub mod task;

pub use errors::RuleError;
pub use ids::TaskId;
pub use repeat::{next_date, RepeatRule, MAX_DAY_INTERVAL};
pub use task::{NewTask, SearchQuery, Task, TaskDraft};

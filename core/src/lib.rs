pub mod error;
pub mod model;
pub mod repository;
pub mod service;
pub mod time;

pub use error::ApiError;
pub use model::project::{Project, User, UserWithRight};
pub use model::task::{Bucket, Label, Task, TaskQuery, TaskReminder};
pub use repository::{AuthRepository, ProjectRepository, TaskRepository, UserRepository, VikunjaRepository};
pub use service::project_service::ProjectService;
pub use service::task_service::{rank_tasks, sort_tasks, DeleteReport, NewTask, TaskPatch, TaskService};
pub use service::urgency::{calculate_urgency, due_date_score, refresh_urgency};
pub use service::user_service::UserService;
pub use time::{parse_due_date, parse_duration, parse_offset, parse_timestamp};

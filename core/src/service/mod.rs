pub mod project_service;
pub mod task_service;
pub mod urgency;
pub mod user_service;

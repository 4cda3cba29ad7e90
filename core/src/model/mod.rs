pub mod project;
pub mod task;
pub mod zero_time;

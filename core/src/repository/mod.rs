pub mod traits;
pub mod vikunja;

// Re-export
pub use traits::{AuthRepository, ProjectRepository, TaskRepository, UserRepository};
pub use vikunja::VikunjaRepository;

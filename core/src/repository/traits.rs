use crate::model::project::{Project, User, UserWithRight};
use crate::model::task::{Task, TaskQuery};
use anyhow::Result;

pub trait AuthRepository {
    /// Exchange credentials for an API token.
    fn login(&self, username: &str, password: &str, totp_passcode: &str) -> Result<String>;
}

pub trait TaskRepository {
    fn list(&self, query: &TaskQuery) -> Result<Vec<Task>>;
    fn get(&self, id: i64) -> Result<Task>;
    fn create(&self, project_id: i64, task: &Task) -> Result<Task>;
    fn update(&self, id: i64, task: &Task) -> Result<Task>;
    fn delete(&self, id: i64) -> Result<()>;
    fn assign_user(&self, task_id: i64, user_id: i64) -> Result<()>;
    fn assignees(&self, task_id: i64) -> Result<Vec<User>>;
}

pub trait ProjectRepository {
    fn list(&self) -> Result<Vec<Project>>;
    fn get(&self, id: i64) -> Result<Project>;
    fn users(&self, project_id: i64) -> Result<Vec<UserWithRight>>;
    fn create(&self, project: &Project) -> Result<Project>;
    fn delete(&self, id: i64) -> Result<()>;
}

pub trait UserRepository {
    fn list(&self) -> Result<Vec<User>>;
}

use crate::model::project::{Project, UserWithRight};
use crate::repository::ProjectRepository;
use anyhow::{bail, Context, Result};

pub struct ProjectService<R: ProjectRepository> {
    repo: R,
}

impl<R: ProjectRepository> ProjectService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn list(&self) -> Result<Vec<Project>> {
        self.repo.list().context("failed to fetch projects")
    }

    pub fn get(&self, id: i64) -> Result<Project> {
        self.repo.get(id)
    }

    /// Users the project is shared with. The owner is not part of this list.
    pub fn users(&self, project_id: i64) -> Result<Vec<UserWithRight>> {
        self.repo.users(project_id)
    }

    pub fn create(&self, title: &str) -> Result<Project> {
        let title = title.trim();
        if title.is_empty() {
            bail!("title argument is required");
        }
        self.repo.create(&Project::new(title))
    }

    pub fn delete(&self, id: i64) -> Result<()> {
        self.repo.delete(id)
    }
}

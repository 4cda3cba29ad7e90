use crate::model::project::User;
use crate::repository::UserRepository;
use anyhow::{Context, Result};

pub struct UserService<R: UserRepository> {
    repo: R,
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn list(&self) -> Result<Vec<User>> {
        self.repo.list().context("failed to fetch users")
    }
}

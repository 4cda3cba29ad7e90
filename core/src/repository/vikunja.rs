use anyhow::Result;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, trace};

use crate::error::ApiError;
use crate::model::project::{Project, User, UserWithRight};
use crate::model::task::{Task, TaskQuery};
use crate::repository::traits::{AuthRepository, ProjectRepository, TaskRepository, UserRepository};

const USER_AGENT: &str = concat!("kunja/", env!("CARGO_PKG_VERSION"));

/// Blocking HTTP client for the Vikunja REST API.
///
/// Implements every repository trait, so one value can back all services.
/// Cloning is cheap and shares the connection pool.
#[derive(Clone, Debug)]
pub struct VikunjaRepository {
    http: Client,
    base_url: String,
    token: String,
}

impl VikunjaRepository {
    /// `base_url` is the API root, e.g. `https://tasks.example.com/api/v1`.
    /// An empty token is allowed for the login call.
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        let http = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn execute<F>(&self, method: Method, path: &str, build: F) -> crate::error::Result<String>
    where
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        let url = self.url(path);
        debug!("{} {}", method, url);

        let mut request = self.http.request(method, &url);
        if !self.token.is_empty() {
            request = request.bearer_auth(&self.token);
        }
        let response = build(request).send()?;
        let status = response.status();
        let body = response.text()?;
        trace!(status = status.as_u16(), body = %body, "response");

        if !status.is_success() {
            return Err(ApiError::from_status(status.as_u16(), &body));
        }
        Ok(body)
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> crate::error::Result<T> {
        let body = self.execute(Method::GET, path, |r| r)?;
        Ok(serde_json::from_str(&body)?)
    }

    fn send_json<B, T>(&self, method: Method, path: &str, payload: &B) -> crate::error::Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = self.execute(method, path, |r| r.json(payload))?;
        Ok(serde_json::from_str(&body)?)
    }
}

impl AuthRepository for VikunjaRepository {
    fn login(&self, username: &str, password: &str, totp_passcode: &str) -> Result<String> {
        let payload = json!({
            "username": username,
            "password": password,
            "totp_passcode": totp_passcode,
        });
        let response: serde_json::Value = self.send_json(Method::POST, "/login", &payload)?;
        match response.get("token").and_then(|t| t.as_str()) {
            Some(token) => Ok(token.to_string()),
            None => {
                debug!("login response without token: {}", response);
                Err(ApiError::MissingToken.into())
            }
        }
    }
}

impl TaskRepository for VikunjaRepository {
    fn list(&self, query: &TaskQuery) -> Result<Vec<Task>> {
        let body = self.execute(Method::GET, "/tasks/all", |r| r.query(query))?;
        Ok(serde_json::from_str(&body).map_err(ApiError::from)?)
    }

    fn get(&self, id: i64) -> Result<Task> {
        let path = format!("/tasks/{}?include=project,label_objects,assignees", id);
        Ok(self.get_json(&path)?)
    }

    fn create(&self, project_id: i64, task: &Task) -> Result<Task> {
        let path = format!("/projects/{}/tasks", project_id);
        Ok(self.send_json(Method::PUT, &path, task)?)
    }

    fn update(&self, id: i64, task: &Task) -> Result<Task> {
        Ok(self.send_json(Method::POST, &format!("/tasks/{}", id), task)?)
    }

    fn delete(&self, id: i64) -> Result<()> {
        self.execute(Method::DELETE, &format!("/tasks/{}", id), |r| r)?;
        Ok(())
    }

    fn assign_user(&self, task_id: i64, user_id: i64) -> Result<()> {
        let path = format!("/tasks/{}/assignees", task_id);
        let payload = json!({ "user_id": user_id });
        self.execute(Method::PUT, &path, |r| r.json(&payload))?;
        Ok(())
    }

    fn assignees(&self, task_id: i64) -> Result<Vec<User>> {
        Ok(self.get_json(&format!("/tasks/{}/assignees", task_id))?)
    }
}

impl ProjectRepository for VikunjaRepository {
    fn list(&self) -> Result<Vec<Project>> {
        Ok(self.get_json("/projects")?)
    }

    fn get(&self, id: i64) -> Result<Project> {
        Ok(self.get_json(&format!("/projects/{}", id))?)
    }

    fn users(&self, project_id: i64) -> Result<Vec<UserWithRight>> {
        Ok(self.get_json(&format!("/projects/{}/users", project_id))?)
    }

    fn create(&self, project: &Project) -> Result<Project> {
        Ok(self.send_json(Method::PUT, "/projects", project)?)
    }

    fn delete(&self, id: i64) -> Result<()> {
        self.execute(Method::DELETE, &format!("/projects/{}", id), |r| r)?;
        Ok(())
    }
}

impl UserRepository for VikunjaRepository {
    fn list(&self) -> Result<Vec<User>> {
        Ok(self.get_json("/users?include=details")?)
    }
}

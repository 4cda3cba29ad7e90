//! Operations shared by the command line and the MCP tools.
//!
//! Everything here returns the text to show, so callers only decide where
//! it goes.

use anyhow::{bail, Context, Result};
use kunja_core::{
    parse_due_date, NewTask, ProjectRepository, ProjectService, TaskPatch, TaskRepository, TaskService,
    UserService, VikunjaRepository,
};
use std::fmt::Write as _;

use crate::config::Config;
use crate::render;

pub const NO_TOKEN: &str = "No token found – please run `kunja login` first.";

/// Services wired to one remote API client.
pub struct Services {
    pub tasks: TaskService<VikunjaRepository>,
    pub projects: ProjectService<VikunjaRepository>,
    pub users: UserService<VikunjaRepository>,
}

impl Services {
    pub fn connect(config: &Config) -> Result<Self> {
        if config.token.is_empty() {
            bail!(NO_TOKEN);
        }
        if config.base_url.is_empty() {
            bail!("No base URL configured – pass --baseurl or run `kunja config set base_url <url>`.");
        }
        let repo = VikunjaRepository::new(&config.base_url, &config.token)?;
        Ok(Self {
            tasks: TaskService::new(repo.clone()),
            projects: ProjectService::new(repo.clone()),
            users: UserService::new(repo),
        })
    }
}

/// Ranked task list as text, or every task as JSON when `verbose`.
pub fn task_list<R: TaskRepository>(tasks: &TaskService<R>, verbose: bool, show_all: bool) -> Result<String> {
    if verbose {
        return render::pretty_json(&tasks.list_all()?);
    }
    let ranked = tasks.list_ranked(show_all)?;
    Ok(render::task_list(&ranked))
}

pub fn project_list<R: ProjectRepository>(projects: &ProjectService<R>, verbose: bool, colored: bool) -> Result<String> {
    let list = projects.list()?;
    if verbose {
        return render::pretty_json(&list);
    }
    Ok(render::project_table(&list, colored))
}

pub fn create_project<R: ProjectRepository>(projects: &ProjectService<R>, title: &str) -> Result<String> {
    let project = projects.create(title)?;
    Ok(format!("Project created: {} – {}", project.id, project.title))
}

pub fn create_task<R: TaskRepository>(tasks: &TaskService<R>, title: &str, due: Option<&str>, project_id: i64) -> Result<String> {
    let due_date = match due.map(str::trim).filter(|d| !d.is_empty()) {
        Some(raw) => Some(parse_due_date(raw).with_context(|| format!("invalid due date {:?}", raw))?),
        None => None,
    };
    let created = tasks.create_task(NewTask {
        title: title.to_string(),
        due_date,
        project_id,
    })?;
    Ok(format!("Task created successfully: {}", created.id))
}

pub fn toggle_done<R: TaskRepository>(tasks: &TaskService<R>, id: i64) -> Result<String> {
    let task = tasks.toggle_done(id)?;
    Ok(if task.done {
        "Task marked as done successfully".to_string()
    } else {
        "Task marked as not done successfully".to_string()
    })
}

/// Field values for a non-interactive edit. Blank strings count as absent.
#[derive(Debug, Default, Clone)]
pub struct EditArgs<'a> {
    pub title: Option<&'a str>,
    pub description: Option<&'a str>,
    pub due: Option<&'a str>,
    pub project_id: Option<i64>,
}

impl EditArgs<'_> {
    pub fn to_patch(&self) -> Result<TaskPatch> {
        let non_blank = |v: Option<&str>| v.filter(|s| !s.trim().is_empty()).map(str::to_string);
        let due_date = match non_blank(self.due) {
            Some(raw) => Some(parse_due_date(&raw).with_context(|| format!("invalid due date {:?}", raw))?),
            None => None,
        };
        Ok(TaskPatch {
            title: non_blank(self.title),
            description: non_blank(self.description),
            due_date,
            project_id: self.project_id.filter(|id| *id > 0),
        })
    }
}

pub fn edit_task<R: TaskRepository>(tasks: &TaskService<R>, id: i64, patch: &TaskPatch) -> Result<String> {
    tasks.edit_task(id, patch)?;
    Ok("Task updated successfully".to_string())
}

/// Parse `"12, 34,56"` into ids. Blank entries are skipped.
pub fn parse_id_list(raw: &str) -> Result<Vec<i64>> {
    let mut ids = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let id = part.parse().with_context(|| format!("invalid task ID: {:?}", part))?;
        ids.push(id);
    }
    if ids.is_empty() {
        bail!("no task IDs given");
    }
    Ok(ids)
}

/// Delete every id and summarise which ones went through.
pub fn delete_tasks<R: TaskRepository>(tasks: &TaskService<R>, raw_ids: &str) -> Result<String> {
    let ids = parse_id_list(raw_ids)?;
    let report = tasks.delete_tasks(&ids);

    let mut out = String::new();
    if !report.deleted.is_empty() {
        let deleted: Vec<String> = report.deleted.iter().map(i64::to_string).collect();
        let _ = writeln!(out, "Deleted: {}", deleted.join(", "));
    }
    if !report.failed.is_empty() {
        let failed: Vec<String> = report.failed.iter().map(|(id, e)| format!("{} ({})", id, e)).collect();
        let _ = writeln!(out, "Failed: {}", failed.join(", "));
    }
    Ok(out.trim_end().to_string())
}

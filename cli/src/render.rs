use anyhow::Result;
use chrono::{Local, TimeZone};
use kunja_core::{Project, Task, User, UserWithRight};
use serde::Serialize;
use std::fmt::Write as _;
use tabled::settings::object::Rows;
use tabled::settings::{Color, Modify, Style};
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct ProjectRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Fav")]
    favorite: String,
}

/// One block per task, dates shown in local time.
pub fn task_list(tasks: &[Task]) -> String {
    task_list_in(tasks, &Local)
}

pub fn task_list_in<Tz: TimeZone>(tasks: &[Task], tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let mut out = String::new();
    for task in tasks {
        let _ = writeln!(out, "{}:  {} (Urgency: {:.3})", task.id, task.title, task.urgency);
        if !task.description.is_empty() {
            let _ = writeln!(out, "    Description: {}", task.description);
        }
        if let Some(due) = task.due_date {
            let _ = writeln!(out, "    Due Date: {}", due.with_timezone(tz).format("%Y-%m-%d"));
        }
        if let Some(done_at) = task.done_at {
            let _ = writeln!(out, "    Done At: {}", done_at.with_timezone(tz).format("%Y-%m-%d %H:%M:%S"));
        }
    }
    out
}

pub fn project_table(projects: &[Project], colored: bool) -> String {
    if projects.is_empty() {
        return "No projects found.\n".to_string();
    }

    let rows: Vec<ProjectRow> = projects
        .iter()
        .map(|p| ProjectRow {
            id: p.id,
            title: p.title.clone(),
            favorite: if p.is_favorite { "★".to_string() } else { String::new() },
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::modern());
    if colored {
        table.with(Modify::new(Rows::first()).with(Color::FG_CYAN));
    }
    format!("{}\n", table)
}

pub fn user_list(users: &[User]) -> String {
    let mut out = String::new();
    for user in users {
        let _ = writeln!(out, "ID: {}, Username: {}, Name: {}", user.id, user.username, user.name);
    }
    out
}

pub fn project_users(project: &Project, users: &[UserWithRight]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Owner: {} (ID: {})", project.owner.username, project.owner.id);
    for user in users {
        let _ = writeln!(out, "User: {} (ID: {}, Right: {})", user.username, user.id, user.right);
    }
    out
}

/// Indented JSON with a trailing newline.
pub fn pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(format!("{}\n", serde_json::to_string_pretty(value)?))
}

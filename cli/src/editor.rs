use anyhow::{bail, Context, Result};
use kunja_core::{parse_due_date, Project, Task};
use std::fs;
use std::io::{BufRead, Write};
use std::process::Command;

const EDIT_FIELDS: [&str; 4] = ["Title", "Description", "Due Date", "Save"];

/// Open `initial` in `$EDITOR` (default `vi`) and return what was saved.
pub fn edit_in_editor(initial: &str) -> Result<String> {
    let editor = std::env::var("EDITOR")
        .ok()
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| "vi".to_string());

    let mut file = tempfile::Builder::new().prefix("kunja-").suffix(".txt").tempfile()?;
    file.write_all(initial.as_bytes())?;
    file.flush()?;

    // EDITOR may carry arguments, e.g. "code --wait"
    let mut parts = editor.split_whitespace();
    let program = parts.next().unwrap_or("vi");
    let status = Command::new(program)
        .args(parts)
        .arg(file.path())
        .status()
        .with_context(|| format!("failed to launch editor {:?}", editor))?;
    if !status.success() {
        bail!("editor exited with {}", status);
    }

    let content = fs::read_to_string(file.path())?;
    Ok(strip_comments(&content))
}

/// Drop lines whose first non-blank character is `#`, and trailing newlines.
pub fn strip_comments(content: &str) -> String {
    let kept: Vec<&str> = content
        .split('\n')
        .filter(|line| !line.trim_start().starts_with('#'))
        .collect();
    kept.join("\n").trim_end_matches(['\n', '\r']).to_string()
}

/// Show a numbered menu and return the index picked.
pub fn choose<R: BufRead, W: Write>(input: &mut R, output: &mut W, message: &str, options: &[String]) -> Result<usize> {
    loop {
        writeln!(output, "{}", message)?;
        for (i, option) in options.iter().enumerate() {
            writeln!(output, "  {}) {}", i + 1, option)?;
        }
        write!(output, "> ")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            bail!("no selection made");
        }
        match line.trim().parse::<usize>() {
            Ok(n) if (1..=options.len()).contains(&n) => return Ok(n - 1),
            _ => writeln!(output, "Please enter a number between 1 and {}.", options.len())?,
        }
    }
}

pub fn prompt_line<R: BufRead, W: Write>(input: &mut R, output: &mut W, message: &str) -> Result<String> {
    write!(output, "{} ", message)?;
    output.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

pub fn pick_project<R: BufRead, W: Write>(input: &mut R, output: &mut W, projects: &[Project]) -> Result<i64> {
    if projects.is_empty() {
        bail!("no projects available, create one with `kunja project-new`");
    }
    let options: Vec<String> = projects.iter().map(|p| format!("{} (ID: {})", p.title, p.id)).collect();
    let index = choose(input, output, "Select project:", &options)?;
    Ok(projects[index].id)
}

/// Field menu for `kunja edit ID` without flags. Loops until "Save".
/// Text fields go through `edit`, the due date is typed at the prompt.
pub fn edit_task_interactively<R, W, E>(task: &mut Task, input: &mut R, output: &mut W, mut edit: E) -> Result<()>
where
    R: BufRead,
    W: Write,
    E: FnMut(&str) -> Result<String>,
{
    let options: Vec<String> = EDIT_FIELDS.iter().map(|f| f.to_string()).collect();
    loop {
        match choose(input, output, "Choose a field to edit:", &options)? {
            0 => match edit(&task.title) {
                Ok(title) => task.title = title,
                Err(e) => writeln!(output, "Error editing title: {}", e)?,
            },
            1 => match edit(&task.description) {
                Ok(description) => task.description = description,
                Err(e) => writeln!(output, "Error editing description: {}", e)?,
            },
            2 => {
                let raw = prompt_line(input, output, "Enter new due date (YYYY-MM-DD):")?;
                if raw.is_empty() {
                    continue;
                }
                match parse_due_date(&raw) {
                    Ok(due) => task.due_date = Some(due),
                    Err(e) => writeln!(output, "Error parsing due date: {}", e)?,
                }
            }
            _ => return Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::io::Cursor;

    #[test]
    fn test_strip_comments() {
        let content = "Buy milk\n# the title\n  # indented comment\nsecond line\n\n";
        assert_eq!(strip_comments(content), "Buy milk\nsecond line");
    }

    #[test]
    fn test_choose_retries_until_valid() {
        let mut input = Cursor::new("9\nabc\n2\n");
        let mut output = Vec::new();
        let options = vec!["a".to_string(), "b".to_string()];

        let index = choose(&mut input, &mut output, "Pick:", &options).unwrap();

        assert_eq!(index, 1);
        let shown = String::from_utf8(output).unwrap();
        assert_eq!(shown.matches("Please enter a number").count(), 2);
    }

    #[test]
    fn test_choose_fails_on_eof() {
        let mut input = Cursor::new("");
        let mut output = Vec::new();
        assert!(choose(&mut input, &mut output, "Pick:", &["a".to_string()]).is_err());
    }

    #[test]
    fn test_pick_project_returns_id() {
        let mut garden = Project::new("Garden");
        garden.id = 3;
        let mut inbox = Project::new("Inbox");
        inbox.id = 1;
        let mut input = Cursor::new("1\n");
        let mut output = Vec::new();

        assert_eq!(pick_project(&mut input, &mut output, &[garden, inbox]).unwrap(), 3);
    }

    #[test]
    fn test_interactive_edit_updates_fields() {
        let mut task = Task { id: 5, title: "old".into(), ..Task::default() };
        // title, then due date, then save
        let mut input = Cursor::new("1\n3\n2025-06-01\n4\n");
        let mut output = Vec::new();

        edit_task_interactively(&mut task, &mut input, &mut output, |current| Ok(format!("{} renamed", current))).unwrap();

        assert_eq!(task.title, "old renamed");
        assert_eq!(task.due_date, Some(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_interactive_edit_keeps_going_after_bad_date() {
        let mut task = Task::default();
        let mut input = Cursor::new("3\nnot a date\n4\n");
        let mut output = Vec::new();

        edit_task_interactively(&mut task, &mut input, &mut output, |s| Ok(s.to_string())).unwrap();

        assert_eq!(task.due_date, None);
        assert!(String::from_utf8(output).unwrap().contains("Error parsing due date"));
    }
}

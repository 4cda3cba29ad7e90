//! MCP server for kunja
//!
//! Exposes the task commands and a handful of date/time helpers as Model
//! Context Protocol tools over stdio, so an assistant can read and update
//! the task list.
//!
//! Every tool that talks to the server builds a fresh client from the
//! configuration and runs it on the blocking pool.

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Duration, FixedOffset, Local, SecondsFormat};
use mcp_attr::server::{mcp_server, serve_stdio, McpServer};
use mcp_attr::ErrorCode;
use kunja_core::time::{parse_duration, parse_offset, parse_timestamp, time_diff, DiffUnit};

use crate::actions::{self, EditArgs, Services};
use crate::config::Config;

/// Name and description of every tool, for `kunja mcp --list-tools`.
pub const TOOLS: &[(&str, &str)] = &[
    ("ping", "Return «pong» – verifies that the MCP server is alive."),
    ("echo", "Echo back the supplied text argument."),
    ("sum", "Return the sum of two integers."),
    ("list", "List tasks sorted by urgency. Only open tasks unless all=true."),
    ("new", "Create a new task in a project."),
    ("projects", "List projects; verbose=true returns raw JSON."),
    ("createproject", "Create a new project."),
    ("done", "Toggle the done status of a task."),
    ("delete", "Delete one or more tasks by ID."),
    ("edit", "Edit a task (title, description, due date or project)."),
    ("now", "Return the current date and time in RFC 3339 format."),
    ("time_add", "Add a duration to a timestamp. Defaults to now."),
    ("time_sub", "Subtract a duration from a timestamp. Defaults to now."),
    ("time_diff", "Difference between two timestamps. Returns a number (default seconds)."),
    ("time_convert", "Convert a timestamp to another UTC offset."),
    ("timecalc", "Compatibility wrapper for time calculations (prefer time_add, time_sub, time_diff, time_convert)."),
];

pub fn tool_catalogue() -> String {
    let mut out = String::from("Run kunja as an MCP server over stdio.\nAvailable tools:\n");
    for (name, description) in TOOLS {
        out.push_str(&format!("  {}  –  {}\n", name, description));
    }
    out
}

pub struct KunjaMcpServer {
    config: Config,
}

impl KunjaMcpServer {
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    /// Connect and run `f` on the blocking pool.
    async fn with_services<T, F>(&self, f: F) -> mcp_attr::Result<T>
    where
        F: FnOnce(&Services) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let config = self.config.clone();
        let joined = tokio::task::spawn_blocking(move || {
            let services = Services::connect(&config)?;
            f(&services)
        })
        .await;

        match joined {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                tracing::warn!("tool call failed: {:#}", e);
                Err(internal_error(format!("{:#}", e)))
            }
            Err(e) => Err(internal_error(format!("tool call aborted: {}", e))),
        }
    }
}

fn internal_error(msg: String) -> mcp_attr::Error {
    mcp_attr::Error::new(ErrorCode::INTERNAL_ERROR).with_message(msg, true)
}

fn invalid_params(msg: String) -> mcp_attr::Error {
    mcp_attr::Error::new(ErrorCode::INVALID_PARAMS).with_message(msg, true)
}

#[mcp_server]
impl McpServer for KunjaMcpServer {
    /// Return «pong» – verifies that the MCP server is alive.
    #[tool]
    async fn ping(&self) -> mcp_attr::Result<String> {
        Ok("pong".to_string())
    }

    /// Echo back the supplied text argument.
    #[tool]
    async fn echo(
        &self,
        /// text to echo
        text: String,
    ) -> mcp_attr::Result<String> {
        Ok(text)
    }

    /// Return the sum of two integers.
    #[tool]
    async fn sum(&self, a: i64, b: i64) -> mcp_attr::Result<String> {
        Ok(a.saturating_add(b).to_string())
    }

    /// List tasks sorted by urgency.
    ///
    /// By default only open tasks are returned; set all=true if you also want
    /// to see completed (done) tasks.
    #[tool]
    async fn list(
        &self,
        /// include done tasks – use only if you also want to see completed tasks
        all: Option<bool>,
        /// return raw JSON instead of text
        verbose: Option<bool>,
    ) -> mcp_attr::Result<String> {
        let show_all = all.unwrap_or(false);
        let verbose = verbose.unwrap_or(false);
        self.with_services(move |svc| actions::task_list(&svc.tasks, verbose, show_all))
            .await
    }

    /// Create a new task in a project.
    #[tool]
    async fn new(
        &self,
        /// task title
        title: String,
        /// project ID
        project: i64,
        /// due date, YYYY-MM-DD or forms like tomorrow, fri, +3d
        due: Option<String>,
    ) -> mcp_attr::Result<String> {
        if project <= 0 {
            return Err(invalid_params("project argument is required".to_string()));
        }
        self.with_services(move |svc| actions::create_task(&svc.tasks, &title, due.as_deref(), project))
            .await
    }

    /// List projects; verbose=true returns raw JSON.
    #[tool]
    async fn projects(
        &self,
        /// raw JSON output
        verbose: Option<bool>,
    ) -> mcp_attr::Result<String> {
        let verbose = verbose.unwrap_or(false);
        self.with_services(move |svc| actions::project_list(&svc.projects, verbose, false))
            .await
    }

    /// Create a new project.
    #[tool]
    async fn createproject(
        &self,
        /// project title
        title: String,
    ) -> mcp_attr::Result<String> {
        if title.trim().is_empty() {
            return Err(invalid_params("title argument is required".to_string()));
        }
        self.with_services(move |svc| actions::create_project(&svc.projects, &title))
            .await
    }

    /// Toggle the done status of a task.
    #[tool]
    async fn done(
        &self,
        /// task ID
        id: i64,
    ) -> mcp_attr::Result<String> {
        self.with_services(move |svc| actions::toggle_done(&svc.tasks, id)).await
    }

    /// Delete one or more tasks by ID.
    #[tool]
    async fn delete(
        &self,
        /// comma-separated list of task IDs (e.g. "12,34,56")
        ids: String,
    ) -> mcp_attr::Result<String> {
        if let Err(e) = actions::parse_id_list(&ids) {
            return Err(invalid_params(e.to_string()));
        }
        self.with_services(move |svc| actions::delete_tasks(&svc.tasks, &ids)).await
    }

    /// Edit a task (title, description, due date or project).
    #[tool]
    async fn edit(
        &self,
        /// task ID
        id: i64,
        /// new title
        title: Option<String>,
        /// new description
        description: Option<String>,
        /// new due date YYYY-MM-DD
        due: Option<String>,
        /// new project ID
        project: Option<i64>,
    ) -> mcp_attr::Result<String> {
        let args = EditArgs {
            title: title.as_deref(),
            description: description.as_deref(),
            due: due.as_deref(),
            project_id: project,
        };
        let patch = args.to_patch().map_err(|e| invalid_params(format!("{:#}", e)))?;
        if patch.is_empty() {
            return Err(invalid_params(
                "provide at least one of title, description, due or project".to_string(),
            ));
        }
        self.with_services(move |svc| actions::edit_task(&svc.tasks, id, &patch)).await
    }

    /// Return the current date and time in RFC 3339 format.
    ///
    /// Call this tool any time you need to calculate a relative date or time
    /// such as 'tomorrow' or 'in three days'.
    #[tool]
    async fn now(&self) -> mcp_attr::Result<String> {
        Ok(format_rfc3339(&Local::now().fixed_offset()))
    }

    /// Add a duration to a timestamp. Defaults to now.
    #[tool]
    async fn time_add(
        &self,
        /// RFC3339, YYYY-MM-DD, 'now', or unix seconds/ms
        ts: Option<String>,
        seconds: Option<f64>,
        minutes: Option<f64>,
        hours: Option<f64>,
        days: Option<f64>,
        /// duration such as 2h30m, P1DT30M or '2 hours'
        dur: Option<String>,
    ) -> mcp_attr::Result<String> {
        let amount = DurationArgs { seconds, minutes, hours, days, dur };
        shift_timestamp(ts.as_deref().unwrap_or(""), &amount, 1).map_err(|e| invalid_params(e.to_string()))
    }

    /// Subtract a duration from a timestamp. Defaults to now.
    #[tool]
    async fn time_sub(
        &self,
        /// RFC3339, YYYY-MM-DD, 'now', or unix seconds/ms
        ts: Option<String>,
        seconds: Option<f64>,
        minutes: Option<f64>,
        hours: Option<f64>,
        days: Option<f64>,
        /// duration such as 2h30m, P1DT30M or '2 hours'
        dur: Option<String>,
    ) -> mcp_attr::Result<String> {
        let amount = DurationArgs { seconds, minutes, hours, days, dur };
        shift_timestamp(ts.as_deref().unwrap_or(""), &amount, -1).map_err(|e| invalid_params(e.to_string()))
    }

    /// Difference between two timestamps. Returns a number (default seconds).
    #[tool]
    async fn time_diff(
        &self,
        /// RFC3339, YYYY-MM-DD, 'now', or unix seconds/ms
        ts: String,
        /// RFC3339, YYYY-MM-DD, or unix epoch
        ts2: String,
        /// seconds|minutes|hours|days (default: seconds)
        unit: Option<String>,
    ) -> mcp_attr::Result<String> {
        diff_timestamps(&ts, &ts2, unit.as_deref().unwrap_or("")).map_err(|e| invalid_params(e.to_string()))
    }

    /// Convert a timestamp to another UTC offset.
    #[tool]
    async fn time_convert(
        &self,
        /// RFC3339, YYYY-MM-DD, or unix epoch
        ts: String,
        /// target zone: UTC, local or an offset such as +02:00
        to_tz: String,
        /// interpret a naive ts in this zone
        from_tz: Option<String>,
    ) -> mcp_attr::Result<String> {
        convert_timestamp(&ts, &to_tz, from_tz.as_deref()).map_err(|e| invalid_params(e.to_string()))
    }

    /// Compatibility wrapper for time calculations (prefer time_add, time_sub,
    /// time_diff, time_convert).
    #[tool]
    async fn timecalc(
        &self,
        /// add|plus|+ / sub|minus|- / diff|delta / convert|tz
        op: String,
        /// base timestamp; defaults to 'now' for add/sub
        ts: Option<String>,
        /// duration for add/sub
        dur: Option<String>,
        /// second timestamp for diff
        ts2: Option<String>,
        /// target zone for convert
        to_tz: Option<String>,
        /// interpret a naive ts in this zone
        from_tz: Option<String>,
        /// unit for diff
        unit: Option<String>,
        seconds: Option<f64>,
        minutes: Option<f64>,
        hours: Option<f64>,
        days: Option<f64>,
    ) -> mcp_attr::Result<String> {
        let request = TimeCalc {
            op,
            ts: ts.unwrap_or_default(),
            ts2: ts2.unwrap_or_default(),
            to_tz: to_tz.unwrap_or_default(),
            from_tz,
            unit: unit.unwrap_or_default(),
            amount: DurationArgs { seconds, minutes, hours, days, dur },
        };
        request.run().map_err(|e| invalid_params(e.to_string()))
    }
}

/// Build the server and serve it on stdin/stdout until the client leaves.
pub async fn start_server(config: Config) -> Result<()> {
    tracing::info!("Starting kunja MCP server");
    let server = KunjaMcpServer::from_config(config);
    serve_stdio(server).await?;
    Ok(())
}

// Time helpers

/// A duration given either as numeric fields or as a string.
#[derive(Debug, Default, Clone)]
pub struct DurationArgs {
    pub seconds: Option<f64>,
    pub minutes: Option<f64>,
    pub hours: Option<f64>,
    pub days: Option<f64>,
    pub dur: Option<String>,
}

impl DurationArgs {
    /// Numeric fields win when they add up to something positive.
    pub fn resolve(&self) -> Result<Duration> {
        let total = self.seconds.unwrap_or(0.0)
            + self.minutes.unwrap_or(0.0) * 60.0
            + self.hours.unwrap_or(0.0) * 3600.0
            + self.days.unwrap_or(0.0) * 86_400.0;
        if !total.is_finite() {
            bail!("duration out of range");
        }
        if total > 0.0 {
            let ms = (total * 1000.0).round();
            if ms >= i64::MAX as f64 {
                bail!("duration out of range");
            }
            return Duration::try_milliseconds(ms as i64).ok_or_else(|| anyhow!("duration out of range"));
        }

        match self.dur.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            Some(dur) => parse_duration(dur),
            None => bail!("no duration provided"),
        }
    }
}

fn format_rfc3339(dt: &DateTime<FixedOffset>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn shift_timestamp(ts: &str, amount: &DurationArgs, sign: i32) -> Result<String> {
    let base = parse_timestamp(ts, None)?;
    let delta = amount.resolve()?;
    let shifted = if sign < 0 {
        base.checked_sub_signed(delta)
    } else {
        base.checked_add_signed(delta)
    };
    let shifted = shifted.ok_or_else(|| anyhow!("timestamp out of range"))?;
    Ok(format_rfc3339(&shifted))
}

/// `ts2 - ts` in `unit`, rounded to a whole number.
pub fn diff_timestamps(ts: &str, ts2: &str, unit: &str) -> Result<String> {
    let from = parse_timestamp(ts, None)?;
    let to = parse_timestamp(ts2, None)?;
    Ok(format!("{:.0}", time_diff(&from, &to, DiffUnit::parse(unit))))
}

pub fn convert_timestamp(ts: &str, to_tz: &str, from_tz: Option<&str>) -> Result<String> {
    let from = match from_tz.map(str::trim).filter(|z| !z.is_empty()) {
        Some(zone) => Some(parse_offset(zone)?),
        None => None,
    };
    let dt = parse_timestamp(ts, from)?;
    let target = parse_offset(to_tz)?;
    Ok(format_rfc3339(&dt.with_timezone(&target)))
}

struct TimeCalc {
    op: String,
    ts: String,
    ts2: String,
    to_tz: String,
    from_tz: Option<String>,
    unit: String,
    amount: DurationArgs,
}

impl TimeCalc {
    fn run(&self) -> Result<String> {
        match self.op.trim().to_lowercase().as_str() {
            "add" | "plus" | "+" => shift_timestamp(&self.ts, &self.amount, 1),
            "sub" | "minus" | "-" => shift_timestamp(&self.ts, &self.amount, -1),
            "diff" | "delta" => diff_timestamps(&self.ts, &self.ts2, &self.unit),
            "convert" | "tz" => convert_timestamp(&self.ts, &self.to_tz, self.from_tz.as_deref()),
            other => Err(anyhow!("unknown op: {} (use add/sub/diff/convert)", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hours(h: f64) -> DurationArgs {
        DurationArgs { hours: Some(h), ..DurationArgs::default() }
    }

    #[test]
    fn test_numeric_fields_beat_dur_string() {
        let amount = DurationArgs { minutes: Some(30.0), dur: Some("5h".into()), ..DurationArgs::default() };
        assert_eq!(amount.resolve().unwrap(), Duration::minutes(30));
    }

    #[test]
    fn test_dur_string_forms() {
        let amount = DurationArgs { dur: Some("P1DT30M".into()), ..DurationArgs::default() };
        assert_eq!(amount.resolve().unwrap(), Duration::days(1) + Duration::minutes(30));
        assert!(DurationArgs::default().resolve().is_err());
    }

    #[test]
    fn test_time_add_and_sub() {
        let ts = "2025-05-14T09:30:00Z";
        assert_eq!(shift_timestamp(ts, &hours(2.5), 1).unwrap(), "2025-05-14T12:00:00Z");
        assert_eq!(shift_timestamp(ts, &hours(10.0), -1).unwrap(), "2025-05-13T23:30:00Z");
    }

    #[test]
    fn test_out_of_range_shift_is_an_error() {
        let ts = "2025-01-01T00:00:00Z";
        let huge = DurationArgs { days: Some(1e12), ..DurationArgs::default() };
        assert!(shift_timestamp(ts, &huge, 1).is_err());
        assert!(shift_timestamp(ts, &huge, -1).is_err());

        let past_the_end = DurationArgs { days: Some(1e8), ..DurationArgs::default() };
        assert!(shift_timestamp(ts, &past_the_end, 1).unwrap_err().to_string().contains("out of range"));

        let dur = DurationArgs { dur: Some("P99999999999999W".into()), ..DurationArgs::default() };
        assert!(shift_timestamp(ts, &dur, 1).is_err());
    }

    #[test]
    fn test_non_finite_durations_are_rejected() {
        let inf = DurationArgs { hours: Some(f64::INFINITY), ..DurationArgs::default() };
        assert!(inf.resolve().is_err());
        let nan = DurationArgs { seconds: Some(f64::NAN), dur: Some("1h".into()), ..DurationArgs::default() };
        assert!(nan.resolve().is_err());
    }

    #[test]
    fn test_convert_rejects_garbled_offset() {
        assert!(convert_timestamp("2025-05-14T09:30:00Z", "+1é2", None).is_err());
        assert!(convert_timestamp("2025-05-14T09:30:00", "UTC", Some("+1é2")).is_err());
    }

    #[test]
    fn test_time_add_keeps_offset() {
        let out = shift_timestamp("2025-05-14T09:30:00+02:00", &hours(1.0), 1).unwrap();
        assert_eq!(out, "2025-05-14T10:30:00+02:00");
    }

    #[test]
    fn test_time_diff_units() {
        let a = "2025-05-14T00:00:00Z";
        let b = "2025-05-16T18:00:00Z";
        assert_eq!(diff_timestamps(a, b, "").unwrap(), "237600");
        assert_eq!(diff_timestamps(a, b, "hours").unwrap(), "66");
        assert_eq!(diff_timestamps(b, a, "d").unwrap(), "-3");
    }

    #[test]
    fn test_time_diff_accepts_unix_seconds() {
        assert_eq!(diff_timestamps("0", "3600", "minutes").unwrap(), "60");
    }

    #[test]
    fn test_convert_between_offsets() {
        let out = convert_timestamp("2025-05-14T09:30:00Z", "+02:00", None).unwrap();
        assert_eq!(out, "2025-05-14T11:30:00+02:00");

        let out = convert_timestamp("2025-05-14T09:30:00", "UTC", Some("-05:00")).unwrap();
        assert_eq!(out, "2025-05-14T14:30:00Z");

        assert!(convert_timestamp("2025-05-14T09:30:00Z", "Mars/Olympus", None).is_err());
    }

    #[test]
    fn test_timecalc_dispatch() {
        let calc = TimeCalc {
            op: "plus".into(),
            ts: "2025-05-14T09:30:00Z".into(),
            ts2: String::new(),
            to_tz: String::new(),
            from_tz: None,
            unit: String::new(),
            amount: DurationArgs { dur: Some("90min".into()), ..DurationArgs::default() },
        };
        assert_eq!(calc.run().unwrap(), "2025-05-14T11:00:00Z");

        let unknown = TimeCalc { op: "mul".into(), ..calc };
        assert!(unknown.run().unwrap_err().to_string().contains("unknown op"));
    }

    #[test]
    fn test_catalogue_lists_every_tool() {
        let out = tool_catalogue();
        for (name, _) in TOOLS {
            assert!(out.contains(&format!("  {}  –", name)));
        }
    }
}

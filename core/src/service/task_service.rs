use crate::model::project::User;
use crate::model::task::{Task, TaskQuery};
use crate::repository::TaskRepository;
use crate::service::urgency::refresh_urgency;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

/// Input for creating a task.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewTask {
    pub title: String,
    pub due_date: Option<DateTime<Utc>>,
    pub project_id: i64,
}

/// Fields to change on an existing task. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub project_id: Option<i64>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.due_date.is_none()
            && self.project_id.is_none()
    }

    pub fn apply(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(due) = self.due_date {
            task.due_date = Some(due);
        }
        if let Some(project_id) = self.project_id {
            task.project_id = project_id;
        }
    }
}

/// Outcome of a batch delete. One failing id does not stop the others.
#[derive(Debug, Default)]
pub struct DeleteReport {
    pub deleted: Vec<i64>,
    pub failed: Vec<(i64, anyhow::Error)>,
}

pub struct TaskService<R: TaskRepository> {
    repo: R,
}

impl<R: TaskRepository> TaskService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Every task, urgency filled in, in fetch order.
    pub fn list_all(&self) -> Result<Vec<Task>> {
        let mut tasks = self.repo.list(&TaskQuery::default()).context("failed to fetch tasks")?;
        let now = Utc::now();
        for task in &mut tasks {
            refresh_urgency(task, now);
        }
        Ok(tasks)
    }

    /// Tasks ready for display: open only unless `show_all`, most urgent first.
    pub fn list_ranked(&self, show_all: bool) -> Result<Vec<Task>> {
        let tasks = self.repo.list(&TaskQuery::default()).context("failed to fetch tasks")?;
        debug!("fetched {} tasks", tasks.len());
        Ok(rank_tasks(tasks, !show_all, Utc::now()))
    }

    pub fn get_task(&self, id: i64) -> Result<Task> {
        let mut task = self.repo.get(id)?;
        refresh_urgency(&mut task, Utc::now());
        Ok(task)
    }

    pub fn create_task(&self, new_task: NewTask) -> Result<Task> {
        if new_task.project_id == 0 {
            bail!("project ID must be provided (flag --project)");
        }
        let task = Task::new(new_task.title, new_task.project_id).with_due_date(new_task.due_date);
        self.repo.create(new_task.project_id, &task)
    }

    pub fn update_task(&self, task: &Task) -> Result<Task> {
        self.repo.update(task.id, task)
    }

    pub fn edit_task(&self, id: i64, patch: &TaskPatch) -> Result<Task> {
        if patch.is_empty() {
            bail!("provide at least one of title, description, due or project");
        }
        let mut task = self.repo.get(id)?;
        patch.apply(&mut task);
        self.repo.update(id, &task)
    }

    /// Flip the done flag and save. Returns the task as the server stored it.
    pub fn toggle_done(&self, id: i64) -> Result<Task> {
        let mut task = self.repo.get(id)?;
        task.done = !task.done;
        self.repo.update(id, &task)
    }

    pub fn delete_task(&self, id: i64) -> Result<()> {
        self.repo.delete(id)
    }

    pub fn delete_tasks(&self, ids: &[i64]) -> DeleteReport {
        let mut report = DeleteReport::default();
        for &id in ids {
            match self.repo.delete(id) {
                Ok(()) => report.deleted.push(id),
                Err(e) => {
                    warn!("failed to delete task {}: {}", id, e);
                    report.failed.push((id, e));
                }
            }
        }
        report
    }

    pub fn assignees(&self, task_id: i64) -> Result<Vec<User>> {
        self.repo.assignees(task_id)
    }

    pub fn assign_user(&self, task_id: i64, user_id: i64) -> Result<()> {
        self.repo.assign_user(task_id, user_id)
    }
}

// Standalone functions for pure logic

/// Drop done tasks when `open_only`, recompute every urgency against `now`,
/// then order by urgency (highest first) and id (highest first).
pub fn rank_tasks(tasks: Vec<Task>, open_only: bool, now: DateTime<Utc>) -> Vec<Task> {
    let mut tasks: Vec<Task> = tasks.into_iter().filter(|t| !open_only || !t.done).collect();
    for task in &mut tasks {
        refresh_urgency(task, now);
    }
    sort_tasks(&mut tasks);
    tasks
}

/// Order by the urgency already stored on each task.
pub fn sort_tasks(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| b.urgency.total_cmp(&a.urgency).then_with(|| b.id.cmp(&a.id)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::cell::RefCell;
    use std::collections::HashSet;

    #[derive(Default)]
    struct MockTaskRepo {
        tasks: Vec<Task>,
        fail_delete: HashSet<i64>,
        saved: RefCell<Vec<Task>>,
        deleted: RefCell<Vec<i64>>,
    }

    impl TaskRepository for MockTaskRepo {
        fn list(&self, _query: &TaskQuery) -> Result<Vec<Task>> { Ok(self.tasks.clone()) }
        fn get(&self, id: i64) -> Result<Task> {
            self.tasks
                .iter()
                .find(|t| t.id == id)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("status code: 404, message: The task does not exist."))
        }
        fn create(&self, _project_id: i64, task: &Task) -> Result<Task> {
            let mut created = task.clone();
            created.id = 100;
            self.saved.borrow_mut().push(created.clone());
            Ok(created)
        }
        fn update(&self, id: i64, task: &Task) -> Result<Task> {
            assert_eq!(id, task.id);
            self.saved.borrow_mut().push(task.clone());
            Ok(task.clone())
        }
        fn delete(&self, id: i64) -> Result<()> {
            if self.fail_delete.contains(&id) {
                bail!("status code: 403, message: Forbidden");
            }
            self.deleted.borrow_mut().push(id);
            Ok(())
        }
        fn assign_user(&self, _task_id: i64, _user_id: i64) -> Result<()> { Ok(()) }
        fn assignees(&self, _task_id: i64) -> Result<Vec<User>> { Ok(vec![]) }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 14, 9, 30, 0).unwrap()
    }

    fn task(id: i64, priority: i64, done: bool) -> Task {
        Task {
            id,
            title: format!("task {}", id),
            priority,
            done,
            ..Task::default()
        }
    }

    #[test]
    fn test_ties_break_on_id_descending() {
        // ids 1 and 2 score 7.0, id 3 scores 8.0; stale urgency is ignored
        let mut tasks = vec![task(1, 6, false), task(2, 6, false), task(3, 7, false)];
        tasks[0].urgency = -5.0;

        let ranked = rank_tasks(tasks, true, now());
        let ids: Vec<i64> = ranked.iter().map(|t| t.id).collect();

        assert_eq!(ids, vec![3, 2, 1]);
        assert_eq!(ranked[0].urgency, 8.0);
        assert_eq!(ranked[2].urgency, 7.0);
    }

    #[test]
    fn test_sort_on_stored_urgency() {
        let mut tasks = vec![task(1, 0, false), task(2, 0, false), task(3, 0, false)];
        tasks[0].urgency = 7.0;
        tasks[1].urgency = 7.0;
        tasks[2].urgency = 8.0;

        sort_tasks(&mut tasks);

        let ids: Vec<i64> = tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn test_open_only_drops_done_tasks() {
        let tasks = vec![task(1, 0, true), task(2, 0, false)];

        let open = rank_tasks(tasks.clone(), true, now());
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, 2);

        let all = rank_tasks(tasks, false, now());
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].id, 1);
        assert_eq!(all[1].urgency, 0.0);
    }

    #[test]
    fn test_ranking_is_a_total_order() {
        let mut tasks = Vec::new();
        for id in 1..=30 {
            let mut t = task(id, id % 4, id % 7 == 0);
            t.is_favorite = id % 3 == 0;
            t.due_date = Some(now() + Duration::days((id % 20) - 3));
            tasks.push(t);
        }

        let ranked = rank_tasks(tasks, false, now());

        for pair in ranked.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(a.urgency > b.urgency || (a.urgency == b.urgency && a.id > b.id));
        }
    }

    #[test]
    fn test_done_tasks_sink_below_open_ones() {
        let mut overdue_done = task(9, 9, true);
        overdue_done.due_date = Some(now() - Duration::days(2));
        let mut someday = task(1, 0, false);
        someday.due_date = Some(now() + Duration::days(30));

        let ranked = rank_tasks(vec![overdue_done, someday, task(2, 0, false)], false, now());
        let ids: Vec<i64> = ranked.iter().map(|t| t.id).collect();

        // the someday task ties with the done one at 0.0
        assert_eq!(ids, vec![2, 9, 1]);
    }

    #[test]
    fn test_create_requires_project() {
        let service = TaskService::new(MockTaskRepo::default());
        let err = service.create_task(NewTask { title: "x".into(), ..NewTask::default() }).unwrap_err();
        assert!(err.to_string().contains("project ID must be provided"));
    }

    #[test]
    fn test_create_passes_title_and_due() {
        let service = TaskService::new(MockTaskRepo::default());
        let due = Some(now());

        let created = service
            .create_task(NewTask { title: "Buy milk".into(), due_date: due, project_id: 4 })
            .unwrap();

        assert_eq!(created.id, 100);
        assert_eq!(created.project_id, 4);
        assert_eq!(created.due_date, due);
    }

    #[test]
    fn test_toggle_done_flips_flag() {
        let repo = MockTaskRepo { tasks: vec![task(5, 1, false)], ..MockTaskRepo::default() };
        let service = TaskService::new(repo);

        let updated = service.toggle_done(5).unwrap();
        assert!(updated.done);
    }

    #[test]
    fn test_edit_applies_only_given_fields() {
        let mut existing = task(5, 1, false);
        existing.description = "keep me".into();
        let repo = MockTaskRepo { tasks: vec![existing], ..MockTaskRepo::default() };
        let service = TaskService::new(repo);

        let patch = TaskPatch { title: Some("renamed".into()), ..TaskPatch::default() };
        let updated = service.edit_task(5, &patch).unwrap();

        assert_eq!(updated.title, "renamed");
        assert_eq!(updated.description, "keep me");
    }

    #[test]
    fn test_edit_rejects_empty_patch() {
        let repo = MockTaskRepo { tasks: vec![task(5, 1, false)], ..MockTaskRepo::default() };
        let service = TaskService::new(repo);
        assert!(service.edit_task(5, &TaskPatch::default()).is_err());
    }

    #[test]
    fn test_delete_tasks_reports_each_id() {
        let repo = MockTaskRepo {
            fail_delete: HashSet::from([34]),
            ..MockTaskRepo::default()
        };
        let service = TaskService::new(repo);

        let report = service.delete_tasks(&[12, 34, 56]);

        assert_eq!(report.deleted, vec![12, 56]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, 34);
    }

    #[test]
    fn test_get_task_fills_urgency() {
        let repo = MockTaskRepo { tasks: vec![task(5, 4, false)], ..MockTaskRepo::default() };
        let service = TaskService::new(repo);
        assert_eq!(service.get_task(5).unwrap().urgency, 5.0);
    }
}

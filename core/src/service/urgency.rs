use chrono::{DateTime, Utc};

use crate::model::task::Task;

// Unfinished tasks start here so they always rank above done ones (which
// score exactly 0), even with no due date, no priority and no favorite.
const BASE_URGENCY: f64 = 1.0;
const FAVORITE_BONUS: f64 = 1.0;

// Pure logic

pub fn calculate_urgency(task: &Task, now: DateTime<Utc>) -> f64 {
    if task.done {
        return 0.0;
    }

    let due_score = due_date_score(task.due_date, now) as f64;
    let priority_score = task.priority as f64;
    let favorite_score = if task.is_favorite { FAVORITE_BONUS } else { 0.0 };

    BASE_URGENCY + due_score + priority_score + favorite_score
}

/// Recompute and store the transient urgency of a task.
pub fn refresh_urgency(task: &mut Task, now: DateTime<Utc>) {
    task.urgency = calculate_urgency(task, now);
}

/// Step score for the days left until `due`.
///
/// Days are the fractional hours until due divided by 24 and truncated
/// toward zero, so a task 11.5 hours overdue still counts as due today.
/// 11 to 14 days out scores 0 and anything further is -1 ("someday").
pub fn due_date_score(due: Option<DateTime<Utc>>, now: DateTime<Utc>) -> i64 {
    let Some(due) = due else {
        return 0;
    };

    match due_days(due, now) {
        d if d < 0 => 6,
        0 => 5,
        1 => 4,
        2 => 3,
        3..=5 => 2,
        6..=10 => 1,
        d if d > 14 => -1,
        _ => 0,
    }
}

fn due_days(due: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let hours = (due - now).num_milliseconds() as f64 / 3_600_000.0;
    (hours / 24.0) as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 14, 9, 30, 0).unwrap()
    }

    fn open_task(due: Option<DateTime<Utc>>, priority: i64, favorite: bool) -> Task {
        Task {
            id: 1,
            due_date: due,
            priority,
            is_favorite: favorite,
            ..Task::default()
        }
    }

    #[test]
    fn test_done_task_scores_zero() {
        let mut task = open_task(Some(now() - Duration::days(1)), 9, true);
        task.done = true;
        assert_eq!(calculate_urgency(&task, now()), 0.0);
    }

    #[test]
    fn test_baseline_open_task_scores_one() {
        assert_eq!(calculate_urgency(&open_task(None, 0, false), now()), 1.0);
    }

    #[test]
    fn test_overdue_by_a_day() {
        let task = open_task(Some(now() - Duration::days(1)), 0, false);
        assert_eq!(calculate_urgency(&task, now()), 7.0);
    }

    #[test]
    fn test_due_in_two_days_with_priority_and_favorite() {
        let task = open_task(Some(now() + Duration::days(2)), 3, true);
        assert_eq!(calculate_urgency(&task, now()), 8.0);
    }

    #[test]
    fn test_no_due_date_with_priority() {
        assert_eq!(calculate_urgency(&open_task(None, 5, false), now()), 6.0);
    }

    #[test]
    fn test_someday_band_cancels_base() {
        let task = open_task(Some(now() + Duration::days(20)), 0, false);
        assert_eq!(calculate_urgency(&task, now()), 0.0);
    }

    #[test]
    fn test_due_date_score_table() {
        let cases = [
            (-30, 6),
            (-1, 6),
            (0, 5),
            (1, 4),
            (2, 3),
            (3, 2),
            (5, 2),
            (6, 1),
            (10, 1),
            (11, 0),
            (14, 0),
            (15, -1),
            (365, -1),
        ];
        for (days, expected) in cases {
            let due = now() + Duration::days(days);
            assert_eq!(due_date_score(Some(due), now()), expected, "{} days", days);
        }
        assert_eq!(due_date_score(None, now()), 0);
    }

    #[test]
    fn test_day_count_truncates_toward_zero() {
        // 11.5 hours overdue is still "today"
        let due = now() - Duration::minutes(11 * 60 + 30);
        assert_eq!(due_date_score(Some(due), now()), 5);

        // one minute short of a full day overdue, still "today"
        let due = now() - Duration::minutes(24 * 60 - 1);
        assert_eq!(due_date_score(Some(due), now()), 5);

        // exactly 24 hours overdue
        let due = now() - Duration::hours(24);
        assert_eq!(due_date_score(Some(due), now()), 6);

        // 47h59m ahead counts as one day
        let due = now() + Duration::minutes(48 * 60 - 1);
        assert_eq!(due_date_score(Some(due), now()), 4);
    }

    #[test]
    fn test_favorite_adds_exactly_one() {
        for due in [None, Some(now() + Duration::days(4))] {
            let plain = calculate_urgency(&open_task(due, 2, false), now());
            let fav = calculate_urgency(&open_task(due, 2, true), now());
            assert_eq!(fav - plain, 1.0);
        }
    }

    #[test]
    fn test_priority_is_added_raw() {
        let due = Some(now() + Duration::days(7));
        for priority in 0..5 {
            let lower = calculate_urgency(&open_task(due, priority, false), now());
            let higher = calculate_urgency(&open_task(due, priority + 1, false), now());
            assert_eq!(higher - lower, 1.0);
        }
    }

    #[test]
    fn test_score_never_drops_approaching_due_below_two_weeks() {
        let mut previous = due_date_score(Some(now() + Duration::days(14)), now());
        for days in (-3..14).rev() {
            let score = due_date_score(Some(now() + Duration::days(days)), now());
            assert!(score >= previous, "{} days: {} < {}", days, score, previous);
            previous = score;
        }
    }

    #[test]
    fn test_open_tasks_always_outrank_done_ones() {
        let open = open_task(None, 0, false);
        let mut done = open_task(Some(now() - Duration::days(3)), 5, true);
        done.done = true;
        assert!(calculate_urgency(&open, now()) > calculate_urgency(&done, now()));
    }

    #[test]
    fn test_refresh_overwrites_stale_urgency() {
        let mut task = open_task(None, 2, false);
        task.urgency = 42.0;
        refresh_urgency(&mut task, now());
        assert_eq!(task.urgency, 3.0);
    }
}

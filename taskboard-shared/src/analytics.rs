/// Task analytics aggregation
///
/// Loads the role-scoped task set with assignee identities resolved, then
/// computes every statistic in a single pass over the rows:
///
/// - total task count
/// - counts by status (`Pending`, `In Progress`, `Completed` buckets only;
///   anything else is counted in the total but lands in no bucket)
/// - counts by priority (`Low`, `Medium`, `High`)
/// - overdue count (due date in the past and not `Completed`)
/// - due-soon count (due within the next 24 hours, exclusive lower bound,
///   inclusive upper bound)
/// - a per-username leaderboard of assigned/completed counts, included only
///   for elevated roles
///
/// # Example
///
/// ```
/// use taskboard_shared::analytics::{aggregate, TaskSnapshot};
/// use chrono::Utc;
///
/// let rows = vec![TaskSnapshot {
///     status: "Pending".to_string(),
///     priority: "High".to_string(),
///     due_date: None,
///     assignee_username: Some("alice".to_string()),
/// }];
///
/// let stats = aggregate(&rows, Utc::now(), true);
/// assert_eq!(stats.total_tasks, 1);
/// assert_eq!(stats.tasks_by_status.pending, 1);
/// ```

use crate::policy::TaskScope;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::BTreeMap;

/// The projection of a task that analytics needs
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TaskSnapshot {
    /// Status as stored
    pub status: String,

    /// Priority as stored
    pub priority: String,

    /// Optional due date
    pub due_date: Option<DateTime<Utc>>,

    /// Username of the assignee, when the reference resolved
    pub assignee_username: Option<String>,
}

/// Counts per known status bucket
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    #[serde(rename = "Pending")]
    pub pending: u64,

    #[serde(rename = "In Progress")]
    pub in_progress: u64,

    #[serde(rename = "Completed")]
    pub completed: u64,
}

/// Counts per priority
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityCounts {
    #[serde(rename = "Low")]
    pub low: u64,

    #[serde(rename = "Medium")]
    pub medium: u64,

    #[serde(rename = "High")]
    pub high: u64,
}

/// Per-username leaderboard entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// Tasks assigned to this user in the visible set
    pub total: u64,

    /// Of those, how many are completed
    pub completed: u64,
}

/// Aggregated analytics response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskAnalytics {
    pub total_tasks: u64,

    pub tasks_by_status: StatusCounts,

    pub tasks_by_priority: PriorityCounts,

    pub overdue_tasks: u64,

    pub tasks_due_soon: u64,

    /// Present only for Admin and Manager; omitted entirely otherwise
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_leaderboard: Option<BTreeMap<String, LeaderboardEntry>>,
}

/// Aggregates a task set into analytics counters in one pass
///
/// `now` is injected so the overdue/due-soon boundaries are deterministic
/// under test. The leaderboard accumulates only rows whose assignee
/// resolved, and is dropped from the result unless `include_leaderboard`.
pub fn aggregate(
    rows: &[TaskSnapshot],
    now: DateTime<Utc>,
    include_leaderboard: bool,
) -> TaskAnalytics {
    let due_soon_cutoff = now + Duration::hours(24);

    let mut by_status = StatusCounts::default();
    let mut by_priority = PriorityCounts::default();
    let mut overdue = 0u64;
    let mut due_soon = 0u64;
    let mut leaderboard: BTreeMap<String, LeaderboardEntry> = BTreeMap::new();

    for row in rows {
        match row.status.as_str() {
            "Pending" => by_status.pending += 1,
            "In Progress" => by_status.in_progress += 1,
            "Completed" => by_status.completed += 1,
            // No bucket for anything else; still counted in the total.
            _ => {}
        }

        match row.priority.as_str() {
            "Low" => by_priority.low += 1,
            "Medium" => by_priority.medium += 1,
            "High" => by_priority.high += 1,
            _ => {}
        }

        if let Some(due) = row.due_date {
            if due < now && row.status != "Completed" {
                overdue += 1;
            }
            if due > now && due <= due_soon_cutoff {
                due_soon += 1;
            }
        }

        if let Some(ref username) = row.assignee_username {
            let entry = leaderboard.entry(username.clone()).or_default();
            entry.total += 1;
            if row.status == "Completed" {
                entry.completed += 1;
            }
        }
    }

    TaskAnalytics {
        total_tasks: rows.len() as u64,
        tasks_by_status: by_status,
        tasks_by_priority: by_priority,
        overdue_tasks: overdue,
        tasks_due_soon: due_soon,
        user_leaderboard: include_leaderboard.then_some(leaderboard),
    }
}

/// Loads the analytics projection for every task in scope
///
/// The assignee is resolved with a left join so a dangling reference simply
/// yields no username instead of dropping the row.
pub async fn load_rows(pool: &PgPool, scope: &TaskScope) -> Result<Vec<TaskSnapshot>, sqlx::Error> {
    let mut query = String::from(
        "SELECT t.status, t.priority, t.due_date, a.username AS assignee_username \
         FROM tasks t \
         LEFT JOIN users a ON a.id = t.assigned_to \
         WHERE TRUE",
    );

    match scope {
        TaskScope::All => {}
        TaskScope::AssignedTo(_) => {
            query.push_str(" AND t.assigned_to = $1");
        }
        TaskScope::CreatedOrAssigned(_) => {
            query.push_str(" AND (t.created_by = $1 OR t.assigned_to = $2)");
        }
    }

    let mut q = sqlx::query_as::<_, TaskSnapshot>(&query);
    for id in scope.user_ids() {
        q = q.bind(id);
    }

    q.fetch_all(pool).await
}

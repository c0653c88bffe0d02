/// Task model and database operations
///
/// This module provides the Task model: the single mutable document of the
/// system. Every task references the user it is assigned to and the user
/// who created it; both references must exist at creation time and are not
/// re-validated afterwards.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(255) NOT NULL,
///     description TEXT,
///     due_date TIMESTAMPTZ,
///     priority TEXT NOT NULL DEFAULT 'Medium',
///     status TEXT NOT NULL DEFAULT 'Pending',
///     assigned_to UUID NOT NULL REFERENCES users(id),
///     created_by UUID NOT NULL REFERENCES users(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::models::task::{Task, CreateTask, TaskPriority};
/// use taskboard_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example(assignee: Uuid, creator: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::from_env()?).await?;
///
/// let task = Task::create(&pool, CreateTask {
///     title: "Ship release".to_string(),
///     description: None,
///     due_date: None,
///     priority: Some(TaskPriority::High),
///     assigned_to: assignee,
///     created_by: creator,
/// }).await?;
/// # Ok(())
/// # }
/// ```

use crate::policy::TaskScope;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl TaskPriority {
    /// Converts priority to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "Low",
            TaskPriority::Medium => "Medium",
            TaskPriority::High => "High",
        }
    }

    /// Parses priority from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Low" => Some(TaskPriority::Low),
            "Medium" => Some(TaskPriority::Medium),
            "High" => Some(TaskPriority::High),
            _ => None,
        }
    }
}

/// Task status
///
/// The two-word variant is spelled exactly "In Progress" on the wire and in
/// the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Pending,

    #[serde(rename = "In Progress")]
    InProgress,

    Completed,

    Overdue,
}

impl TaskStatus {
    /// Converts status to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Completed => "Completed",
            TaskStatus::Overdue => "Overdue",
        }
    }

    /// Parses status from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(TaskStatus::Pending),
            "In Progress" => Some(TaskStatus::InProgress),
            "Completed" => Some(TaskStatus::Completed),
            "Overdue" => Some(TaskStatus::Overdue),
            _ => None,
        }
    }
}

/// Task model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique task ID
    pub id: Uuid,

    /// Task title
    pub title: String,

    /// Optional free-text description
    pub description: Option<String>,

    /// Optional due date
    pub due_date: Option<DateTime<Utc>>,

    /// Priority as stored ("Low", "Medium", or "High")
    pub priority: String,

    /// Status as stored ("Pending", "In Progress", "Completed", or "Overdue")
    pub status: String,

    /// User the task is assigned to
    pub assigned_to: Uuid,

    /// User who created the task
    pub created_by: Uuid,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last updated
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Gets the parsed status enum
    pub fn get_status(&self) -> Option<TaskStatus> {
        TaskStatus::from_str(&self.status)
    }

    /// Gets the parsed priority enum
    pub fn get_priority(&self) -> Option<TaskPriority> {
        TaskPriority::from_str(&self.priority)
    }
}

/// Input for creating a new task
///
/// There is deliberately no status field: new tasks always start as
/// `Pending` no matter what the caller sends.
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Uuid,
    pub created_by: Uuid,
}

/// Input for partially updating a task
///
/// All fields are optional. Only non-None fields are written; absent fields
/// keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    pub assigned_to: Option<Uuid>,
}

/// Caller-supplied list filters, combined with the role scope by AND
#[derive(Debug, Clone, Default)]
pub struct TaskFilters {
    /// Exact status match
    pub status: Option<String>,

    /// Exact priority match
    pub priority: Option<String>,

    /// Case-insensitive substring search over title and description
    pub search: Option<String>,

    /// Inclusive lower due-date bound
    pub due_date_from: Option<DateTime<Utc>>,

    /// Inclusive upper due-date bound
    pub due_date_to: Option<DateTime<Utc>>,

    /// Sort field (camelCase API name, whitelisted)
    pub sort_by: Option<String>,

    /// "desc" for descending, anything else ascending
    pub sort_order: Option<String>,
}

/// Minimal user identity embedded in list responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRef {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

/// Task with both user references resolved, as returned by the list endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: String,
    pub status: String,
    pub assigned_to: UserRef,
    pub created_by: UserRef,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Flat row shape for the joined list query
#[derive(Debug, sqlx::FromRow)]
struct TaskViewRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    due_date: Option<DateTime<Utc>>,
    priority: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    assignee_id: Uuid,
    assignee_username: String,
    assignee_email: String,
    creator_id: Uuid,
    creator_username: String,
    creator_email: String,
}

impl From<TaskViewRow> for TaskView {
    fn from(row: TaskViewRow) -> Self {
        TaskView {
            id: row.id,
            title: row.title,
            description: row.description,
            due_date: row.due_date,
            priority: row.priority,
            status: row.status,
            assigned_to: UserRef {
                id: row.assignee_id,
                username: row.assignee_username,
                email: row.assignee_email,
            },
            created_by: UserRef {
                id: row.creator_id,
                username: row.creator_username,
                email: row.creator_email,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Maps an API sort field to its column, rejecting anything not whitelisted
///
/// Unknown fields fall back to None and the caller uses the default sort;
/// the field name is never interpolated into SQL directly.
pub fn sort_column(api_name: &str) -> Option<&'static str> {
    match api_name {
        "createdAt" => Some("created_at"),
        "updatedAt" => Some("updated_at"),
        "dueDate" => Some("due_date"),
        "priority" => Some("priority"),
        "status" => Some("status"),
        "title" => Some("title"),
        _ => None,
    }
}

const TASK_COLUMNS: &str = "id, title, description, due_date, priority, status, \
                            assigned_to, created_by, created_at, updated_at";

impl Task {
    /// Creates a new task
    ///
    /// Status always starts as `Pending`.
    ///
    /// # Errors
    ///
    /// Returns an error if either user reference violates its foreign key,
    /// or the database connection fails.
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let priority = data.priority.unwrap_or(TaskPriority::Medium);

        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (title, description, due_date, priority, status, assigned_to, created_by)
            VALUES ($1, $2, $3, $4, 'Pending', $5, $6)
            RETURNING id, title, description, due_date, priority, status,
                      assigned_to, created_by, created_at, updated_at
            "#,
        )
        .bind(data.title)
        .bind(data.description)
        .bind(data.due_date)
        .bind(priority.as_str())
        .bind(data.assigned_to)
        .bind(data.created_by)
        .fetch_one(pool)
        .await?;

        Ok(task)
    }

    /// Finds a task by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM tasks WHERE id = $1", TASK_COLUMNS);

        let task = sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(task)
    }

    /// Lists tasks matching a role scope and caller filters, sorted
    ///
    /// The scope condition and every caller filter are combined with AND.
    /// Both user references are resolved via joins. Returns the full
    /// matching set; there is no pagination.
    pub async fn search(
        pool: &PgPool,
        scope: &TaskScope,
        filters: &TaskFilters,
    ) -> Result<Vec<TaskView>, sqlx::Error> {
        let mut query = String::from(
            "SELECT t.id, t.title, t.description, t.due_date, t.priority, t.status, \
             t.created_at, t.updated_at, \
             a.id AS assignee_id, a.username AS assignee_username, a.email AS assignee_email, \
             c.id AS creator_id, c.username AS creator_username, c.email AS creator_email \
             FROM tasks t \
             JOIN users a ON a.id = t.assigned_to \
             JOIN users c ON c.id = t.created_by \
             WHERE TRUE",
        );
        let mut bind_count = 0;

        // Role scope first, caller filters after; every clause is ANDed.
        let scope_ids = scope.user_ids();
        match scope {
            TaskScope::All => {}
            TaskScope::AssignedTo(_) => {
                bind_count += 1;
                query.push_str(&format!(" AND t.assigned_to = ${}", bind_count));
            }
            TaskScope::CreatedOrAssigned(_) => {
                bind_count += 1;
                let creator_bind = bind_count;
                bind_count += 1;
                query.push_str(&format!(
                    " AND (t.created_by = ${} OR t.assigned_to = ${})",
                    creator_bind, bind_count
                ));
            }
        }

        if filters.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND t.status = ${}", bind_count));
        }
        if filters.priority.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND t.priority = ${}", bind_count));
        }
        if filters.search.is_some() {
            bind_count += 1;
            query.push_str(&format!(
                " AND (t.title ILIKE ${0} OR t.description ILIKE ${0})",
                bind_count
            ));
        }
        if filters.due_date_from.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND t.due_date >= ${}", bind_count));
        }
        if filters.due_date_to.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND t.due_date <= ${}", bind_count));
        }

        query.push_str(&order_clause(filters));

        let mut q = sqlx::query_as::<_, TaskViewRow>(&query);

        for id in scope_ids {
            q = q.bind(id);
        }
        if let Some(ref status) = filters.status {
            q = q.bind(status.clone());
        }
        if let Some(ref priority) = filters.priority {
            q = q.bind(priority.clone());
        }
        if let Some(ref search) = filters.search {
            q = q.bind(format!("%{}%", escape_like(search)));
        }
        if let Some(from) = filters.due_date_from {
            q = q.bind(from);
        }
        if let Some(to) = filters.due_date_to {
            q = q.bind(to);
        }

        let rows = q.fetch_all(pool).await?;

        Ok(rows.into_iter().map(TaskView::from).collect())
    }

    /// Applies a partial update to a task
    ///
    /// Only non-None fields are written; `updated_at` is always refreshed.
    ///
    /// # Returns
    ///
    /// The merged record if the task exists, None otherwise
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        // Build dynamic update query based on which fields are present
        let mut query = String::from("UPDATE tasks SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.title.is_some() {
            bind_count += 1;
            query.push_str(&format!(", title = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if data.due_date.is_some() {
            bind_count += 1;
            query.push_str(&format!(", due_date = ${}", bind_count));
        }
        if data.priority.is_some() {
            bind_count += 1;
            query.push_str(&format!(", priority = ${}", bind_count));
        }
        if data.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(", status = ${}", bind_count));
        }
        if data.assigned_to.is_some() {
            bind_count += 1;
            query.push_str(&format!(", assigned_to = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {}", TASK_COLUMNS));

        let mut q = sqlx::query_as::<_, Task>(&query).bind(id);

        if let Some(title) = data.title {
            q = q.bind(title);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(due_date) = data.due_date {
            q = q.bind(due_date);
        }
        if let Some(priority) = data.priority {
            q = q.bind(priority.as_str());
        }
        if let Some(status) = data.status {
            q = q.bind(status.as_str());
        }
        if let Some(assigned_to) = data.assigned_to {
            q = q.bind(assigned_to);
        }

        let task = q.fetch_optional(pool).await?;

        Ok(task)
    }

    /// Reassigns a task to a different user
    ///
    /// # Returns
    ///
    /// The updated task if found, None otherwise
    ///
    /// # Errors
    ///
    /// A well-formed but nonexistent target user surfaces as a foreign key
    /// violation.
    pub async fn reassign(
        pool: &PgPool,
        id: Uuid,
        assignee: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE tasks SET assigned_to = $2, updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            TASK_COLUMNS
        );

        let task = sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(assignee)
            .fetch_optional(pool)
            .await?;

        Ok(task)
    }

    /// Deletes a task by ID
    ///
    /// # Returns
    ///
    /// True if the task was deleted, false if it didn't exist
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Builds the ORDER BY clause from the caller's sort fields
///
/// Unknown sort fields fall back to the default (newest first).
fn order_clause(filters: &TaskFilters) -> String {
    match filters.sort_by.as_deref().and_then(sort_column) {
        Some(column) => {
            let direction = match filters.sort_order.as_deref() {
                Some("desc") => "DESC",
                _ => "ASC",
            };
            format!(" ORDER BY t.{} {}", column, direction)
        }
        None => " ORDER BY t.created_at DESC".to_string(),
    }
}

/// Escapes LIKE metacharacters so search terms match literally
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Role-based access policy
///
/// Pure mapping from (role, identity) to the visible task set and to
/// mutation permissions. Nothing here touches the database; callers render
/// the scope into a query and enforce the permission verdicts.
///
/// # Visibility
///
/// - `User` sees tasks assigned to them
/// - `Manager` sees tasks they created or are assigned to
/// - `Admin` sees everything
///
/// # Mutation
///
/// - update: Admin, or the task's assignee or creator
/// - delete: Admin, or the task's creator
/// - assign: Admin or Manager only
///
/// # Example
///
/// ```
/// use taskboard_shared::policy::{task_scope, TaskScope};
/// use taskboard_shared::models::user::Role;
/// use uuid::Uuid;
///
/// let me = Uuid::new_v4();
/// assert_eq!(task_scope(me, Role::Admin), TaskScope::All);
/// assert_eq!(task_scope(me, Role::User), TaskScope::AssignedTo(me));
/// ```

use crate::models::task::Task;
use crate::models::user::Role;
use uuid::Uuid;

/// The set of tasks a role is allowed to see
///
/// Combined with caller-supplied filters by logical AND.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskScope {
    /// Unrestricted (Admin)
    All,

    /// Tasks assigned to this user (User)
    AssignedTo(Uuid),

    /// Tasks created by or assigned to this user (Manager)
    CreatedOrAssigned(Uuid),
}

impl TaskScope {
    /// User IDs the scope binds into its query condition, in clause order
    pub fn user_ids(&self) -> Vec<Uuid> {
        match self {
            TaskScope::All => vec![],
            TaskScope::AssignedTo(id) => vec![*id],
            TaskScope::CreatedOrAssigned(id) => vec![*id, *id],
        }
    }

    /// Whether a task falls inside this scope
    pub fn contains(&self, task: &Task) -> bool {
        match self {
            TaskScope::All => true,
            TaskScope::AssignedTo(id) => task.assigned_to == *id,
            TaskScope::CreatedOrAssigned(id) => {
                task.created_by == *id || task.assigned_to == *id
            }
        }
    }
}

/// Builds the task visibility scope for a user
pub fn task_scope(user_id: Uuid, role: Role) -> TaskScope {
    match role {
        Role::Admin => TaskScope::All,
        Role::Manager => TaskScope::CreatedOrAssigned(user_id),
        Role::User => TaskScope::AssignedTo(user_id),
    }
}

/// A mutating task operation subject to permission checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Update,
    Delete,
    Assign,
}

/// Decides whether a user may perform a mutation on a task
///
/// The task passed in must be the stored record as it was before the
/// mutation: permission is always evaluated against the pre-mutation state,
/// even when the mutation itself changes the assignee.
pub fn can_mutate(role: Role, user_id: Uuid, task: &Task, op: Mutation) -> bool {
    if role == Role::Admin {
        return true;
    }

    match op {
        Mutation::Update => task.assigned_to == user_id || task.created_by == user_id,
        Mutation::Delete => task.created_by == user_id,
        Mutation::Assign => role == Role::Manager,
    }
}

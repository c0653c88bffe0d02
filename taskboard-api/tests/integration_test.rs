/// Integration tests for the Taskboard API
///
/// These tests verify the full system end-to-end against live PostgreSQL
/// and Redis: registration and login, role-filtered listing, permission
/// enforcement, cache invalidation, analytics aggregation, rate limiting,
/// and role administration.
///
/// All tests are ignored by default and expect DATABASE_URL, REDIS_URL,
/// and JWT_SECRET to point at disposable test services:
///
/// ```bash
/// cargo test -p taskboard-api -- --ignored
/// ```
///
/// The response cache is keyed by path+query only, so every test tags its
/// tasks with a unique search term and queries through it; that keeps both
/// the visible task set and the cache keys disjoint between tests.

mod common;

use axum::http::StatusCode;
use common::TestContext;
use serde_json::json;
use taskboard_shared::models::user::Role;
use uuid::Uuid;

fn tag() -> String {
    format!("tag-{}", Uuid::new_v4().simple())
}

/// Scenario: duplicate registration is rejected without a second record
#[tokio::test]
#[ignore] // Requires running PostgreSQL and Redis
async fn test_register_duplicate_email() {
    let ctx = TestContext::new().await.unwrap();
    let email = format!("dup-{}@example.com", Uuid::new_v4());

    let body = json!({ "username": "dup", "email": email, "password": "secret1" });

    let (status, response) = ctx
        .request("POST", "/auth/register", None, Some(body.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(response["token"].is_string());

    let (status, response) = ctx.request("POST", "/auth/register", None, Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["msg"], "User already exists");

    sqlx::query("DELETE FROM users WHERE email = $1")
        .bind(&email)
        .execute(&ctx.db)
        .await
        .unwrap();
}

/// Scenario: wrong password yields the generic credentials error
#[tokio::test]
#[ignore] // Requires running PostgreSQL and Redis
async fn test_login_invalid_credentials() {
    let ctx = TestContext::new().await.unwrap();
    let email = format!("login-{}@example.com", Uuid::new_v4());

    let (status, _) = ctx
        .request(
            "POST",
            "/auth/register",
            None,
            Some(json!({ "username": "login", "email": email, "password": "secret1" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, response) = ctx
        .request(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "email": email, "password": "wrong-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["msg"], "Invalid Credentials");

    // Unknown email gets the same answer.
    let (status, response) = ctx
        .request(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "email": format!("nobody-{}@example.com", Uuid::new_v4()), "password": "x" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["msg"], "Invalid Credentials");

    sqlx::query("DELETE FROM users WHERE email = $1")
        .bind(&email)
        .execute(&ctx.db)
        .await
        .unwrap();
}

/// Scenario: the 6th login attempt inside 5 minutes is rejected before the
/// credential check
#[tokio::test]
#[ignore] // Requires running PostgreSQL and Redis
async fn test_login_rate_limit() {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt as _;

    let ctx = TestContext::new().await.unwrap();
    // A unique forwarded address keeps this test's bucket to itself.
    let client_ip = format!("10.1.2.{}", rand_octet());

    let attempt = || {
        Request::builder()
            .method("POST")
            .uri("/auth/login")
            .header("content-type", "application/json")
            .header("x-forwarded-for", client_ip.clone())
            .body(Body::from(
                json!({ "email": "nobody@example.com", "password": "wrong" }).to_string(),
            ))
            .unwrap()
    };

    for _ in 0..5 {
        let response = ctx.app.clone().oneshot(attempt()).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let response = ctx.app.clone().oneshot(attempt()).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key("Retry-After"));
}

fn rand_octet() -> u8 {
    (Uuid::new_v4().as_u128() % 250) as u8
}

/// The profile endpoint never leaks the password hash
#[tokio::test]
#[ignore] // Requires running PostgreSQL and Redis
async fn test_profile_omits_password() {
    let mut ctx = TestContext::new().await.unwrap();
    let (user, token) = ctx.create_user(Role::User).await.unwrap();

    let (status, response) = ctx.request("GET", "/auth/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["id"], user.id.to_string());
    assert!(response.get("passwordHash").is_none());
    assert!(response.get("password_hash").is_none());

    // Without a token the endpoint is closed.
    let (status, _) = ctx.request("GET", "/auth/profile", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    ctx.cleanup().await.unwrap();
}

/// Scenario A: creation forces Pending even when the caller claims otherwise
#[tokio::test]
#[ignore] // Requires running PostgreSQL and Redis
async fn test_create_task_forces_pending_status() {
    let mut ctx = TestContext::new().await.unwrap();
    let (_, admin_token) = ctx.create_user(Role::Admin).await.unwrap();
    let (assignee, _) = ctx.create_user(Role::User).await.unwrap();

    let (status, response) = ctx
        .request(
            "POST",
            "/tasks",
            Some(&admin_token),
            Some(json!({
                "title": "T1",
                "assignedTo": assignee.id,
                "status": "Completed"
            })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(response["status"], "Pending");
    assert_eq!(response["priority"], "Medium");
    assert_eq!(response["assignedTo"], assignee.id.to_string());

    // Missing title is a validation error.
    let (status, _) = ctx
        .request(
            "POST",
            "/tasks",
            Some(&admin_token),
            Some(json!({ "title": "", "assignedTo": assignee.id })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // So is a malformed assignee id.
    let (status, _) = ctx
        .request(
            "POST",
            "/tasks",
            Some(&admin_token),
            Some(json!({ "title": "T2", "assignedTo": "not-a-uuid" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    ctx.cleanup().await.unwrap();
}

/// Scenario B plus the permission law: non-owner, non-assignee, non-admin
/// mutations always yield 403
#[tokio::test]
#[ignore] // Requires running PostgreSQL and Redis
async fn test_update_and_delete_permissions() {
    let mut ctx = TestContext::new().await.unwrap();
    let (_, admin_token) = ctx.create_user(Role::Admin).await.unwrap();
    let (u1, u1_token) = ctx.create_user(Role::User).await.unwrap();
    let (_u2, u2_token) = ctx.create_user(Role::User).await.unwrap();

    let (status, task) = ctx
        .request(
            "POST",
            "/tasks",
            Some(&admin_token),
            Some(json!({ "title": "B1", "assignedTo": u1.id })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let task_id = task["id"].as_str().unwrap().to_string();

    // U2 is neither assignee, creator, nor admin.
    let (status, _) = ctx
        .request(
            "PUT",
            &format!("/tasks/{}", task_id),
            Some(&u2_token),
            Some(json!({ "status": "Completed" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The assignee may update.
    let (status, updated) = ctx
        .request(
            "PUT",
            &format!("/tasks/{}", task_id),
            Some(&u1_token),
            Some(json!({ "status": "In Progress" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "In Progress");

    // The assignee did not create the task, so they cannot delete it.
    let (status, _) = ctx
        .request("DELETE", &format!("/tasks/{}", task_id), Some(&u1_token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The admin can.
    let (status, response) = ctx
        .request("DELETE", &format!("/tasks/{}", task_id), Some(&admin_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["msg"], "Task removed");

    // Unknown and malformed ids are both 404.
    let (status, _) = ctx
        .request(
            "PUT",
            &format!("/tasks/{}", Uuid::new_v4()),
            Some(&admin_token),
            Some(json!({ "status": "Completed" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = ctx
        .request("DELETE", "/tasks/not-a-uuid", Some(&admin_token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    ctx.cleanup().await.unwrap();
}

/// Role filter law: a User only sees their assignments, a Manager their
/// created-or-assigned set
#[tokio::test]
#[ignore] // Requires running PostgreSQL and Redis
async fn test_role_filtered_listing() {
    let mut ctx = TestContext::new().await.unwrap();
    let (_, admin_token) = ctx.create_user(Role::Admin).await.unwrap();
    let (manager, manager_token) = ctx.create_user(Role::Manager).await.unwrap();
    let (u1, u1_token) = ctx.create_user(Role::User).await.unwrap();
    let (u2, _) = ctx.create_user(Role::User).await.unwrap();
    let tag = tag();

    // Admin creates one task for each user; the manager creates one
    // assigned to u2.
    for (title, assignee) in [("a1", u1.id), ("a2", u2.id)] {
        let (status, _) = ctx
            .request(
                "POST",
                "/tasks",
                Some(&admin_token),
                Some(json!({ "title": format!("{} {}", tag, title), "assignedTo": assignee })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (status, _) = ctx
        .request(
            "POST",
            "/tasks",
            Some(&manager_token),
            Some(json!({ "title": format!("{} m1", tag), "assignedTo": u2.id })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    // Distinct query strings keep the shared cache out of the comparison.
    let (status, listed) = ctx
        .request(
            "GET",
            &format!("/tasks?search={}&sortBy=title", tag),
            Some(&u1_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["assignedTo"]["id"], u1.id.to_string());

    let (status, listed) = ctx
        .request(
            "GET",
            &format!("/tasks?search={}&sortBy=createdAt", tag),
            Some(&manager_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["createdBy"]["id"], manager.id.to_string());

    let (status, listed) = ctx
        .request("GET", &format!("/tasks?search={}", tag), Some(&admin_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 3);

    ctx.cleanup().await.unwrap();
}

/// Idempotent reads within the TTL window, recomputation after a mutation
#[tokio::test]
#[ignore] // Requires running PostgreSQL and Redis
async fn test_cache_invalidation_on_mutation() {
    let mut ctx = TestContext::new().await.unwrap();
    let (manager, manager_token) = ctx.create_user(Role::Manager).await.unwrap();
    let tag = tag();
    let uri = format!("/tasks?search={}", tag);

    let (status, first) = ctx.request("GET", &uri, Some(&manager_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first.as_array().unwrap().len(), 0);

    // A repeat inside the TTL window returns the identical cached body.
    let (status, second) = ctx.request("GET", &uri, Some(&manager_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first, second);

    // Any mutation invalidates the whole list key space.
    let (status, _) = ctx
        .request(
            "POST",
            "/tasks",
            Some(&manager_token),
            Some(json!({ "title": format!("{} fresh", tag), "assignedTo": manager.id })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, third) = ctx.request("GET", &uri, Some(&manager_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(third.as_array().unwrap().len(), 1);

    ctx.cleanup().await.unwrap();
}

/// Scenario C: overdue/due-soon/total counts over a three-task set
#[tokio::test]
#[ignore] // Requires running PostgreSQL and Redis
async fn test_analytics_counts() {
    use chrono::{Duration, Utc};

    let mut ctx = TestContext::new().await.unwrap();
    // A manager's scope covers exactly their own tasks, which keeps the
    // counts stable on a shared test database.
    let (manager, manager_token) = ctx.create_user(Role::Manager).await.unwrap();

    let yesterday = (Utc::now() - Duration::hours(24)).to_rfc3339();
    let tomorrow = (Utc::now() + Duration::hours(12)).to_rfc3339();

    let mut task_ids = Vec::new();
    for (title, due) in [
        ("c1", Some(yesterday)),
        ("c2", Some(tomorrow)),
        ("c3", None),
    ] {
        let mut body = json!({ "title": title, "assignedTo": manager.id });
        if let Some(due) = due {
            body["dueDate"] = json!(due);
        }
        let (status, task) = ctx
            .request("POST", "/tasks", Some(&manager_token), Some(body))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        task_ids.push(task["id"].as_str().unwrap().to_string());
    }

    // yesterday-task → In Progress, no-due-date task → Completed.
    for (id, status_value) in [(&task_ids[0], "In Progress"), (&task_ids[2], "Completed")] {
        let (status, _) = ctx
            .request(
                "PUT",
                &format!("/tasks/{}", id),
                Some(&manager_token),
                Some(json!({ "status": status_value })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, stats) = ctx
        .request("GET", "/analytics/tasks", Some(&manager_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(stats["totalTasks"], 3);
    assert_eq!(stats["overdueTasks"], 1);
    assert_eq!(stats["tasksDueSoon"], 1);
    assert_eq!(stats["tasksByStatus"]["Pending"], 1);
    assert_eq!(stats["tasksByStatus"]["In Progress"], 1);
    assert_eq!(stats["tasksByStatus"]["Completed"], 1);

    // Elevated roles see the leaderboard; its totals cover the assignee.
    let board = &stats["userLeaderboard"][&manager.username];
    assert_eq!(board["total"], 3);
    assert_eq!(board["completed"], 1);

    ctx.cleanup().await.unwrap();
}

/// The leaderboard is omitted entirely for plain users
#[tokio::test]
#[ignore] // Requires running PostgreSQL and Redis
async fn test_analytics_leaderboard_omitted_for_users() {
    let mut ctx = TestContext::new().await.unwrap();
    let (_, user_token) = ctx.create_user(Role::User).await.unwrap();

    let (status, stats) = ctx
        .request("GET", "/analytics/tasks", Some(&user_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(stats.get("userLeaderboard").is_none());

    ctx.cleanup().await.unwrap();
}

/// Assignment is gated to Admin and Manager; malformed ids are 400
#[tokio::test]
#[ignore] // Requires running PostgreSQL and Redis
async fn test_assign_task() {
    let mut ctx = TestContext::new().await.unwrap();
    let (_, admin_token) = ctx.create_user(Role::Admin).await.unwrap();
    let (_, manager_token) = ctx.create_user(Role::Manager).await.unwrap();
    let (u1, u1_token) = ctx.create_user(Role::User).await.unwrap();
    let (u2, _) = ctx.create_user(Role::User).await.unwrap();

    let (status, task) = ctx
        .request(
            "POST",
            "/tasks",
            Some(&admin_token),
            Some(json!({ "title": "assign-me", "assignedTo": u1.id })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let task_id = task["id"].as_str().unwrap().to_string();

    // Plain users cannot reassign, not even their own tasks.
    let (status, _) = ctx
        .request(
            "PUT",
            &format!("/tasks/{}/assign", task_id),
            Some(&u1_token),
            Some(json!({ "userId": u2.id })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Managers can.
    let (status, updated) = ctx
        .request(
            "PUT",
            &format!("/tasks/{}/assign", task_id),
            Some(&manager_token),
            Some(json!({ "userId": u2.id })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["assignedTo"], u2.id.to_string());

    // Malformed ids on either side are a 400, unknown tasks a 404.
    let (status, response) = ctx
        .request(
            "PUT",
            &format!("/tasks/{}/assign", task_id),
            Some(&manager_token),
            Some(json!({ "userId": "not-a-uuid" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["msg"], "Invalid Task ID or User ID");

    let (status, _) = ctx
        .request(
            "PUT",
            &format!("/tasks/{}/assign", Uuid::new_v4()),
            Some(&manager_token),
            Some(json!({ "userId": u2.id })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    ctx.cleanup().await.unwrap();
}

/// Role administration is Admin-only with full error coverage
#[tokio::test]
#[ignore] // Requires running PostgreSQL and Redis
async fn test_admin_role_update() {
    let mut ctx = TestContext::new().await.unwrap();
    let (_, admin_token) = ctx.create_user(Role::Admin).await.unwrap();
    let (target, _) = ctx.create_user(Role::User).await.unwrap();
    let (_, manager_token) = ctx.create_user(Role::Manager).await.unwrap();

    let uri = format!("/admin/users/{}/role", target.id);

    // Non-admins are refused outright.
    let (status, _) = ctx
        .request("PUT", &uri, Some(&manager_token), Some(json!({ "role": "Manager" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, response) = ctx
        .request("PUT", &uri, Some(&admin_token), Some(json!({ "role": "Manager" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["user"]["role"], "Manager");
    assert!(response["msg"]
        .as_str()
        .unwrap()
        .contains(&target.username));

    // Unknown role and unknown user.
    let (status, _) = ctx
        .request("PUT", &uri, Some(&admin_token), Some(json!({ "role": "Root" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = ctx
        .request(
            "PUT",
            &format!("/admin/users/{}/role", Uuid::new_v4()),
            Some(&admin_token),
            Some(json!({ "role": "User" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    ctx.cleanup().await.unwrap();
}

mod common;

use actix_web::http::StatusCode;
use blogbase_backend::models::Role;
use common::{login, post_body, send, TestEnv};
use serde_json::json;

#[actix_web::test]
async fn rejected_post_can_be_edited_and_resubmitted() {
    let env = TestEnv::new();
    env.seed_user("author@example.com", Role::Author);
    env.seed_user("admin@example.com", Role::Admin);
    let app = test_app!(env);
    let author = login(&app, "author@example.com").await;
    let admin = login(&app, "admin@example.com").await;

    let (status, body) = send(&app, "POST", "/api/posts", Some(&author), Some(post_body("Rust Tips"))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], "DRAFT");
    let post_id = body["data"]["id"].as_str().expect("post id").to_string();

    let uri = format!("/api/publish/posts/{post_id}/request");
    let (status, body) = send(&app, "POST", &uri, Some(&author), Some(json!({ "message": "ready" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], "PENDING");
    let first_request = body["data"]["id"].as_i64().expect("request id");

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/publish/requests/{first_request}/reject"),
        Some(&admin),
        Some(json!({ "message": "needs sources" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "REJECTED");
    assert_eq!(body["data"]["reviewer_message"], "needs sources");

    let (_, body) = send(&app, "GET", &format!("/api/posts/{post_id}"), Some(&author), None).await;
    assert_eq!(body["data"]["status"], "REJECTED");

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/posts/{post_id}"),
        Some(&author),
        Some(json!({ "title": "Rust Tips", "content": "Now with sources." })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "POST", &uri, Some(&author), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_ne!(body["data"]["id"].as_i64(), Some(first_request));

    let (_, body) = send(&app, "GET", &format!("/api/posts/{post_id}"), Some(&author), None).await;
    assert_eq!(body["data"]["status"], "PENDING_APPROVAL");

    let (_, body) = send(&app, "GET", "/api/publish/my-requests", Some(&author), None).await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(2));
}

#[actix_web::test]
async fn approval_publishes_the_post() {
    let env = TestEnv::new();
    env.seed_user("author@example.com", Role::Author);
    env.seed_user("admin@example.com", Role::Admin);
    let app = test_app!(env);
    let author = login(&app, "author@example.com").await;
    let admin = login(&app, "admin@example.com").await;

    let (_, body) = send(&app, "POST", "/api/posts", Some(&author), Some(post_body("Launch Day"))).await;
    let post_id = body["data"]["id"].as_str().expect("post id").to_string();
    let slug = body["data"]["slug"].as_str().expect("slug").to_string();

    // Drafts are invisible to anonymous readers.
    let (status, _) = send(&app, "GET", &format!("/api/posts/{post_id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(&app, "POST", &format!("/api/publish/posts/{post_id}/request"), Some(&author), None).await;
    let request_id = body["data"]["id"].as_i64().expect("request id");

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/publish/requests/{request_id}/approve"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "APPROVED");
    assert!(body["data"]["reviewed_at"].is_string());

    let (status, body) = send(&app, "GET", &format!("/api/posts/slug/{slug}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "PUBLISHED");
    assert!(body["data"]["published_at"].is_string());

    let (_, body) = send(&app, "GET", "/api/posts", None, None).await;
    let listed = body["data"].as_array().cloned().unwrap_or_default();
    assert!(listed.iter().any(|p| p["id"] == post_id.as_str()));

    // A settled request cannot be reviewed twice.
    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/publish/requests/{request_id}/reject"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn second_request_for_a_pending_post_conflicts() {
    let env = TestEnv::new();
    env.seed_user("author@example.com", Role::Author);
    let app = test_app!(env);
    let author = login(&app, "author@example.com").await;

    let (_, body) = send(&app, "POST", "/api/posts", Some(&author), Some(post_body("Twice"))).await;
    let post_id = body["data"]["id"].as_str().expect("post id").to_string();
    let uri = format!("/api/publish/posts/{post_id}/request");

    let (status, _) = send(&app, "POST", &uri, Some(&author), None).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = send(&app, "POST", &uri, Some(&author), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
}

#[actix_web::test]
async fn only_the_requesting_author_can_cancel() {
    let env = TestEnv::new();
    env.seed_user("author@example.com", Role::Author);
    env.seed_user("other@example.com", Role::Author);
    let app = test_app!(env);
    let author = login(&app, "author@example.com").await;
    let other = login(&app, "other@example.com").await;

    let (_, body) = send(&app, "POST", "/api/posts", Some(&author), Some(post_body("Mine"))).await;
    let post_id = body["data"]["id"].as_str().expect("post id").to_string();
    let (_, body) = send(&app, "POST", &format!("/api/publish/posts/{post_id}/request"), Some(&author), None).await;
    let request_id = body["data"]["id"].as_i64().expect("request id");
    let cancel = format!("/api/publish/requests/{request_id}/cancel");

    let (status, _) = send(&app, "POST", &cancel, Some(&other), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "POST", &cancel, Some(&author), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, "GET", &format!("/api/posts/{post_id}"), Some(&author), None).await;
    assert_eq!(body["data"]["status"], "DRAFT");
}

#[actix_web::test]
async fn pending_posts_are_locked_for_their_author() {
    let env = TestEnv::new();
    env.seed_user("author@example.com", Role::Author);
    let app = test_app!(env);
    let author = login(&app, "author@example.com").await;

    let (_, body) = send(&app, "POST", "/api/posts", Some(&author), Some(post_body("Frozen"))).await;
    let post_id = body["data"]["id"].as_str().expect("post id").to_string();
    send(&app, "POST", &format!("/api/publish/posts/{post_id}/request"), Some(&author), None).await;

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/posts/{post_id}"),
        Some(&author),
        Some(post_body("Thawed")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn admin_edit_of_published_post_is_flagged() {
    let env = TestEnv::new();
    env.seed_user("author@example.com", Role::Author);
    env.seed_user("admin@example.com", Role::Admin);
    let app = test_app!(env);
    let author = login(&app, "author@example.com").await;
    let admin = login(&app, "admin@example.com").await;

    let (_, body) = send(&app, "POST", "/api/posts", Some(&author), Some(post_body("Typo"))).await;
    let post_id = body["data"]["id"].as_str().expect("post id").to_string();
    let (_, body) = send(&app, "POST", &format!("/api/publish/posts/{post_id}/request"), Some(&author), None).await;
    let request_id = body["data"]["id"].as_i64().expect("request id");
    send(&app, "POST", &format!("/api/publish/requests/{request_id}/approve"), Some(&admin), None).await;

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/posts/{post_id}"),
        Some(&admin),
        Some(json!({ "title": "Typo fixed", "content": "Corrected." })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["admin_override"], true);
    assert_eq!(body["data"]["post"]["status"], "PUBLISHED");
}

#[actix_web::test]
async fn deleting_a_pending_post_removes_its_request() {
    let env = TestEnv::new();
    env.seed_user("author@example.com", Role::Author);
    env.seed_user("admin@example.com", Role::Admin);
    let app = test_app!(env);
    let author = login(&app, "author@example.com").await;
    let admin = login(&app, "admin@example.com").await;

    let (_, body) = send(&app, "POST", "/api/posts", Some(&author), Some(post_body("Withdrawn"))).await;
    let post_id = body["data"]["id"].as_str().expect("post id").to_string();
    let (_, body) = send(&app, "POST", &format!("/api/publish/posts/{post_id}/request"), Some(&author), None).await;
    let request_id = body["data"]["id"].as_i64().expect("request id");

    let (status, _) = send(&app, "DELETE", &format!("/api/posts/{post_id}"), Some(&author), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "GET", &format!("/api/posts/{post_id}"), Some(&author), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(&app, "GET", "/api/publish/requests?status=PENDING", Some(&admin), None).await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(0));

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/publish/requests/{request_id}/approve"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn published_posts_are_deleted_only_by_admins() {
    let env = TestEnv::new();
    env.seed_user("author@example.com", Role::Author);
    env.seed_user("admin@example.com", Role::Admin);
    let app = test_app!(env);
    let author = login(&app, "author@example.com").await;
    let admin = login(&app, "admin@example.com").await;

    let (_, body) = send(&app, "POST", "/api/posts", Some(&author), Some(post_body("Permanent"))).await;
    let post_id = body["data"]["id"].as_str().expect("post id").to_string();
    let (_, body) = send(&app, "POST", &format!("/api/publish/posts/{post_id}/request"), Some(&author), None).await;
    let request_id = body["data"]["id"].as_i64().expect("request id");
    send(&app, "POST", &format!("/api/publish/requests/{request_id}/approve"), Some(&admin), None).await;

    let uri = format!("/api/posts/{post_id}");
    let (status, body) = send(&app, "DELETE", &uri, Some(&author), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Published posts can only be deleted by an administrator.");

    let (status, _) = send(&app, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "DELETE", &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(&app, "GET", "/api/posts", None, None).await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(0));
}

#[actix_web::test]
async fn settled_requests_cannot_be_cancelled() {
    let env = TestEnv::new();
    env.seed_user("author@example.com", Role::Author);
    env.seed_user("admin@example.com", Role::Admin);
    let app = test_app!(env);
    let author = login(&app, "author@example.com").await;
    let admin = login(&app, "admin@example.com").await;

    for decision in ["approve", "reject"] {
        let (_, body) = send(&app, "POST", "/api/posts", Some(&author), Some(post_body(decision))).await;
        let post_id = body["data"]["id"].as_str().expect("post id").to_string();
        let (_, body) = send(&app, "POST", &format!("/api/publish/posts/{post_id}/request"), Some(&author), None).await;
        let request_id = body["data"]["id"].as_i64().expect("request id");

        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/publish/requests/{request_id}/{decision}"),
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            &app,
            "POST",
            &format!("/api/publish/requests/{request_id}/cancel"),
            Some(&author),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT, "cancel after {decision}");
        assert_eq!(body["success"], false);
    }
}

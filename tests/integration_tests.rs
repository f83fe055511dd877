//! Integration tests for the CourseDesk backend.
//!
//! These tests require a running backend HTTP server with a database.
//! Set the TEST_BASE_URL environment variable to specify the server URL.
//!
//! Example:
//! ```sh
//! export TEST_BASE_URL="http://127.0.0.1:8080"
//! cargo test --test integration_tests -- --ignored
//! ```
//!
//! Note: These tests are marked with #[ignore] because they require
//! a running HTTP server. In CI, run them separately with a service container.

use std::env;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use uuid::Uuid;

fn base_url() -> String {
    env::var("TEST_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:8080".into())
}

struct TestUser {
    id: String,
    token: String,
}

/// Sign up and log in a user with a unique email, returning id and token.
async fn provision_user(client: &Client, role: &str) -> TestUser {
    let email = format!("{}-{}@example.edu", role, Uuid::new_v4());
    let password = "integration-pass-1";

    let resp = client
        .post(format!("{}/api/v1/auth/signup", base_url()))
        .json(&json!({
            "name": format!("Test {}", role),
            "email": email,
            "password": password,
            "role": role,
        }))
        .send()
        .await
        .expect("signup request failed");
    assert_eq!(resp.status(), StatusCode::CREATED, "signup should succeed");
    let body: Value = resp.json().await.unwrap();
    let id = body["id"].as_str().unwrap().to_string();

    let resp = client
        .post(format!("{}/api/v1/auth/login", base_url()))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("login request failed");
    assert_eq!(resp.status(), StatusCode::OK, "login should succeed");
    let body: Value = resp.json().await.unwrap();
    let token = body["token"].as_str().unwrap().to_string();

    TestUser { id, token }
}

async fn create_draft(client: &Client, owner: &TestUser) -> String {
    let resp = client
        .post(format!("{}/api/v1/assignments", base_url()))
        .bearer_auth(&owner.token)
        .json(&json!({
            "title": "Distributed systems report",
            "description": "Term submission",
            "category": "Report",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "draft");
    body["id"].as_str().unwrap().to_string()
}

fn file_form(name: &str, content: &'static [u8]) -> Form {
    Form::new().part(
        "file",
        Part::bytes(content)
            .file_name(name.to_string())
            .mime_str("application/pdf")
            .unwrap(),
    )
}

async fn submit(
    client: &Client,
    owner: &TestUser,
    assignment_id: &str,
    reviewer_id: &str,
) -> Value {
    let form = file_form("f1.pdf", b"first submission contents").text("reviewer_id", reviewer_id.to_string());
    let resp = client
        .post(format!(
            "{}/api/v1/assignments/{}/submit",
            base_url(),
            assignment_id
        ))
        .bearer_auth(&owner.token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK, "submit should succeed");
    resp.json().await.unwrap()
}

/// Full workflow: draft -> submit -> reject -> resubmit -> forward -> approve.
#[tokio::test]
#[ignore]
async fn test_full_review_workflow() {
    let client = Client::new();

    let s1 = provision_user(&client, "student").await;
    let p1 = provision_user(&client, "professor").await;
    let p2 = provision_user(&client, "professor").await;

    let assignment_id = create_draft(&client, &s1).await;

    // Submit with f1.pdf to P1
    let body = submit(&client, &s1, &assignment_id, &p1.id).await;
    assert_eq!(body["status"], "submitted");
    assert_eq!(body["current_reviewer"], p1.id.as_str());
    let history = body["history"].as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["action"], "submitted");
    let first_file_path = body["file_path"].as_str().unwrap().to_string();

    // Reject by P1 with a remark
    let resp = client
        .post(format!(
            "{}/api/v1/reviews/{}/reject",
            base_url(),
            assignment_id
        ))
        .bearer_auth(&p1.token)
        .json(&json!({ "remark": "incomplete" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "rejected");
    assert_eq!(body["history"].as_array().unwrap().len(), 2);
    assert_eq!(body["history"][1]["action"], "rejected");
    assert_eq!(body["history"][1]["remark"], "incomplete");

    // Resubmit by S1 with f2.pdf; old file path is preserved in history
    let form = file_form("f2.pdf", b"second submission contents");
    let resp = client
        .post(format!(
            "{}/api/v1/assignments/{}/resubmit",
            base_url(),
            assignment_id
        ))
        .bearer_auth(&s1.token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "submitted");
    let history = body["history"].as_array().unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[2]["action"], "resubmitted");
    assert_eq!(history[2]["old_file_path"], first_file_path.as_str());
    assert_ne!(body["file_path"], first_file_path.as_str());

    // Forward P1 -> P2; reviewer_id must keep the initial assignee
    let resp = client
        .post(format!(
            "{}/api/v1/reviews/{}/forward",
            base_url(),
            assignment_id
        ))
        .bearer_auth(&p1.token)
        .json(&json!({ "new_reviewer_id": p2.id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "forwarded");
    assert_eq!(body["current_reviewer"], p2.id.as_str());
    assert_eq!(body["reviewer_id"], p1.id.as_str());

    // Approve by P2 (terminal)
    let resp = client
        .post(format!(
            "{}/api/v1/reviews/{}/approve",
            base_url(),
            assignment_id
        ))
        .bearer_auth(&p2.token)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "approved");
    assert_eq!(body["history"].as_array().unwrap().len(), 5);
    assert_eq!(body["history"][4]["action"], "approved");

    // Repeating the approve is an invalid transition, not a no-op
    let resp = client
        .post(format!(
            "{}/api/v1/reviews/{}/approve",
            base_url(),
            assignment_id
        ))
        .bearer_auth(&p2.token)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "INVALID_TRANSITION");
}

/// A reviewer who is not the current reviewer gets 403 and the record is
/// unchanged.
#[tokio::test]
#[ignore]
async fn test_wrong_reviewer_is_forbidden() {
    let client = Client::new();

    let s1 = provision_user(&client, "student").await;
    let p1 = provision_user(&client, "professor").await;
    let p2 = provision_user(&client, "professor").await;

    let assignment_id = create_draft(&client, &s1).await;
    submit(&client, &s1, &assignment_id, &p1.id).await;

    let resp = client
        .post(format!(
            "{}/api/v1/reviews/{}/approve",
            base_url(),
            assignment_id
        ))
        .bearer_auth(&p2.token)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Record unchanged
    let resp = client
        .get(format!(
            "{}/api/v1/assignments/{}",
            base_url(),
            assignment_id
        ))
        .bearer_auth(&s1.token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "submitted");
    assert_eq!(body["history"].as_array().unwrap().len(), 1);
}

/// Rejecting without a remark is a validation error and leaves the record
/// unchanged.
#[tokio::test]
#[ignore]
async fn test_reject_requires_remark() {
    let client = Client::new();

    let s1 = provision_user(&client, "student").await;
    let p1 = provision_user(&client, "professor").await;

    let assignment_id = create_draft(&client, &s1).await;
    submit(&client, &s1, &assignment_id, &p1.id).await;

    let resp = client
        .post(format!(
            "{}/api/v1/reviews/{}/reject",
            base_url(),
            assignment_id
        ))
        .bearer_auth(&p1.token)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = client
        .get(format!(
            "{}/api/v1/assignments/{}",
            base_url(),
            assignment_id
        ))
        .bearer_auth(&s1.token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "submitted");
}

/// Submitting a draft to a student (not reviewer-capable) is a validation
/// error.
#[tokio::test]
#[ignore]
async fn test_submit_to_non_reviewer_fails() {
    let client = Client::new();

    let s1 = provision_user(&client, "student").await;
    let s2 = provision_user(&client, "student").await;

    let assignment_id = create_draft(&client, &s1).await;

    let form = file_form("f1.pdf", b"contents").text("reviewer_id", s2.id.clone());
    let resp = client
        .post(format!(
            "{}/api/v1/assignments/{}/submit",
            base_url(),
            assignment_id
        ))
        .bearer_auth(&s1.token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

/// Unauthenticated requests are turned away at the middleware.
#[tokio::test]
#[ignore]
async fn test_missing_token_is_unauthorized() {
    let client = Client::new();

    let resp = client
        .get(format!("{}/api/v1/assignments", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

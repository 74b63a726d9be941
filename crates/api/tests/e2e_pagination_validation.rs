mod common;
use common::*;

use chrono::{Duration, Utc};
use services::invitations::InvitationStatus;

#[tokio::test]
async fn test_list_invitations_invalid_limit() {
    let app = setup_test_app().await;

    // Test limit <= 0
    let response = app
        .server
        .get(&format!("{}?limit=0", invitations_path()))
        .add_header("Authorization", format!("Bearer {}", app.admin_token))
        .await;

    assert_eq!(response.status_code(), 400);
    let err = response.json::<api::models::ErrorResponse>();
    assert_eq!(err.error.message, "Limit must be positive");
    assert_eq!(err.error.r#type, "invalid_parameter");
    assert_eq!(err.error.param.as_deref(), Some("limit"));

    // Test limit > 1000
    let response = app
        .server
        .get(&format!("{}?limit=1001", invitations_path()))
        .add_header("Authorization", format!("Bearer {}", app.admin_token))
        .await;

    assert_eq!(response.status_code(), 400);
    let err = response.json::<api::models::ErrorResponse>();
    assert_eq!(err.error.message, "Limit cannot exceed 1000");
    assert_eq!(err.error.r#type, "invalid_parameter");
}

#[tokio::test]
async fn test_list_invitations_invalid_offset() {
    let app = setup_test_app().await;

    let response = app
        .server
        .get(&format!("{}?offset=-1", invitations_path()))
        .add_header("Authorization", format!("Bearer {}", app.admin_token))
        .await;

    assert_eq!(response.status_code(), 400);
    let err = response.json::<api::models::ErrorResponse>();
    assert_eq!(err.error.message, "Offset must be non-negative");
    assert_eq!(err.error.r#type, "invalid_parameter");
    assert_eq!(err.error.param.as_deref(), Some("offset"));
}

#[tokio::test]
async fn test_list_invitations_invalid_status_filter() {
    let app = setup_test_app().await;

    let response = app
        .server
        .get(&format!("{}?status=bogus", invitations_path()))
        .add_header("Authorization", format!("Bearer {}", app.admin_token))
        .await;

    assert_eq!(response.status_code(), 400);
    let err = response.json::<api::models::ErrorResponse>();
    assert_eq!(err.error.message, "Invalid status filter: bogus");
    assert_eq!(err.error.r#type, "invalid_parameter");
    assert_eq!(err.error.param.as_deref(), Some("status"));
}

#[tokio::test]
async fn test_list_invitations_status_filter() {
    let app = setup_test_app().await;

    for i in 0..2 {
        app.invitations.insert_row(
            test_org_id(),
            &format!("pending{}@example.com", i),
            InvitationStatus::Pending,
            Utc::now() + Duration::hours(24),
        );
    }
    app.invitations.insert_row(
        test_org_id(),
        "accepted@example.com",
        InvitationStatus::Accepted,
        Utc::now() + Duration::hours(24),
    );
    app.invitations.insert_row(
        test_org_id(),
        "expired@example.com",
        InvitationStatus::Expired,
        Utc::now() - Duration::hours(24),
    );
    // Another organization's invitation must never appear
    app.invitations.insert_row(
        other_org_id(),
        "foreign@example.com",
        InvitationStatus::Pending,
        Utc::now() + Duration::hours(24),
    );

    let response = app
        .server
        .get(&format!("{}?status=pending", invitations_path()))
        .add_header("Authorization", format!("Bearer {}", app.admin_token))
        .await;

    assert_eq!(response.status_code(), 200);
    let body = response.json::<serde_json::Value>();
    assert_eq!(body["total"], 2);
    let invitations = body["invitations"].as_array().unwrap();
    assert_eq!(invitations.len(), 2);
    for invitation in invitations {
        assert_eq!(invitation["status"], "pending");
        assert_ne!(invitation["email"], "foreign@example.com");
    }

    let response = app
        .server
        .get(&invitations_path())
        .add_header("Authorization", format!("Bearer {}", app.admin_token))
        .await;

    assert_eq!(response.status_code(), 200);
    let body = response.json::<serde_json::Value>();
    assert_eq!(body["total"], 4);
}

#[tokio::test]
async fn test_list_invitations_pagination_flags() {
    let app = setup_test_app().await;

    for i in 0..5 {
        app.invitations.insert_row(
            test_org_id(),
            &format!("page{}@example.com", i),
            InvitationStatus::Pending,
            Utc::now() + Duration::hours(24),
        );
    }

    let response = app
        .server
        .get(&format!("{}?limit=2&offset=0", invitations_path()))
        .add_header("Authorization", format!("Bearer {}", app.admin_token))
        .await;

    assert_eq!(response.status_code(), 200);
    let body = response.json::<serde_json::Value>();
    assert_eq!(body["invitations"].as_array().unwrap().len(), 2);
    assert_eq!(body["total"], 5);
    assert_eq!(body["limit"], 2);
    assert_eq!(body["offset"], 0);
    assert_eq!(body["has_next"], true);
    assert_eq!(body["has_prev"], false);

    let response = app
        .server
        .get(&format!("{}?limit=2&offset=2", invitations_path()))
        .add_header("Authorization", format!("Bearer {}", app.admin_token))
        .await;

    let body = response.json::<serde_json::Value>();
    assert_eq!(body["has_next"], true);
    assert_eq!(body["has_prev"], true);

    let response = app
        .server
        .get(&format!("{}?limit=2&offset=4", invitations_path()))
        .add_header("Authorization", format!("Bearer {}", app.admin_token))
        .await;

    let body = response.json::<serde_json::Value>();
    assert_eq!(body["invitations"].as_array().unwrap().len(), 1);
    assert_eq!(body["has_next"], false);
    assert_eq!(body["has_prev"], true);
}

#[tokio::test]
async fn test_list_invitations_newest_first() {
    let app = setup_test_app().await;

    // Rows are seeded in order; the listing returns the most recent first
    let first = app.invitations.insert_row(
        test_org_id(),
        "older@example.com",
        InvitationStatus::Pending,
        Utc::now() + Duration::hours(24),
    );
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = app.invitations.insert_row(
        test_org_id(),
        "newer@example.com",
        InvitationStatus::Pending,
        Utc::now() + Duration::hours(24),
    );

    let response = app
        .server
        .get(&invitations_path())
        .add_header("Authorization", format!("Bearer {}", app.admin_token))
        .await;

    assert_eq!(response.status_code(), 200);
    let body = response.json::<serde_json::Value>();
    let invitations = body["invitations"].as_array().unwrap();
    assert_eq!(invitations[0]["id"], second.id.0.to_string());
    assert_eq!(invitations[1]["id"], first.id.0.to_string());
}

#[tokio::test]
async fn test_list_invitations_requires_manage_permission() {
    let app = setup_test_app().await;

    let response = app
        .server
        .get(&invitations_path())
        .add_header("Authorization", format!("Bearer {}", app.member_token))
        .await;

    assert_eq!(response.status_code(), 403);
    let err = response.json::<api::models::ErrorResponse>();
    assert_eq!(err.error.r#type, "forbidden");
}

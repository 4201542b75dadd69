//! Integration tests for the `/jobs` endpoints.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::{body_json, build_test_app, build_test_app_with, get, post_json, test_config};
use serde_json::json;
use trees_core::state::InvocationState;
use trees_core::workflow::WorkflowAllowlist;
use trees_sync::{Reconciler, SyncConfig};

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_job_returns_201_and_is_listed() {
    let app = build_test_app().await;
    app.workflows.push_invocation("inv-1", InvocationState::Queued);

    let response = post_json(
        &app,
        "/jobs",
        json!({"dataset_id": "ds1", "workflow_name": "wf-a"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json, json!({"invocation_id": "inv-1", "state": "queued"}));

    let response = get(&app, "/jobs?dataset_id=ds1").await;
    assert_eq!(response.status(), StatusCode::OK);
    let jobs = body_json(response).await;
    let jobs = jobs.as_array().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0]["invocation_id"], "inv-1");
    assert_eq!(jobs[0]["dataset_id"], "ds1");
    assert_eq!(jobs[0]["workflow_name"], "wf-a");
    assert_eq!(jobs[0]["state"], "queued");
    assert!(jobs[0]["created_at"].is_string());
    assert!(jobs[0]["updated_at"].is_string());
}

#[tokio::test]
async fn create_job_passes_request_through_to_workflow_service() {
    let app = build_test_app().await;

    let response = post_json(
        &app,
        "/jobs",
        json!({
            "dataset_id": " ds1 ",
            "workflow_name": "overviews",
            "overwrite": true,
            "parameters": {"0": {"voxel_size": 0.5}},
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let calls = app.workflows.invoke_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].dataset_id, "ds1");
    assert_eq!(calls[0].dataset_location, "LAS/ds1.laz");
    assert_eq!(calls[0].parameters, json!({"0": {"voxel_size": 0.5}}));
    assert!(calls[0].overwrite);

    let row = app.store.get("inv-1").await.unwrap();
    assert_eq!(row.parameters, json!({"0": {"voxel_size": 0.5}}));
    assert!(row.overwrite);
}

#[tokio::test]
async fn create_job_defaults_optional_fields() {
    let app = build_test_app().await;

    let response = post_json(
        &app,
        "/jobs",
        json!({"dataset_id": "ds1", "workflow_name": "wf-a"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let calls = app.workflows.invoke_calls();
    assert_eq!(calls[0].parameters, json!({}));
    assert!(!calls[0].overwrite);
}

#[tokio::test]
async fn create_job_with_unknown_dataset_is_rejected_without_invoking() {
    let app = build_test_app().await;

    let response = post_json(
        &app,
        "/jobs",
        json!({"dataset_id": "ds-missing", "workflow_name": "wf-a"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"], "dataset ds-missing not found");
    assert!(app.workflows.invoke_calls().is_empty());
    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn create_job_surfaces_invoke_failure_and_writes_nothing() {
    let app = build_test_app().await;
    app.workflows
        .push_invoke_failure(500, "tool dependency missing");

    let response = post_json(
        &app,
        "/jobs",
        json!({"dataset_id": "ds1", "workflow_name": "wf-a"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = body_json(response).await;
    assert_eq!(json["code"], "WORKFLOW_ERROR");
    assert!(json["error"]
        .as_str()
        .unwrap()
        .contains("tool dependency missing"));
    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn create_job_with_workflow_unknown_upstream_returns_400() {
    let app = build_test_app().await;
    app.workflows.push_unknown_workflow();

    let response = post_json(
        &app,
        "/jobs",
        json!({"dataset_id": "ds1", "workflow_name": "segmentation"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "UNKNOWN_WORKFLOW");
    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn create_job_rejects_workflow_outside_allowlist() {
    let mut config = test_config();
    config.workflow_allowlist = WorkflowAllowlist::parse("overviews,standardization");
    let app = build_test_app_with(config).await;

    let rejected = post_json(
        &app,
        "/jobs",
        json!({"dataset_id": "ds1", "workflow_name": "wf-a"}),
    )
    .await;
    assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(rejected).await["code"], "VALIDATION_ERROR");
    assert!(app.workflows.invoke_calls().is_empty());

    let accepted = post_json(
        &app,
        "/jobs",
        json!({"dataset_id": "ds1", "workflow_name": "Overviews"}),
    )
    .await;
    assert_eq!(accepted.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn create_job_rejects_blank_fields_and_non_object_parameters() {
    let app = build_test_app().await;

    let blank = post_json(
        &app,
        "/jobs",
        json!({"dataset_id": "  ", "workflow_name": "wf-a"}),
    )
    .await;
    assert_eq!(blank.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(blank).await["code"], "VALIDATION_ERROR");

    let params = post_json(
        &app,
        "/jobs",
        json!({"dataset_id": "ds1", "workflow_name": "wf-a", "parameters": [1, 2]}),
    )
    .await;
    assert_eq!(params.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(params).await["code"], "VALIDATION_ERROR");

    assert!(app.workflows.invoke_calls().is_empty());
}

#[tokio::test]
async fn create_job_with_malformed_body_returns_json_error() {
    let app = build_test_app().await;

    let response = post_json(&app, "/jobs", json!({"dataset_id": "ds1"})).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");
    assert!(json["error"].as_str().unwrap().contains("workflow_name"));
}

#[tokio::test]
async fn duplicate_invocation_id_returns_409() {
    let app = build_test_app().await;
    app.workflows.push_invocation("inv-7", InvocationState::Queued);
    app.workflows.push_invocation("inv-7", InvocationState::Queued);
    let body = json!({"dataset_id": "ds1", "workflow_name": "wf-a"});

    let first = post_json(&app, "/jobs", body.clone()).await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = post_json(&app, "/jobs", body).await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(second).await["code"], "CONFLICT");
    assert_eq!(app.store.len().await, 1);
}

#[tokio::test]
async fn store_failure_after_invoke_returns_sanitized_500() {
    let app = build_test_app().await;
    app.store.set_fail_writes(true);

    let response = post_json(
        &app,
        "/jobs",
        json!({"dataset_id": "ds1", "workflow_name": "wf-a"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert_eq!(json["error"], "An internal error occurred");
    assert_eq!(app.workflows.invoke_calls().len(), 1);
}

#[tokio::test]
async fn create_job_records_invocation_even_when_request_times_out() {
    let mut config = test_config();
    config.request_timeout_secs = 1;
    let app = build_test_app_with(config).await;
    app.workflows.push_invocation("inv-slow", InvocationState::Queued);
    app.workflows.delay_invoke(Duration::from_millis(1500));

    let response = post_json(
        &app,
        "/jobs",
        json!({"dataset_id": "ds1", "workflow_name": "wf-a"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    assert_eq!(app.workflows.invoke_calls().len(), 1);

    // The run was accepted upstream, so its record must still land.
    let mut recorded = None;
    for _ in 0..40 {
        recorded = app.store.get("inv-slow").await;
        if recorded.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    let row = recorded.expect("record written after the request timed out");
    assert_eq!(row.dataset_id, "ds1");
    assert_eq!(row.state, InvocationState::Queued);
    assert_eq!(app.store.len().await, 1);
}

// ---------------------------------------------------------------------------
// List / get
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_jobs_filters_by_dataset() {
    let app = build_test_app().await;
    app.store.add_dataset("ds2", "LAS/ds2.laz").await;

    for dataset in ["ds1", "ds2", "ds1"] {
        let response = post_json(
            &app,
            "/jobs",
            json!({"dataset_id": dataset, "workflow_name": "wf-a"}),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let all = body_json(get(&app, "/jobs").await).await;
    assert_eq!(all.as_array().unwrap().len(), 3);

    let ds1 = body_json(get(&app, "/jobs?dataset_id=ds1").await).await;
    let ds1 = ds1.as_array().unwrap();
    assert_eq!(ds1.len(), 2);
    assert!(ds1.iter().all(|job| job["dataset_id"] == "ds1"));

    let none = body_json(get(&app, "/jobs?dataset_id=ds-unknown").await).await;
    assert_eq!(none, json!([]));

    let page = body_json(get(&app, "/jobs?limit=1&offset=1").await).await;
    assert_eq!(page.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn list_jobs_with_invalid_query_returns_400() {
    let app = build_test_app().await;

    let response = get(&app, "/jobs?limit=lots").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn list_jobs_store_failure_returns_500() {
    let app = build_test_app().await;
    app.store.set_fail_reads(true);

    let response = get(&app, "/jobs").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["code"], "INTERNAL_ERROR");
}

#[tokio::test]
async fn get_job_returns_record_or_404() {
    let app = build_test_app().await;
    app.workflows.push_invocation("inv-1", InvocationState::Queued);
    post_json(
        &app,
        "/jobs",
        json!({"dataset_id": "ds1", "workflow_name": "wf-a"}),
    )
    .await;

    let found = get(&app, "/jobs/inv-1").await;
    assert_eq!(found.status(), StatusCode::OK);
    assert_eq!(body_json(found).await["invocation_id"], "inv-1");

    let missing = get(&app, "/jobs/inv-404").await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    let json = body_json(missing).await;
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["error"], "Invocation with id inv-404 not found");
}

// ---------------------------------------------------------------------------
// Create, reconcile, list
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reconciled_state_is_visible_through_the_api() {
    let app = build_test_app().await;
    app.workflows.push_invocation("inv-1", InvocationState::Queued);
    post_json(
        &app,
        "/jobs",
        json!({"dataset_id": "ds1", "workflow_name": "wf-a"}),
    )
    .await;

    app.workflows.set_status(
        "inv-1",
        InvocationState::Completed,
        Some(json!({"job_states": {"ok": 2}})),
    );
    let reconciler = Reconciler::new(
        app.store.clone(),
        app.workflows.clone(),
        SyncConfig::default(),
    );
    let stats = reconciler.sync_once().await.unwrap();
    assert_eq!(stats.state_updated, 1);

    let jobs = body_json(get(&app, "/jobs?dataset_id=ds1").await).await;
    assert_eq!(jobs[0]["state"], "completed");
    assert_eq!(jobs[0]["step_summary"], json!({"job_states": {"ok": 2}}));
    assert!(jobs[0]["finished_at"].is_string());

    // Terminal records are no longer polled.
    let stats = reconciler.sync_once().await.unwrap();
    assert_eq!(stats.total_checked, 0);
    assert_eq!(app.workflows.status_calls("inv-1"), 1);
}

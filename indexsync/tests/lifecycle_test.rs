//! Index lifecycle, data source and indexer calls against the mock service.

mod common;

use axum::http::StatusCode;
use common::MockSearchService;
use indexsync::schema::geonames;
use indexsync::{
    DataSourceRegistrar, DataSourceRegistration, DeleteOutcome, Field, FieldType,
    IndexLifecycleManager, IndexerController, IndexerJob, MissingIndexPolicy, QueryClient,
    SearchRequest, SearchServiceClient, SyncError,
};
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn test_delete_missing_index_is_not_fatal() {
    let mock = MockSearchService::start().await;
    let lifecycle = IndexLifecycleManager::new(mock.client());

    let outcome = lifecycle.delete_index("features").await.unwrap();

    assert_eq!(outcome, DeleteOutcome::NotFound);
    assert_eq!(mock.routes(), vec!["DELETE /indexes/features"]);
}

#[tokio::test]
async fn test_delete_missing_index_with_fail_policy() {
    let mock = MockSearchService::start().await;
    let lifecycle =
        IndexLifecycleManager::new(mock.client()).with_missing_policy(MissingIndexPolicy::Fail);

    let err = lifecycle.delete_index("features").await.unwrap_err();

    assert!(err.is_not_found());
    assert!(err.to_string().contains("No index with the name 'features' was found"));
}

#[tokio::test]
async fn test_delete_existing_index() {
    let mock = MockSearchService::start().await;
    mock.seed_index("features");
    let lifecycle = IndexLifecycleManager::new(mock.client());

    let outcome = lifecycle.delete_index("features").await.unwrap();

    assert_eq!(outcome, DeleteOutcome::Deleted);
    assert!(!mock.has_index("features"));
}

#[tokio::test]
async fn test_delete_auth_failure_is_fatal() {
    let mock = MockSearchService::start().await;
    let client = Arc::new(SearchServiceClient::new(&mock.base_url, "wrong-key").unwrap());
    let lifecycle = IndexLifecycleManager::new(client);

    let err = lifecycle.delete_index("features").await.unwrap_err();

    match err {
        SyncError::Request { status, .. } => assert_eq!(status, StatusCode::FORBIDDEN),
        other => panic!("expected request error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_recreate_is_idempotent() {
    let mock = MockSearchService::start().await;
    let lifecycle = IndexLifecycleManager::new(mock.client());
    let definition = geonames("features");

    // First run: nothing to delete
    let first = lifecycle.recreate_index(&definition).await.unwrap();
    // Second run: the index from the first run is replaced
    let second = lifecycle.recreate_index(&definition).await.unwrap();

    assert_eq!(first, DeleteOutcome::NotFound);
    assert_eq!(second, DeleteOutcome::Deleted);
    assert!(mock.has_index("features"));
    assert_eq!(mock.count("PUT /indexes/features"), 2);
}

#[tokio::test]
async fn test_create_rejects_bad_schema_before_sending() {
    let mock = MockSearchService::start().await;
    let lifecycle = IndexLifecycleManager::new(mock.client());

    let two_keys = indexsync::IndexDefinition::new(
        "features",
        vec![
            Field::key("a", FieldType::String),
            Field::key("b", FieldType::String),
        ],
    );

    let err = lifecycle.create_index(&two_keys).await.unwrap_err();

    assert!(matches!(err, SyncError::Schema(_)));
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn test_create_rejected_by_service() {
    let mock = MockSearchService::start().await;
    mock.respond(
        "PUT /indexes/features",
        StatusCode::BAD_REQUEST,
        json!({ "error": { "message": "Field 'LOCATION' cannot be searchable" } }),
    );
    let lifecycle = IndexLifecycleManager::new(mock.client());

    let err = lifecycle.create_index(&geonames("features")).await.unwrap_err();

    match err {
        SyncError::Request {
            status, message, ..
        } => {
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(message, "Field 'LOCATION' cannot be searchable");
        }
        other => panic!("expected request error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_schema_round_trip() {
    let mock = MockSearchService::start().await;
    let lifecycle = IndexLifecycleManager::new(mock.client());
    let definition = geonames("features");

    lifecycle.create_index(&definition).await.unwrap();
    let described = lifecycle.get_index("features").await.unwrap();

    assert_eq!(described, definition);
}

#[tokio::test]
async fn test_requests_carry_api_version() {
    let mock = MockSearchService::start().await;
    let lifecycle = IndexLifecycleManager::new(mock.client());

    lifecycle.delete_index("features").await.unwrap();

    let request = &mock.requests()[0];
    assert_eq!(request.query.as_deref(), Some("api-version=2020-06-30"));
}

#[tokio::test]
async fn test_register_data_source_body() {
    let mock = MockSearchService::start().await;
    let registrar = DataSourceRegistrar::new(mock.client());
    let registration =
        DataSourceRegistration::new("usgs-datasource", "azuresql", "Server=tcp:db;", "GeoNamesRI")
            .with_description("USGS Dataset");

    registrar.register(&registration).await.unwrap();

    let request = &mock.requests()[0];
    assert_eq!(request.path, "/datasources/usgs-datasource");
    assert_eq!(
        request.body.as_ref().unwrap(),
        &json!({
            "name": "usgs-datasource",
            "description": "USGS Dataset",
            "type": "azuresql",
            "credentials": { "connectionString": "Server=tcp:db;" },
            "container": { "name": "GeoNamesRI" }
        })
    );
}

#[tokio::test]
async fn test_reregister_requires_opt_in() {
    let mock = MockSearchService::start().await;
    let registration =
        DataSourceRegistration::new("usgs-datasource", "azuresql", "Server=tcp:db;", "GeoNamesRI");

    let strict = DataSourceRegistrar::new(mock.client());
    strict.register(&registration).await.unwrap();

    // Replacing answers 204, which is only accepted when asked for
    let err = strict.register(&registration).await.unwrap_err();
    assert!(matches!(err, SyncError::Request { status, .. } if status == StatusCode::NO_CONTENT));

    let lenient = DataSourceRegistrar::new(mock.client()).accept_replaced(true);
    lenient.register(&registration).await.unwrap();
}

#[tokio::test]
async fn test_run_indexer_accepted_twice() {
    let mock = MockSearchService::start().await;
    let controller = IndexerController::new(mock.client());
    let job = IndexerJob::new("usgs-indexer", "usgs-datasource", "features");

    controller.create_indexer(&job).await.unwrap();
    controller.run_indexer("usgs-indexer").await.unwrap();
    controller.run_indexer("usgs-indexer").await.unwrap();

    assert_eq!(mock.count("POST /indexers/usgs-indexer/run"), 2);
}

#[tokio::test]
async fn test_invalid_indexer_name_sends_nothing() {
    let mock = MockSearchService::start().await;
    let controller = IndexerController::new(mock.client());

    let err = controller.run_indexer("USGS Indexer").await.unwrap_err();

    assert_eq!(err.kind(), "configuration");
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn test_search_strips_metadata() {
    let mock = MockSearchService::start().await;
    mock.set_documents(vec![
        json!({ "FEATURE_NAME": "Scituate Reservoir", "COUNTY_NAME": "Providence" }),
        json!({ "FEATURE_NAME": "Worden Pond", "COUNTY_NAME": "Washington" }),
    ]);
    let query = QueryClient::new(mock.client(), "features");

    let request = SearchRequest::new("pond")
        .filter("STATE_ALPHA eq 'RI'")
        .select(["FEATURE_NAME", "COUNTY_NAME"]);
    let docs = query.search(&request).await.unwrap();

    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0]["FEATURE_NAME"], "Scituate Reservoir");
    assert!(docs.iter().all(|d| !d.contains_key("@search.score")));

    let sent = mock.requests()[0].body.clone().unwrap();
    assert_eq!(sent["filter"], "STATE_ALPHA eq 'RI'");
    assert_eq!(sent["select"], "FEATURE_NAME,COUNTY_NAME");
}

#[tokio::test]
async fn test_get_index_with_unlisted_field_type() {
    let mock = MockSearchService::start().await;
    mock.respond(
        "GET /indexes/hotels",
        StatusCode::OK,
        json!({
            "name": "hotels",
            "fields": [
                { "name": "id", "type": "Edm.String", "key": true },
                { "name": "rating", "type": "Edm.Single", "filterable": true }
            ]
        }),
    );
    let lifecycle = IndexLifecycleManager::new(mock.client());

    let described = lifecycle.get_index("hotels").await.unwrap();

    assert_eq!(described.fields.len(), 2);
    assert_eq!(
        described.fields[1].field_type,
        FieldType::Other("Edm.Single".to_string())
    );
    assert!(described.fields[1].filterable);
}

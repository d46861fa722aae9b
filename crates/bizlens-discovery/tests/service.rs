//! End-to-end tests for `DiscoveryService` against a mocked Graph API and the
//! in-memory search store.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bizlens_core::{
    AccessToken, DiscoveryResult, NewSearchRecord, ProfileSnapshot, SearchRecord, SearchStatus,
    SearchStore, StoreError, UserAccount,
};
use bizlens_discovery::{DiscoveryError, DiscoveryService, DiscoverySettings, InMemorySearchStore};
use bizlens_graph::{GraphClient, GraphConfig, GraphError};
use chrono::{DateTime, NaiveDate, Utc};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const OWN_ACCOUNT: &str = "17841400000000001";
const PROFILE_FIELDS: &str =
    "id,username,name,biography,followers_count,follows_count,media_count,profile_picture_url";

fn searcher() -> UserAccount {
    UserAccount {
        id: 1,
        instagram_id: OWN_ACCOUNT.to_string(),
        username: "acme".to_string(),
        full_name: None,
        biography: None,
        profile_picture_url: None,
        followers_count: Some(1200),
        follows_count: None,
        media_count: None,
        access_token: AccessToken::new("EAAB-token"),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn service(
    server: &MockServer,
    store: Arc<InMemorySearchStore>,
    settings: DiscoverySettings,
) -> DiscoveryService {
    let client = GraphClient::new(&GraphConfig::for_base_url(&server.uri()))
        .expect("client construction should not fail");
    DiscoveryService::new(client, store, settings)
}

fn rival_discovery_body() -> serde_json::Value {
    serde_json::json!({
        "business_discovery": {
            "id": "17841499999999999",
            "username": "rival",
            "followers_count": 100,
            "media": { "data": [
                {
                    "id": "m1",
                    "like_count": 10,
                    "comments_count": 2,
                    "insights": { "data": [ { "name": "saved", "values": [ { "value": 1 } ] } ] }
                },
                { "id": "m2", "like_count": 5, "comments_count": 0 }
            ] }
        },
        "id": OWN_ACCOUNT
    })
}

fn cached_result() -> DiscoveryResult {
    DiscoveryResult {
        profile: ProfileSnapshot {
            id: "17841499999999999".to_string(),
            username: Some("rival".to_string()),
            display_name: Some("Rival Roasters".to_string()),
            biography: None,
            followers_count: Some(321),
            follows_count: None,
            media_count: Some(12),
            profile_picture_url: None,
            website: None,
        },
        posts: Vec::new(),
        insights: None,
    }
}

fn history_record(id: i64, status: SearchStatus, payload: Option<String>) -> SearchRecord {
    SearchRecord {
        id,
        searcher_user_id: 1,
        target_username: "rival".to_string(),
        target_instagram_id: Some("17841499999999999".to_string()),
        search_result: payload,
        status,
        error_message: None,
        created_at: Utc::now() - chrono::Duration::minutes(5),
    }
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
}

// ---------------------------------------------------------------------------
// discover
// ---------------------------------------------------------------------------

#[tokio::test]
async fn successful_discovery_scores_posts_and_records_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/{OWN_ACCOUNT}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(rival_discovery_body()))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(InMemorySearchStore::new());
    let svc = service(&server, Arc::clone(&store), DiscoverySettings::default());

    let result = svc.discover(&searcher(), "@rival", true).await.unwrap();

    assert!((result.posts[0].engagement_rate.unwrap() - 13.0).abs() < 1e-9);
    assert!((result.posts[1].engagement_rate.unwrap() - 5.0).abs() < 1e-9);
    let insights = result.insights.clone().expect("insights");
    assert_eq!(insights.post_count, 2);
    assert!((insights.average_engagement_rate - 9.0).abs() < 1e-9);

    let records = store.snapshot();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.status, SearchStatus::Success);
    assert_eq!(record.target_username, "rival");
    assert_eq!(record.target_instagram_id.as_deref(), Some("17841499999999999"));
    let stored: DiscoveryResult =
        serde_json::from_str(record.search_result.as_deref().expect("payload")).unwrap();
    assert_eq!(stored, result);
}

#[tokio::test]
async fn failed_discovery_records_failure_and_propagates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/{OWN_ACCOUNT}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": OWN_ACCOUNT
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(InMemorySearchStore::new());
    let svc = service(&server, Arc::clone(&store), DiscoverySettings::default());

    let err = svc.discover(&searcher(), "rival", false).await.unwrap_err();
    assert!(
        matches!(
            err,
            DiscoveryError::Graph(GraphError::TargetNotDiscoverable { .. })
        ),
        "got {err:?}"
    );

    let records = store.snapshot();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, SearchStatus::Failed);
    assert!(records[0].search_result.is_none());
    assert!(records[0]
        .error_message
        .as_deref()
        .is_some_and(|m| m.contains("rival")));
}

#[tokio::test]
async fn cached_result_matches_live_result_exactly() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/{OWN_ACCOUNT}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "business_discovery": {
                "id": "17841499999999999",
                "username": "rival",
                "followers_count": 97,
                "media": { "data": [
                    { "id": "m1", "like_count": 100 },
                    { "id": "m2", "like_count": 7, "comments_count": 3 }
                ] }
            },
            "id": OWN_ACCOUNT
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(InMemorySearchStore::new());
    let svc = service(&server, Arc::clone(&store), DiscoverySettings::default());

    let live = svc.discover(&searcher(), "rival", true).await.unwrap();
    let cached = svc.discover(&searcher(), "rival", true).await.unwrap();

    assert_eq!(live.posts[0].engagement_rate, Some(100.0 / 97.0 * 100.0));
    assert_eq!(cached, live);
    assert_eq!(store.snapshot().len(), 1);
}

#[tokio::test]
async fn fresh_cache_entry_skips_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(InMemorySearchStore::new());
    let cached = cached_result();
    store.insert_raw(history_record(
        1,
        SearchStatus::Success,
        Some(serde_json::to_string(&cached).unwrap()),
    ));
    let svc = service(&server, Arc::clone(&store), DiscoverySettings::default());

    let result = svc.discover(&searcher(), "rival", false).await.unwrap();
    assert_eq!(result, cached);
    assert_eq!(store.snapshot().len(), 1, "cache hits write no history");
}

#[tokio::test]
async fn failed_latest_record_is_not_served_from_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/{OWN_ACCOUNT}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(rival_discovery_body()))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(InMemorySearchStore::new());
    store.insert_raw(history_record(
        1,
        SearchStatus::Success,
        Some(serde_json::to_string(&cached_result()).unwrap()),
    ));
    store.insert_raw(history_record(2, SearchStatus::Failed, None));
    let svc = service(&server, Arc::clone(&store), DiscoverySettings::default());

    let result = svc.discover(&searcher(), "rival", true).await.unwrap();
    assert_eq!(result.profile.followers_count, Some(100));
}

/// Store that records every attempted write and rejects all of them.
#[derive(Default)]
struct RejectingStore {
    attempts: Mutex<Vec<SearchStatus>>,
}

#[async_trait]
impl SearchStore for RejectingStore {
    async fn save_search_record(
        &self,
        record: NewSearchRecord,
    ) -> Result<SearchRecord, StoreError> {
        self.attempts.lock().unwrap().push(record.status);
        Err(StoreError::InvalidValue("disk full".to_string()))
    }

    async fn find_latest_record(
        &self,
        _searcher_user_id: i64,
        _target_username: &str,
    ) -> Result<Option<SearchRecord>, StoreError> {
        Ok(None)
    }

    async fn find_records_since(
        &self,
        _searcher_user_id: i64,
        _since: DateTime<Utc>,
    ) -> Result<Vec<SearchRecord>, StoreError> {
        Ok(Vec::new())
    }

    async fn count_records_since(
        &self,
        _searcher_user_id: i64,
        _since: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        Ok(0)
    }

    async fn find_all_by_searcher(
        &self,
        _searcher_user_id: i64,
    ) -> Result<Vec<SearchRecord>, StoreError> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn rejected_success_write_still_attempts_failure_record() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/{OWN_ACCOUNT}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(rival_discovery_body()))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(RejectingStore::default());
    let client = GraphClient::new(&GraphConfig::for_base_url(&server.uri()))
        .expect("client construction should not fail");
    let svc = DiscoveryService::new(client, store.clone(), DiscoverySettings::default());

    let err = svc.discover(&searcher(), "rival", true).await.unwrap_err();
    assert!(
        matches!(err, DiscoveryError::Store(StoreError::InvalidValue(ref m)) if m == "disk full"),
        "got {err:?}"
    );
    assert_eq!(
        *store.attempts.lock().unwrap(),
        vec![SearchStatus::Success, SearchStatus::Failed]
    );
}

#[tokio::test]
async fn cached_profile_only_result_does_not_answer_media_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/{OWN_ACCOUNT}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(rival_discovery_body()))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(InMemorySearchStore::new());
    store.insert_raw(history_record(
        1,
        SearchStatus::Success,
        Some(serde_json::to_string(&cached_result()).unwrap()),
    ));
    let svc = service(&server, Arc::clone(&store), DiscoverySettings::default());

    let result = svc.discover(&searcher(), "rival", true).await.unwrap();
    assert_eq!(result.posts.len(), 2);
    assert!(result.insights.is_some());
    assert_eq!(store.snapshot().len(), 2);
}

#[tokio::test]
async fn exhausted_quota_rejects_before_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(InMemorySearchStore::new());
    for id in 1..=2 {
        store.insert_raw(history_record(id, SearchStatus::Failed, None));
    }
    let settings = DiscoverySettings {
        hourly_quota: 2,
        ..DiscoverySettings::default()
    };
    let svc = service(&server, Arc::clone(&store), settings);

    let err = svc.discover(&searcher(), "rival", false).await.unwrap_err();
    assert!(
        matches!(err, DiscoveryError::RateLimitExceeded { quota: 2 }),
        "got {err:?}"
    );
    assert_eq!(store.snapshot().len(), 2, "rejections are not recorded");
}

// ---------------------------------------------------------------------------
// history and statistics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn statistics_count_non_success_as_failed() {
    let server = MockServer::start().await;
    let store = Arc::new(InMemorySearchStore::new());
    store.insert_raw(history_record(1, SearchStatus::Success, Some("{}".to_string())));
    store.insert_raw(history_record(2, SearchStatus::Failed, None));
    store.insert_raw(history_record(3, SearchStatus::Pending, None));
    let mut old = history_record(4, SearchStatus::Success, None);
    old.created_at = Utc::now() - chrono::Duration::hours(30);
    store.insert_raw(old);

    let settings = DiscoverySettings {
        hourly_quota: 5,
        ..DiscoverySettings::default()
    };
    let svc = service(&server, Arc::clone(&store), settings);

    let stats = svc.statistics(1).await.unwrap();
    assert_eq!(stats.total_searches, 4);
    assert_eq!(stats.successful_searches, 2);
    assert_eq!(stats.failed_searches, 2);
    assert_eq!(stats.recent_searches, 3);
    assert_eq!(stats.remaining_searches, 2);

    let recent = svc.recent_searches(1).await.unwrap();
    assert_eq!(recent.len(), 3);
    let history = svc.history(1).await.unwrap();
    assert_eq!(history.len(), 4);
    assert_eq!(history.last().map(|r| r.id), Some(4));
}

// ---------------------------------------------------------------------------
// analyze
// ---------------------------------------------------------------------------

async fn mount_profile(server: &MockServer, followers: Option<u64>) {
    Mock::given(method("GET"))
        .and(path(format!("/{OWN_ACCOUNT}")))
        .and(query_param("fields", PROFILE_FIELDS))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": OWN_ACCOUNT,
            "username": "acme",
            "followers_count": followers
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn analyze_reduces_post_details() {
    let server = MockServer::start().await;
    mount_profile(&server, Some(100)).await;

    Mock::given(method("GET"))
        .and(path(format!("/{OWN_ACCOUNT}/media")))
        // 2024-01-01 .. 2024-02-01 exclusive
        .and(query_param("since", "1704067200"))
        .and(query_param("until", "1706745600"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [ { "id": "m1" }, { "id": "m2" } ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/m1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "m1",
            "like_count": 10,
            "comments_count": 2,
            "insights": { "data": [ { "name": "saved", "values": [ { "value": 1 } ] } ] }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/m2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "m2",
            "like_count": 5,
            "comments_count": 0
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(InMemorySearchStore::new());
    let svc = service(&server, Arc::clone(&store), DiscoverySettings::default());

    let analysis = svc.analyze(&searcher(), day(1), day(31)).await.unwrap();
    assert_eq!(analysis.post_count, 2);
    assert_eq!(analysis.total_likes, 15);
    assert_eq!(analysis.total_comments, 2);
    assert_eq!(analysis.total_saves, 1);
    assert!((analysis.average_engagement_rate - 9.0).abs() < 1e-9);
    assert_eq!(analysis.followers_at_time_of_analysis, 100);
    assert!(store.snapshot().is_empty(), "analysis writes no history");
}

#[tokio::test]
async fn analyze_with_zero_followers_only_fetches_profile() {
    let server = MockServer::start().await;
    mount_profile(&server, Some(0)).await;
    Mock::given(method("GET"))
        .and(path(format!("/{OWN_ACCOUNT}/media")))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let svc = service(
        &server,
        Arc::new(InMemorySearchStore::new()),
        DiscoverySettings::default(),
    );
    let analysis = svc.analyze(&searcher(), day(1), day(31)).await.unwrap();
    assert_eq!(analysis.post_count, 0);
    assert_eq!(analysis.followers_at_time_of_analysis, 0);
    assert_eq!(analysis.start_date, day(1));
    assert_eq!(analysis.end_date, day(31));
}

#[tokio::test]
async fn analyze_with_no_posts_skips_detail_calls() {
    let server = MockServer::start().await;
    mount_profile(&server, Some(250)).await;
    Mock::given(method("GET"))
        .and(path(format!("/{OWN_ACCOUNT}/media")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": [] })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/m1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let svc = service(
        &server,
        Arc::new(InMemorySearchStore::new()),
        DiscoverySettings::default(),
    );
    let analysis = svc.analyze(&searcher(), day(1), day(31)).await.unwrap();
    assert_eq!(analysis.post_count, 0);
    assert_eq!(analysis.followers_at_time_of_analysis, 250);
    assert!(analysis.average_engagement_rate.abs() < f64::EPSILON);
}

#[tokio::test]
async fn analyze_aborts_on_failed_post_detail() {
    let server = MockServer::start().await;
    mount_profile(&server, Some(100)).await;
    Mock::given(method("GET"))
        .and(path(format!("/{OWN_ACCOUNT}/media")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [ { "id": "m1" }, { "id": "m2" } ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/m1"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
            "error": { "message": "Unsupported get request.", "code": 100 }
        })))
        .mount(&server)
        .await;
    // Sequential fetching stops at the first failure.
    Mock::given(method("GET"))
        .and(path("/m2"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let svc = service(
        &server,
        Arc::new(InMemorySearchStore::new()),
        DiscoverySettings::default(),
    );
    let err = svc.analyze(&searcher(), day(1), day(31)).await.unwrap_err();
    match err {
        DiscoveryError::Graph(GraphError::Upstream {
            endpoint, status, ..
        }) => {
            assert_eq!(endpoint, "media_detail");
            assert_eq!(status, Some(500));
        }
        other => panic!("expected upstream error, got {other:?}"),
    }
}

#[tokio::test]
async fn analyze_sums_details_with_bounded_concurrency() {
    let server = MockServer::start().await;
    mount_profile(&server, Some(10)).await;
    Mock::given(method("GET"))
        .and(path(format!("/{OWN_ACCOUNT}/media")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [ { "id": "m1" }, { "id": "m2" }, { "id": "m3" } ]
        })))
        .mount(&server)
        .await;
    for (id, likes, delay_ms) in [("m1", 3, 150), ("m2", 2, 0), ("m3", 1, 50)] {
        Mock::given(method("GET"))
            .and(path(format!("/{id}")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "id": id, "like_count": likes }))
                    .set_delay(Duration::from_millis(delay_ms)),
            )
            .expect(1)
            .mount(&server)
            .await;
    }

    let settings = DiscoverySettings {
        analysis_concurrency: 3,
        ..DiscoverySettings::default()
    };
    let svc = service(&server, Arc::new(InMemorySearchStore::new()), settings);
    let analysis = svc.analyze(&searcher(), day(1), day(31)).await.unwrap();
    assert_eq!(analysis.post_count, 3);
    assert_eq!(analysis.total_likes, 6);
    assert!((analysis.average_engagement_rate - 20.0).abs() < 1e-9);
}

#[tokio::test]
async fn analyze_rejects_inverted_range_without_calls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let svc = service(
        &server,
        Arc::new(InMemorySearchStore::new()),
        DiscoverySettings::default(),
    );
    let err = svc.analyze(&searcher(), day(31), day(1)).await.unwrap_err();
    assert!(matches!(err, DiscoveryError::InvalidDateRange { .. }));
}

// ---------------------------------------------------------------------------
// authenticate
// ---------------------------------------------------------------------------

#[tokio::test]
async fn authenticate_resolves_identity_then_profile() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oauth/access_token"))
        .and(query_param("code", "auth-code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "EAAB-fresh"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/me/accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [ { "id": "111", "name": "Acme Coffee" } ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/111"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "instagram_business_account": { "id": OWN_ACCOUNT }
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_profile(&server, Some(1200)).await;

    let svc = service(
        &server,
        Arc::new(InMemorySearchStore::new()),
        DiscoverySettings::default(),
    );
    let account = svc.authenticate("auth-code").await.unwrap();
    assert_eq!(account.identity.business_account_id, OWN_ACCOUNT);
    assert_eq!(account.identity.access_token.expose(), "EAAB-fresh");
    assert_eq!(account.profile.username.as_deref(), Some("acme"));
    assert_eq!(account.profile.followers_count, Some(1200));
}

//! Integration tests for the three-hop `AccountResolver` chain.

use bizlens_graph::{AccountResolver, GraphClient, GraphConfig, GraphError};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str) -> GraphClient {
    GraphClient::new(&GraphConfig::for_base_url(base_url))
        .expect("client construction should not fail")
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/oauth/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "EAAB-token"
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn resolves_first_page_linkage() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/me/accounts"))
        .and(header("authorization", "Bearer EAAB-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [ { "id": "111", "name": "First" }, { "id": "222", "name": "Second" } ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/111"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "instagram_business_account": { "id": "17841400000000001" },
            "id": "111"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/222"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let identity = AccountResolver::new(&client)
        .resolve("auth-code")
        .await
        .expect("identity");
    assert_eq!(identity.business_account_id, "17841400000000001");
    assert_eq!(identity.access_token.expose(), "EAAB-token");
}

#[tokio::test]
async fn empty_page_list_short_circuits() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/me/accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": [] })))
        .expect(1)
        .mount(&server)
        .await;

    // The page-linkage endpoint must never be reached.
    Mock::given(method("GET"))
        .and(path("/111"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = AccountResolver::new(&client)
        .resolve("auth-code")
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::NoManagedAccounts), "got {err:?}");
}

#[tokio::test]
async fn failed_exchange_stops_chain() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/oauth/access_token"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/me/accounts"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = AccountResolver::new(&client)
        .resolve("auth-code")
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::AuthExchangeFailed(_)), "got {err:?}");
}

#[tokio::test]
async fn unlinked_page_error_carries_page_name() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/me/accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [ { "id": "111", "name": "Acme Coffee" } ]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/111"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "111" })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = AccountResolver::new(&client)
        .resolve("auth-code")
        .await
        .unwrap_err();
    match err {
        GraphError::NoLinkedBusinessAccount { page_id, page_name } => {
            assert_eq!(page_id, "111");
            assert_eq!(page_name.as_deref(), Some("Acme Coffee"));
        }
        other => panic!("expected NoLinkedBusinessAccount, got {other:?}"),
    }
}

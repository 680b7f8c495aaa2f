//! HTTP-based integration tests for the Basescan on-chain data source.
//!
//! Uses `wiremock` to stand in for the explorer API.

use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

use wallet_risk_engine::domain::{AppError, ExternalServiceError, OnChainDataSource};
use wallet_risk_engine::infra::BasescanClient;

const WALLET: &str = "0x742d35cc6634c0532925a3b844bc454e4438f44e";

fn client_for(server: &MockServer, api_key: Option<&str>) -> BasescanClient {
    BasescanClient::new(
        api_key.map(|k| SecretString::from(k.to_string())),
        Some(format!("{}/api", server.uri())),
        Duration::from_secs(5),
    )
    .unwrap()
}

fn tx_row(hash: &str, time_stamp: i64, value: &str) -> serde_json::Value {
    json!({
        "blockNumber": "1",
        "hash": hash,
        "timeStamp": time_stamp.to_string(),
        "from": WALLET,
        "to": "0x0000000000000000000000000000000000000001",
        "value": value,
        "gas": "21000",
        "gasPrice": "1000000000",
        "gasUsed": "21000",
        "isError": "0",
        "txreceipt_status": "1"
    })
}

async fn mount_balance(server: &MockServer, balance: &str) {
    Mock::given(method("GET"))
        .and(path("/api"))
        .and(query_param("action", "balance"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "1",
            "message": "OK",
            "result": balance
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_fetch_observation_combines_history_and_balance() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api"))
        .and(query_param("module", "account"))
        .and(query_param("action", "txlist"))
        .and(query_param("address", WALLET))
        .and(query_param("sort", "asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "1",
            "message": "OK",
            "result": [
                tx_row("0xbbb", 1_704_153_600, "2000000000000000000"),
                tx_row("0xaaa", 1_704_067_200, "1000000000000000000"),
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_balance(&server, "500000000000000000").await;

    let client = client_for(&server, None);
    let observation = client.fetch_observation(WALLET).await.unwrap();

    assert_eq!(observation.address, WALLET);
    assert_eq!(observation.transaction_count, 2);
    assert_eq!(observation.balance_wei, 500_000_000_000_000_000);
    assert_eq!(observation.transactions[0].hash, "0xaaa");
    assert_eq!(
        observation.first_transaction_at.unwrap().to_rfc3339(),
        "2024-01-01T00:00:00+00:00"
    );
    assert_eq!(
        observation.last_transaction_at.unwrap().to_rfc3339(),
        "2024-01-02T00:00:00+00:00"
    );
    assert!((observation.average_transaction_value() - 1.5).abs() < 1e-9);
}

#[tokio::test]
async fn test_empty_history_is_not_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("action", "txlist"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "0",
            "message": "No transactions found",
            "result": []
        })))
        .mount(&server)
        .await;
    mount_balance(&server, "0").await;

    let client = client_for(&server, None);
    let observation = client.fetch_observation(WALLET).await.unwrap();

    assert_eq!(observation.transaction_count, 0);
    assert!(observation.first_transaction_at.is_none());
    assert!(observation.last_transaction_at.is_none());
    assert_eq!(observation.balance_wei, 0);
}

#[tokio::test]
async fn test_notok_envelope_is_an_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("action", "txlist"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "0",
            "message": "NOTOK",
            "result": "Max rate limit reached"
        })))
        .mount(&server)
        .await;
    mount_balance(&server, "1").await;

    let client = client_for(&server, None);
    let err = client.fetch_observation(WALLET).await.unwrap_err();

    match err {
        AppError::ExternalService(ExternalServiceError::ApiError { message, .. }) => {
            assert_eq!(message, "NOTOK: Max rate limit reached");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_http_500_is_an_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;

    let client = client_for(&server, None);
    let err = client.fetch_balance(WALLET).await.unwrap_err();

    assert!(matches!(
        err,
        AppError::ExternalService(ExternalServiceError::ApiError {
            status_code: 500,
            ..
        })
    ));
}

#[tokio::test]
async fn test_api_key_is_sent_as_query_param() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("action", "balance"))
        .and(query_param("apikey", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "1",
            "message": "OK",
            "result": "42"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, Some("test-key"));
    assert_eq!(client.fetch_balance(WALLET).await.unwrap(), 42);
}

#[tokio::test]
async fn test_is_contract_detects_bytecode() {
    let server = MockServer::start().await;
    let contract = "0x4200000000000000000000000000000000000006";

    Mock::given(method("GET"))
        .and(query_param("module", "proxy"))
        .and(query_param("action", "eth_getCode"))
        .and(query_param("address", contract))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": "0x6080604052"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("action", "eth_getCode"))
        .and(query_param("address", WALLET))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": "0x"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server, None);
    assert!(client.is_contract(contract).await.unwrap());
    assert!(!client.is_contract(WALLET).await.unwrap());
}

#[tokio::test]
async fn test_is_contract_surfaces_rpc_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("action", "eth_getCode"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": -32602, "message": "invalid argument 0" }
        })))
        .mount(&server)
        .await;

    let client = client_for(&server, None);
    let err = client.is_contract("not-an-address").await.unwrap_err();
    assert!(err.to_string().contains("invalid argument 0"));
}

#[tokio::test]
async fn test_slow_explorer_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": "1", "message": "OK", "result": "1" }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let client = BasescanClient::new(
        None,
        Some(format!("{}/api", server.uri())),
        Duration::from_millis(100),
    )
    .unwrap();
    let err = client.fetch_balance(WALLET).await.unwrap_err();

    assert!(matches!(
        err,
        AppError::ExternalService(ExternalServiceError::Timeout(_))
    ));
}

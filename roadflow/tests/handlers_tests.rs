use roadflow::handlers::*;
use roadflow_core::report::ReportFormat;
use roadflow_gateway::{Authority, FlowQuery, HttpGateway};
use serde_json::json;
use std::io::Write;
use tempfile::NamedTempFile;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn authorities() -> Vec<Authority> {
    vec![
        Authority::new("85", "Rochdale"),
        Authority::new("186", "Oldham"),
        Authority::new("108", "Rotherham"),
    ]
}

async fn mock_api() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/local-authorities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": 85, "name": "Rochdale"},
                {"id": 186, "name": "Oldham"}
            ]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/average-annual-daily-flow"))
        .and(query_param("filter[local_authority_id]", "85"))
        .and(query_param("filter[year]", "2018"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {
                    "count_point_id": 946,
                    "road_name": "A58",
                    "latitude": 53.6,
                    "longitude": -2.2,
                    "cars_and_taxis": 8000,
                    "all_hgvs": 2000,
                    "all_motor_vehicles": 10000
                },
                {
                    "count_point_id": 947,
                    "road_name": "M62",
                    "latitude": 53.65,
                    "longitude": -2.1,
                    "cars_and_taxis": 60000,
                    "all_motor_vehicles": 60000
                }
            ]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/average-annual-daily-flow"))
        .and(query_param("filter[year]", "1999"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(&server)
        .await;

    server
}

fn gateway_for(server: &MockServer) -> HttpGateway {
    HttpGateway::new(&format!("{}/api", server.uri())).unwrap()
}

// ============================================================================
// Helpers
// ============================================================================

#[test]
fn test_filter_authorities_matches_name_and_id() {
    let list = authorities();

    let names: Vec<String> = filter_authorities(&list, Some("roch"))
        .into_iter()
        .map(|a| a.name)
        .collect();
    assert_eq!(names, vec!["Rochdale"]);

    let by_id = filter_authorities(&list, Some("186"));
    assert_eq!(by_id.len(), 1);
    assert_eq!(by_id[0].name, "Oldham");

    assert_eq!(filter_authorities(&list, Some("ro")).len(), 2);
}

#[test]
fn test_filter_authorities_without_filter() {
    let list = authorities();
    assert_eq!(filter_authorities(&list, None).len(), 3);
    assert_eq!(filter_authorities(&list, Some("  ")).len(), 3);
    assert!(filter_authorities(&list, Some("zzz")).is_empty());
}

#[test]
fn test_parse_format() {
    assert_eq!(parse_format(Some(&"json".to_string())), ReportFormat::Json);
    assert_eq!(parse_format(Some(&"text".to_string())), ReportFormat::Text);
    assert_eq!(parse_format(None), ReportFormat::Text);
}

#[test]
fn test_load_config_with_base_url_override() -> Result<(), Box<dyn std::error::Error>> {
    let mut file = NamedTempFile::new()?;
    writeln!(file, "[api]")?;
    writeln!(file, "timeout_secs = 3")?;

    let override_url = Url::parse("http://localhost:9999/api")?;
    let config = load_config(Some(&file.path().to_path_buf()), Some(&override_url))?;

    assert_eq!(config.api.base_url, "http://localhost:9999/api");
    assert_eq!(config.api.timeout_secs, 3);
    Ok(())
}

#[test]
fn test_load_config_rejects_non_http_override() {
    let dir = tempfile::TempDir::new().unwrap();
    let override_url = Url::parse("ftp://example.com/api").unwrap();

    let err = load_config(Some(&dir.path().join("none.toml")), Some(&override_url)).unwrap_err();
    assert!(format!("{:#}", err).contains("--base-url"));
}

#[test]
fn test_save_report_creates_directories() {
    let dir = tempfile::TempDir::new().unwrap();
    let target = dir.path().join("reports/rochdale.txt");

    save_report(&target, "report body").unwrap();
    assert_eq!(std::fs::read_to_string(target).unwrap(), "report body");
}

// ============================================================================
// Handlers against a mock API
// ============================================================================

#[tokio::test]
async fn test_handle_authorities_text() {
    let server = mock_api().await;
    let gateway = gateway_for(&server);

    let out = handle_authorities(&gateway, None, ReportFormat::Text).await.unwrap();
    assert!(out.contains("Rochdale"));
    assert!(out.contains("Oldham"));
    assert!(out.contains("2 local authorities"));
}

#[tokio::test]
async fn test_handle_authorities_filtered_json() {
    let server = mock_api().await;
    let gateway = gateway_for(&server);

    let out = handle_authorities(&gateway, Some("old"), ReportFormat::Json)
        .await
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value, json!([{"id": "186", "name": "Oldham"}]));
}

#[tokio::test]
async fn test_handle_authorities_no_match() {
    let server = mock_api().await;
    let gateway = gateway_for(&server);

    let err = handle_authorities(&gateway, Some("zzz"), ReportFormat::Text)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("zzz"));
}

#[tokio::test]
async fn test_handle_flows_text_report() {
    let server = mock_api().await;
    let gateway = gateway_for(&server);

    let out = handle_flows(&gateway, &FlowQuery::new("85", 2018), ReportFormat::Text, Some(1))
        .await
        .unwrap();
    assert!(out.contains("# Rochdale (2018)"));
    assert!(out.contains("Count points: 2"));
    assert!(out.contains("Busiest count points (1 of 2)"));
    assert!(out.contains("M62 (#947)"));
    assert!(!out.contains("A58 (#946)"));
}

#[tokio::test]
async fn test_handle_flows_json() {
    let server = mock_api().await;
    let gateway = gateway_for(&server);

    let out = handle_flows(&gateway, &FlowQuery::new("85", 2018), ReportFormat::Json, None)
        .await
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["points"].as_array().unwrap().len(), 2);
    assert_eq!(value["bounds"], json!([[-2.2, 53.6], [-2.1, 53.65]]));
}

#[tokio::test]
async fn test_handle_flows_empty_is_error() {
    let server = mock_api().await;
    let gateway = gateway_for(&server);

    let err = handle_flows(&gateway, &FlowQuery::new("85", 1999), ReportFormat::Text, None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("No count points"));
}

#[tokio::test]
async fn test_handle_flows_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let gateway = gateway_for(&server);

    let err = handle_flows(&gateway, &FlowQuery::new("85", 2018), ReportFormat::Text, None)
        .await
        .unwrap_err();
    assert!(format!("{:#}", err).contains("500"));
}

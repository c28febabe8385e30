//! Integration tests for Weather MCP Server
//!
//! These tests run the real Open-Meteo client against a local axum server
//! that impersonates the geocoding and forecast endpoints.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde_json::{json, Value};

use weather_mcp_server::config::Config;
use weather_mcp_server::error::{McpError, WeatherMcpError};
use weather_mcp_server::mcp::server::McpServer;
use weather_mcp_server::mcp::tools::{weather_registry, ToolRegistry};
use weather_mcp_server::weather::client::OpenMeteoClient;

type Params = HashMap<String, String>;

/// Canned response for one endpoint
#[derive(Clone)]
enum MockBody {
    Json(Value),
    Raw(StatusCode, &'static str),
}

impl IntoResponse for MockBody {
    fn into_response(self) -> Response {
        match self {
            MockBody::Json(value) => axum::Json(value).into_response(),
            MockBody::Raw(status, body) => (status, body).into_response(),
        }
    }
}

/// Fake Open-Meteo recording every query it receives
struct MockOpenMeteo {
    geocoding: MockBody,
    forecast: MockBody,
    /// Geocoding requests answered with 503 before `geocoding` is served
    transient_geocoding_failures: AtomicUsize,
    /// Stall before answering geocoding requests
    geocoding_delay: Option<Duration>,
    geocode_calls: Mutex<Vec<Params>>,
    forecast_calls: Mutex<Vec<Params>>,
}

impl MockOpenMeteo {
    fn new(geocoding: MockBody, forecast: MockBody) -> Arc<Self> {
        Self::build(geocoding, forecast, None)
    }

    fn with_slow_geocoding(geocoding: MockBody, forecast: MockBody, delay: Duration) -> Arc<Self> {
        Self::build(geocoding, forecast, Some(delay))
    }

    fn build(geocoding: MockBody, forecast: MockBody, geocoding_delay: Option<Duration>) -> Arc<Self> {
        Arc::new(Self {
            geocoding,
            forecast,
            transient_geocoding_failures: AtomicUsize::new(0),
            geocoding_delay,
            geocode_calls: Mutex::new(Vec::new()),
            forecast_calls: Mutex::new(Vec::new()),
        })
    }

    fn geocode_calls(&self) -> Vec<Params> {
        self.geocode_calls.lock().unwrap().clone()
    }

    fn forecast_calls(&self) -> Vec<Params> {
        self.forecast_calls.lock().unwrap().clone()
    }
}

async fn search(State(mock): State<Arc<MockOpenMeteo>>, Query(params): Query<Params>) -> Response {
    mock.geocode_calls.lock().unwrap().push(params);

    if let Some(delay) = mock.geocoding_delay {
        tokio::time::sleep(delay).await;
    }

    let pending = mock.transient_geocoding_failures.load(Ordering::SeqCst);
    if pending > 0 {
        mock.transient_geocoding_failures.store(pending - 1, Ordering::SeqCst);
        return (StatusCode::SERVICE_UNAVAILABLE, "try again").into_response();
    }

    mock.geocoding.clone().into_response()
}

async fn forecast(State(mock): State<Arc<MockOpenMeteo>>, Query(params): Query<Params>) -> Response {
    mock.forecast_calls.lock().unwrap().push(params);
    mock.forecast.clone().into_response()
}

async fn spawn_mock(mock: Arc<MockOpenMeteo>) -> SocketAddr {
    let app = Router::new()
        .route("/v1/search", get(search))
        .route("/v1/forecast", get(forecast))
        .with_state(mock);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn config_for(addr: SocketAddr, max_retries: u32) -> Config {
    Config {
        geocoding_url: format!("http://{addr}/v1/search"),
        forecast_url: format!("http://{addr}/v1/forecast"),
        request_timeout: Duration::from_secs(5),
        max_retries,
        ..Config::default()
    }
}

fn registry_for(config: &Config) -> ToolRegistry {
    let client = OpenMeteoClient::new(config).unwrap();
    weather_registry(Arc::new(client)).unwrap()
}

async fn get_weather(registry: &ToolRegistry, location: &str) -> (bool, String) {
    let result = registry
        .call_tool("get-weather", json!({ "location": location }))
        .await
        .unwrap();
    (result.is_error, result.text_content())
}

fn paris_forecast() -> Value {
    json!({
        "latitude": 48.86,
        "longitude": 2.3399997,
        "generationtime_ms": 0.03,
        "utc_offset_seconds": 0,
        "timezone": "GMT",
        "current_units": {"temperature_2m": "°C", "relative_humidity_2m": "%"},
        "current": {
            "time": "2026-10-19T12:00",
            "interval": 900,
            "precipitation": 0.0,
            "rain": 0.0,
            "relative_humidity_2m": 71,
            "temperature_2m": 18.0,
            "is_day": 1,
            "cloud_cover": 40,
            "wind_speed_10m": 9.4
        }
    })
}

mod weather_lookup_tests {
    use super::*;

    #[tokio::test]
    async fn test_paris_end_to_end() {
        let mock = MockOpenMeteo::new(
            MockBody::Json(json!({
                "results": [
                    {"name": "Paris", "latitude": 48.85, "longitude": 2.35, "country": "France"},
                    {"name": "Paris", "latitude": 33.66, "longitude": -95.55, "country": "United States"}
                ],
                "generationtime_ms": 0.7
            })),
            MockBody::Json(paris_forecast()),
        );
        let addr = spawn_mock(mock.clone()).await;
        let registry = registry_for(&config_for(addr, 0));

        let (is_error, text) = get_weather(&registry, "Paris").await;

        assert!(!is_error);
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, paris_forecast());

        let geocode_calls = mock.geocode_calls();
        assert_eq!(geocode_calls.len(), 1);
        assert_eq!(geocode_calls[0]["name"], "Paris");
        assert_eq!(geocode_calls[0]["count"], "10");
        assert_eq!(geocode_calls[0]["language"], "en");
        assert_eq!(geocode_calls[0]["format"], "json");

        let forecast_calls = mock.forecast_calls();
        assert_eq!(forecast_calls.len(), 1);
        assert_eq!(forecast_calls[0]["latitude"], "48.85");
        assert_eq!(forecast_calls[0]["longitude"], "2.35");
        assert_eq!(
            forecast_calls[0]["current"],
            "precipitation,rain,relative_humidity_2m,temperature_2m,is_day,cloud_cover,wind_speed_10m"
        );
    }

    #[tokio::test]
    async fn test_location_name_is_url_encoded() {
        let mock = MockOpenMeteo::new(
            MockBody::Json(json!({"results": [{"latitude": 40.71, "longitude": -74.01}]})),
            MockBody::Json(json!({"current": {}})),
        );
        let addr = spawn_mock(mock.clone()).await;
        let registry = registry_for(&config_for(addr, 0));

        get_weather(&registry, "New York & Co").await;

        assert_eq!(mock.geocode_calls()[0]["name"], "New York & Co");
    }

    #[tokio::test]
    async fn test_empty_results_not_found() {
        let mock = MockOpenMeteo::new(
            MockBody::Json(json!({"results": []})),
            MockBody::Json(paris_forecast()),
        );
        let addr = spawn_mock(mock.clone()).await;
        let registry = registry_for(&config_for(addr, 0));

        let (is_error, text) = get_weather(&registry, "Qwxyzplace").await;

        assert!(!is_error);
        assert_eq!(text, "No location found for Qwxyzplace");
        assert!(mock.forecast_calls().is_empty());
    }

    #[tokio::test]
    async fn test_envelope_without_results_not_found() {
        // What Open-Meteo actually sends for an unknown name
        let mock = MockOpenMeteo::new(
            MockBody::Json(json!({"generationtime_ms": 0.48})),
            MockBody::Json(paris_forecast()),
        );
        let addr = spawn_mock(mock.clone()).await;
        let registry = registry_for(&config_for(addr, 0));

        let (_, text) = get_weather(&registry, "Qwxyzplace").await;

        assert_eq!(text, "No location found for Qwxyzplace");
        assert!(mock.forecast_calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_location_makes_no_requests() {
        let mock = MockOpenMeteo::new(
            MockBody::Json(json!({"results": [{"latitude": 1.0, "longitude": 2.0}]})),
            MockBody::Json(paris_forecast()),
        );
        let addr = spawn_mock(mock.clone()).await;
        let registry = registry_for(&config_for(addr, 0));

        let err = registry
            .call_tool("get-weather", json!({"place": "Paris"}))
            .await
            .unwrap_err();

        assert!(matches!(err, WeatherMcpError::Mcp(McpError::InvalidArguments { .. })));
        assert!(mock.geocode_calls().is_empty());
        assert!(mock.forecast_calls().is_empty());
    }

    #[tokio::test]
    async fn test_network_failure_is_not_not_found() {
        // Reserve a port, then close it so connections are refused
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let registry = registry_for(&config_for(addr, 0));

        let (is_error, text) = get_weather(&registry, "Paris").await;

        assert!(is_error);
        assert!(!text.contains("No location found"));
    }

    #[tokio::test]
    async fn test_non_json_geocoding_response_fails() {
        let mock = MockOpenMeteo::new(
            MockBody::Raw(StatusCode::OK, "<html>maintenance</html>"),
            MockBody::Json(paris_forecast()),
        );
        let addr = spawn_mock(mock.clone()).await;
        let registry = registry_for(&config_for(addr, 0));

        let (is_error, text) = get_weather(&registry, "Paris").await;

        assert!(is_error);
        assert!(text.contains("malformed"));
        assert!(mock.forecast_calls().is_empty());
    }

    #[tokio::test]
    async fn test_forecast_http_error_fails() {
        let mock = MockOpenMeteo::new(
            MockBody::Json(json!({"results": [{"latitude": 48.85, "longitude": 2.35}]})),
            MockBody::Raw(StatusCode::BAD_REQUEST, r#"{"error":true,"reason":"Invalid latitude"}"#),
        );
        let addr = spawn_mock(mock.clone()).await;
        let registry = registry_for(&config_for(addr, 0));

        let (is_error, text) = get_weather(&registry, "Paris").await;

        assert!(is_error);
        assert!(text.contains("400"));
        assert!(text.contains("Invalid latitude"));
    }

    #[tokio::test]
    async fn test_request_timeout_fails_invocation() {
        let mock = MockOpenMeteo::with_slow_geocoding(
            MockBody::Json(json!({"results": [{"latitude": 48.85, "longitude": 2.35}]})),
            MockBody::Json(paris_forecast()),
            Duration::from_secs(5),
        );
        let addr = spawn_mock(mock.clone()).await;
        let config = Config {
            request_timeout: Duration::from_secs(1),
            ..config_for(addr, 0)
        };
        let registry = registry_for(&config);

        let started = std::time::Instant::now();
        let (is_error, text) = get_weather(&registry, "Paris").await;

        assert!(is_error);
        assert!(!text.contains("No location found"));
        assert!(started.elapsed() < Duration::from_secs(4));
        assert!(mock.forecast_calls().is_empty());
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let mock = MockOpenMeteo::new(
            MockBody::Json(json!({"results": [{"latitude": 48.85, "longitude": 2.35}]})),
            MockBody::Json(paris_forecast()),
        );
        mock.transient_geocoding_failures.store(1, Ordering::SeqCst);
        let addr = spawn_mock(mock.clone()).await;
        let registry = registry_for(&config_for(addr, 1));

        let (is_error, text) = get_weather(&registry, "Paris").await;

        assert!(!is_error, "unexpected failure: {text}");
        assert_eq!(mock.geocode_calls().len(), 2);
        assert_eq!(mock.forecast_calls().len(), 1);
    }
}

mod mcp_protocol_tests {
    use super::*;

    #[tokio::test]
    async fn test_tools_call_over_jsonrpc() {
        let mock = MockOpenMeteo::new(
            MockBody::Json(json!({"results": [{"latitude": 48.85, "longitude": 2.35}]})),
            MockBody::Json(paris_forecast()),
        );
        let addr = spawn_mock(mock).await;
        let server = McpServer::new(registry_for(&config_for(addr, 0)));

        let request = json!({
            "jsonrpc": "2.0",
            "id": 7,
            "method": "tools/call",
            "params": {"name": "get-weather", "arguments": {"location": "Paris"}}
        });
        let response = server.handle_message(&request.to_string()).await.unwrap();
        let response = serde_json::to_value(response).unwrap();

        assert_eq!(response["id"], 7);
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        assert_eq!(serde_json::from_str::<Value>(text).unwrap(), paris_forecast());
    }

    #[tokio::test]
    async fn test_tools_list_over_jsonrpc() {
        let server = McpServer::new(registry_for(&Config::default()));

        let response = server
            .handle_message(r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#)
            .await
            .unwrap();
        let tools = response.result.unwrap()["tools"].clone();

        assert_eq!(tools.as_array().unwrap().len(), 1);
        assert_eq!(tools[0]["name"], "get-weather");
        assert_eq!(tools[0]["inputSchema"]["required"], json!(["location"]));
    }
}

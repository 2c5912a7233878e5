//! End-to-end delivery against a mock HTTP collector.

use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

use octomatic_telemetry::config::{load_config, Environment, TelemetryConfig};
use octomatic_telemetry::logging::FlushOutcome;
use octomatic_telemetry::platform::{HostPlatform, NoopPlatform};
use octomatic_telemetry::transport::{HttpTransport, Transport, TransportError};
use octomatic_telemetry::{AppError, LifecycleEvent, LogValue, Logger, Telemetry};

mod common;

fn http(url: &str, timeout: Duration) -> Option<Arc<dyn Transport>> {
    Some(Arc::new(HttpTransport::from_endpoint(url, timeout).unwrap()))
}

#[tokio::test]
async fn test_batch_reaches_collector() {
    let collector = common::Collector::start().await;
    let platform = Arc::new(HostPlatform::new());
    platform.set_page_url("https://octomatic.ai/pricing");
    platform.set_user_agent("integration-test");

    let logger = Logger::builder(common::remote_logger_config(3))
        .environment(Environment::Production)
        .platform(platform)
        .console(common::console())
        .transport(http(&collector.url("logs"), Duration::from_secs(5)))
        .build();

    logger.warn("disk low", Some("StorageService"), Some(LogValue::record([("pct", LogValue::from(92))])));
    logger.info("not queued", None, None);
    logger.error("write failed", Some("StorageService"), None);
    logger.warn("retrying", None, None);

    collector.wait_for(1).await;
    let body = &collector.bodies("logs")[0];
    assert_eq!(body["source"], "octomatic-frontend");
    assert_eq!(body["environment"], "production");

    let logs = body["logs"].as_array().unwrap();
    let messages: Vec<_> = logs.iter().map(|l| l["message"].as_str().unwrap()).collect();
    assert_eq!(messages, vec!["disk low", "write failed", "retrying"]);
    assert_eq!(logs[0]["level"], "WARN");
    assert_eq!(logs[0]["data"]["pct"], 92);
    assert_eq!(logs[0]["url"], "https://octomatic.ai/pricing");
    assert_eq!(logs[0]["userAgent"], "integration-test");
    assert_eq!(logs[0]["sessionId"], logger.session_id());
}

#[tokio::test]
async fn test_rejected_batch_is_requeued_then_delivered() {
    let collector = common::Collector::start().await;
    let logger = Logger::builder(common::remote_logger_config(10))
        .console(common::console())
        .transport(http(&collector.url("logs"), Duration::from_secs(5)))
        .build();

    collector.respond_with(500);
    logger.error("first", None, None);
    assert_eq!(logger.flush().await, FlushOutcome::Requeued(1));
    assert_eq!(logger.retries_remaining(), 2);

    collector.respond_with(200);
    logger.error("second", None, None);
    assert_eq!(logger.flush().await, FlushOutcome::Delivered(2));

    let bodies = collector.bodies("logs");
    assert_eq!(bodies.len(), 2);
    let delivered: Vec<_> = bodies[1]["logs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["message"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(delivered, vec!["first", "second"]);
}

#[tokio::test]
async fn test_hung_collector_times_out() {
    let collector = common::Collector::start().await;
    collector.delay(Duration::from_secs(3));
    let transport = HttpTransport::from_endpoint(&collector.url("logs"), Duration::from_millis(200)).unwrap();

    let started = Instant::now();
    let result = transport.send(&serde_json::json!({"logs": []})).await;

    assert_eq!(result, Err(TransportError::Timeout(200)));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_unreachable_collector_is_request_error() {
    let transport = HttpTransport::from_endpoint("http://127.0.0.1:1/logs", Duration::from_secs(2)).unwrap();
    let result = transport.send(&serde_json::json!({})).await;
    assert!(matches!(result, Err(TransportError::Request(_))));
}

#[tokio::test]
async fn test_error_report_in_production() {
    let collector = common::Collector::start().await;
    let mut config = TelemetryConfig::for_environment(Environment::Production);
    config.remote.logging_endpoint = Some(collector.url("logs"));
    config.remote.error_monitoring_endpoint = Some(collector.url("errors"));

    let platform = Arc::new(HostPlatform::new());
    platform.set_page_url("https://octomatic.ai/contact");
    let telemetry = Telemetry::from_config(config, platform).unwrap();

    let error = AppError::external_service("calendly", "booking widget failed").with_context("BookingWidget");
    telemetry.error_handler().handle_app_error(error, None, false).await;

    let reports = collector.bodies("errors");
    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    assert_eq!(report["source"], "octomatic-frontend");
    assert_eq!(report["environment"], "production");
    assert_eq!(report["error"]["message"], "booking widget failed");
    assert_eq!(report["error"]["name"], "ExternalServiceError");
    assert_eq!(report["error"]["category"], "EXTERNAL_SERVICE");
    assert_eq!(report["error"]["severity"], "HIGH");
    assert_eq!(report["error"]["statusCode"], 502);
    assert_eq!(report["error"]["isOperational"], true);
    assert_eq!(report["error"]["context"], "BookingWidget");
    assert_eq!(report["error"]["url"], "https://octomatic.ai/contact");
    assert_eq!(report["error"]["additionalData"]["service"], "calendly");

    // The ERROR entry is queued for the logging endpoint until unload.
    assert_eq!(telemetry.logger().queued_len(), 1);
    telemetry.dispatch(LifecycleEvent::Unload).await;
    assert_eq!(collector.bodies("logs").len(), 1);
}

#[tokio::test]
async fn test_no_report_in_development() {
    let collector = common::Collector::start().await;
    let mut config = TelemetryConfig::for_environment(Environment::Development);
    config.remote.error_monitoring_endpoint = Some(collector.url("errors"));
    let telemetry = Telemetry::from_config(config, Arc::new(NoopPlatform)).unwrap();

    telemetry
        .error_handler()
        .handle_app_error(AppError::network("offline"), None, false)
        .await;

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(collector.total(), 0);
}

#[tokio::test]
async fn test_config_file_drives_delivery() {
    let collector = common::Collector::start().await;
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
environment = "staging"

[logger]
batch_size = 2

[remote]
logging_endpoint = "{}"
request_timeout_ms = 2000
"#,
        collector.url("logs")
    )
    .unwrap();

    let config = load_config(file.path()).unwrap();
    assert_eq!(config.environment, Environment::Staging);
    assert!(!config.logger.enable_remote_logging);

    let mut config = config;
    config.logger.enable_remote_logging = true;
    let telemetry = Telemetry::from_config(config, Arc::new(NoopPlatform)).unwrap();
    telemetry.start();

    telemetry.logger().warn("one", None, None);
    telemetry.logger().warn("two", None, None);
    collector.wait_for(1).await;
    assert_eq!(collector.bodies("logs")[0]["environment"], "staging");

    telemetry.logger().error("tail", None, None);
    telemetry.shutdown().await;
    assert_eq!(collector.bodies("logs").len(), 2);
}

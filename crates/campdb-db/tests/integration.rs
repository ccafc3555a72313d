//! Offline unit tests for campdb-db pool configuration and row types.
//! These tests do not require a live database connection.

use campdb_core::{AppConfig, Environment};
use campdb_db::{JobRow, PoolConfig, ReportRow};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let app_config = AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        youtube_api_key: None,
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        youtube_timeout_secs: 30,
        youtube_max_retries: 3,
        import_max_bytes: 10 * 1024 * 1024,
        worker_batch_size: 10,
        api_keys: vec!["test-key".to_string()],
        rate_limit_max_requests: 120,
        rate_limit_window_secs: 60,
    };

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

/// Compile-time smoke test: confirm that [`JobRow`] has all expected fields
/// with the correct types. No database required.
#[test]
fn job_row_has_expected_fields() {
    use chrono::Utc;
    use uuid::Uuid;

    let row = JobRow {
        id: 1_i64,
        public_id: Uuid::new_v4(),
        queue: "reports".to_string(),
        job_type: "generate_report".to_string(),
        payload: serde_json::json!({ "report_id": 7 }),
        status: "pending".to_string(),
        attempts: 0_i32,
        max_attempts: 3_i32,
        last_error: None,
        run_at: Utc::now(),
        started_at: None,
        completed_at: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    assert_eq!(row.queue, "reports");
    assert_eq!(row.job_type, "generate_report");
    assert_eq!(row.status, "pending");
    assert_eq!(row.attempts, 0);
    assert!(row.started_at.is_none());
    assert!(row.last_error.is_none());
}

/// Compile-time smoke test: confirm that [`ReportRow`] has all expected fields
/// with the correct types. No database required.
#[test]
fn report_row_has_expected_fields() {
    use chrono::Utc;
    use uuid::Uuid;

    let row = ReportRow {
        id: 42_i64,
        public_id: Uuid::new_v4(),
        user_id: "user-1".to_string(),
        report_type: "campaign_summary".to_string(),
        format: "json".to_string(),
        status: "queued".to_string(),
        parameters: serde_json::json!({}),
        result: None,
        error_message: None,
        completed_at: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    assert_eq!(row.report_type, "campaign_summary");
    assert_eq!(row.format, "json");
    assert_eq!(row.status, "queued");
    assert!(row.result.is_none());
    assert!(row.completed_at.is_none());
}

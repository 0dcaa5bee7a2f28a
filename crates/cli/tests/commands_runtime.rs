use std::env;
use std::sync::{Mutex, OnceLock};

use lunchly_cli::commands::customers::{self, CustomerCommand};
use lunchly_cli::commands::{config, migrate, seed};
use serde_json::Value;

const MEMORY_DB: &[(&str, &str)] =
    &[("LUNCHLY_DATABASE_URL", "sqlite::memory:"), ("LUNCHLY_DATABASE_MAX_CONNECTIONS", "1")];

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(MEMORY_DB, || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
        assert!(payload.get("data").is_none());
    });
}

#[test]
fn migrate_returns_config_failure_for_non_sqlite_url() {
    with_env(&[("LUNCHLY_DATABASE_URL", "postgres://localhost/lunchly")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_reports_each_demo_customer() {
    with_env(MEMORY_DB, || {
        let result = seed::run();
        assert_eq!(result.exit_code, 0, "expected seed success: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "seed");
        assert_eq!(payload["status"], "ok");

        let message = payload["message"].as_str().expect("message should be a string");
        assert!(message.contains("5 customers"), "unexpected message: {message}");
        assert!(message.contains("1: Anthony Gonzales (3 reservations)"));
        assert!(message.contains("5: Jane Doe (0 reservations)"));
    });
}

#[test]
fn seeded_file_database_is_listed_in_name_order_across_runs() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("lunchly.db").display());

    with_env(&[("LUNCHLY_DATABASE_URL", url.as_str())], || {
        assert_eq!(seed::run().exit_code, 0);
        assert_eq!(seed::run().exit_code, 0, "seeding twice should be harmless");

        let result = customers::run(CustomerCommand::List);
        assert_eq!(result.exit_code, 0, "expected list success: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "customers.list");
        assert_eq!(payload["message"], "5 customers");
        let names: Vec<&str> = payload["data"]
            .as_array()
            .expect("data should be a customer array")
            .iter()
            .filter_map(|customer| customer["full_name"].as_str())
            .collect();
        assert_eq!(
            names,
            vec!["Jane Doe", "Wesley Glenn", "Anthony Gonzales", "Jessica Smith", "Maria Smithers"]
        );

        let reservations = customers::run(CustomerCommand::Reservations { id: 1 });
        assert_eq!(reservations.exit_code, 0);
        let payload = parse_payload(&reservations.output);
        assert_eq!(payload["data"].as_array().map(Vec::len), Some(3));
    });
}

#[test]
fn customers_add_returns_generated_id() {
    with_env(MEMORY_DB, || {
        let result = customers::run(CustomerCommand::Add {
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            phone: Some("555-0100".to_string()),
            notes: None,
        });
        assert_eq!(result.exit_code, 0, "expected add success: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "customers.add");
        assert_eq!(payload["message"], "added Jane Doe");
        assert_eq!(payload["data"]["id"], 1);
        assert_eq!(payload["data"]["phone"], "555-0100");
        assert!(payload["data"]["notes"].is_null());
    });
}

#[test]
fn customers_show_missing_id_exits_with_not_found() {
    with_env(MEMORY_DB, || {
        let result = customers::run(CustomerCommand::Show { id: 9999 });
        assert_eq!(result.exit_code, 6, "expected not-found exit code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "customers.show");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "not_found");
        assert_eq!(payload["message"], "No such customer: 9999");
        assert_eq!(payload["status_code"], 404);
        assert_eq!(payload["user_message"], "The requested record does not exist.");
        let correlation_id =
            payload["correlation_id"].as_str().expect("correlation id should be a string");
        assert!(correlation_id.starts_with("customers.show-"), "got {correlation_id}");
    });
}

#[test]
fn customers_reservations_for_negative_id_exits_with_not_found() {
    with_env(MEMORY_DB, || {
        let result = customers::run(CustomerCommand::Reservations { id: -1 });
        assert_eq!(result.exit_code, 6, "expected not-found exit code: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "not_found");
        assert_eq!(payload["message"], "No such customer: -1");
    });
}

#[test]
fn in_memory_database_ignores_larger_pool_setting() {
    with_env(
        &[("LUNCHLY_DATABASE_URL", "sqlite::memory:"), ("LUNCHLY_DATABASE_MAX_CONNECTIONS", "4")],
        || {
            let result = customers::run(CustomerCommand::List);
            assert_eq!(result.exit_code, 0, "expected list success: {}", result.output);
            assert_eq!(parse_payload(&result.output)["message"], "0 customers");
        },
    );
}

#[test]
fn config_reports_env_sources() {
    with_env(&[("LUNCHLY_DATABASE_URL", "sqlite::memory:"), ("LUNCHLY_LOG_LEVEL", "debug")], || {
        let output = config::run();

        assert!(output.starts_with("effective config"), "unexpected output: {output}");
        assert!(output
            .contains("- database.url = sqlite::memory: (source: env (LUNCHLY_DATABASE_URL))"));
        assert!(output.contains("- logging.level = debug (source: env (LUNCHLY_LOG_LEVEL))"));
        assert!(output.contains("- database.timeout_secs = 30 (source: default)"));
        assert!(output.contains("- logging.format = compact (source: default)"));
    });
}

#[test]
fn config_reports_validation_failure() {
    with_env(&[("LUNCHLY_DATABASE_MAX_CONNECTIONS", "0")], || {
        let output = config::run();

        assert!(output.starts_with("config validation failed:"), "unexpected output: {output}");
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid json")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "LUNCHLY_DATABASE_URL",
        "LUNCHLY_DATABASE_MAX_CONNECTIONS",
        "LUNCHLY_DATABASE_TIMEOUT_SECS",
        "LUNCHLY_LOGGING_LEVEL",
        "LUNCHLY_LOGGING_FORMAT",
        "LUNCHLY_LOG_LEVEL",
        "LUNCHLY_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}

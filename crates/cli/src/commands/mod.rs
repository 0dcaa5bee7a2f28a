pub mod config;
pub mod customers;
pub mod migrate;
pub mod seed;

use std::future::Future;

use lunchly_core::chrono::Utc;
use lunchly_core::config::{AppConfig, LoadOptions};
use lunchly_core::errors::InterfaceError;
use lunchly_db::{connect_with_settings, migrations, DbPool};
use serde::Serialize;

use crate::commands::customers::CommandData;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<CommandData>,
}

impl CommandOutcome {
    fn new(command: &str, status: &str, message: String) -> Self {
        Self {
            command: command.to_string(),
            status: status.to_string(),
            error_class: None,
            message,
            status_code: None,
            user_message: None,
            correlation_id: None,
            data: None,
        }
    }
}

/// A failed step inside [`with_database`], mapped to its exit code.
#[derive(Debug)]
pub(crate) struct StepFailure {
    pub(crate) error_class: &'static str,
    pub(crate) message: String,
    pub(crate) exit_code: u8,
    pub(crate) interface: Option<InterfaceError>,
}

impl StepFailure {
    pub(crate) fn new(
        error_class: &'static str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        Self { error_class, message: message.into(), exit_code, interface: None }
    }

    /// Carries the interface error so its status and user message reach the payload.
    pub(crate) fn from_interface(
        error_class: &'static str,
        error: InterfaceError,
        exit_code: u8,
    ) -> Self {
        Self {
            error_class,
            message: error.detail().to_string(),
            exit_code,
            interface: Some(error),
        }
    }
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::ok(command, message.into(), None)
    }

    pub fn success_with_data(command: &str, message: impl Into<String>, data: CommandData) -> Self {
        Self::ok(command, message.into(), Some(data))
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let mut payload = CommandOutcome::new(command, "error", message.into());
        payload.error_class = Some(error_class.to_string());
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub(crate) fn from_step(command: &str, failure: StepFailure) -> Self {
        let mut payload = CommandOutcome::new(command, "error", failure.message);
        payload.error_class = Some(failure.error_class.to_string());
        if let Some(interface) = failure.interface {
            payload.status_code = Some(interface.status_code());
            payload.user_message = Some(interface.user_message().to_string());
            payload.correlation_id = Some(interface.correlation_id().to_string());
        }
        Self { exit_code: failure.exit_code, output: serialize_payload(payload) }
    }

    fn ok(command: &str, message: String, data: Option<CommandData>) -> Self {
        let mut payload = CommandOutcome::new(command, "ok", message);
        payload.data = data;
        Self { exit_code: 0, output: serialize_payload(payload) }
    }
}

/// Identifies one command invocation in failure payloads and logs.
pub(crate) fn correlation_id(command: &str) -> String {
    format!("{command}-{}-{}", std::process::id(), Utc::now().timestamp_millis())
}

/// Loads config, opens a migrated pool, and runs `work` on a single-threaded
/// runtime. The pool is closed before returning.
pub(crate) fn with_database<T, F, Fut>(command: &str, work: F) -> Result<T, CommandResult>
where
    F: FnOnce(DbPool) -> Fut,
    Fut: Future<Output = Result<T, StepFailure>>,
{
    let config = AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            2,
        )
    })?;

    let runtime =
        tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
            CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            )
        })?;

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.pool_size(),
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| StepFailure::new("db_connectivity", error.to_string(), 4))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| StepFailure::new("migration", error.to_string(), 5))?;

        let outcome = work(pool.clone()).await;
        pool.close().await;
        outcome
    });

    result.map_err(|failure| CommandResult::from_step(command, failure))
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

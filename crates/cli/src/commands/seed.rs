use lunchly_db::{SeedDataset, SeededCustomer};

use crate::commands::{with_database, CommandResult, StepFailure};

pub fn run() -> CommandResult {
    let result = with_database("seed", |pool| async move {
        let seed_result = SeedDataset::load(&pool)
            .await
            .map_err(|error| StepFailure::new("seed_execution", error.to_string(), 5))?;

        let verification = SeedDataset::verify(&pool)
            .await
            .map_err(|error| StepFailure::new("seed_verification", error.to_string(), 5))?;

        if !verification.all_present {
            let failed_checks = failed_check_labels(&verification.checks);
            let message = verification_failure_message(&failed_checks);
            return Err(StepFailure::new("seed_verification", message, 5));
        }

        Ok(seed_result.customers_seeded)
    });

    match result {
        Ok(customers) => CommandResult::success("seed", seeded_summary(&customers)),
        Err(failure) => failure,
    }
}

fn failed_check_labels(checks: &[(&'static str, bool)]) -> Vec<&'static str> {
    checks.iter().filter_map(|(check, passed)| (!passed).then_some(*check)).collect()
}

fn verification_failure_message(failed_checks: &[&str]) -> String {
    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed_checks.join(", "))
    }
}

fn seeded_summary(customers: &[SeededCustomer]) -> String {
    let lines: Vec<String> = customers
        .iter()
        .map(|customer| {
            format!(
                "  - {}: {} ({} reservations)",
                customer.id, customer.full_name, customer.reservations
            )
        })
        .collect();
    format!("demo dataset loaded with {} customers:\n{}", customers.len(), lines.join("\n"))
}

use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Canonical demo customers and how many reservations each one holds.
const SEED_CUSTOMERS: &[SeedCustomerContract] = &[
    SeedCustomerContract {
        id: 1,
        first_name: "Anthony",
        last_name: "Gonzales",
        expected_reservations: 3,
        reservation_label: "gonzales-reservation-count",
    },
    SeedCustomerContract {
        id: 2,
        first_name: "Jessica",
        last_name: "Smith",
        expected_reservations: 1,
        reservation_label: "smith-reservation-count",
    },
    SeedCustomerContract {
        id: 3,
        first_name: "Wesley",
        last_name: "Glenn",
        expected_reservations: 1,
        reservation_label: "glenn-reservation-count",
    },
    SeedCustomerContract {
        id: 4,
        first_name: "Maria",
        last_name: "Smithers",
        expected_reservations: 0,
        reservation_label: "smithers-reservation-count",
    },
    SeedCustomerContract {
        id: 5,
        first_name: "Jane",
        last_name: "Doe",
        expected_reservations: 0,
        reservation_label: "doe-reservation-count",
    },
];

const SEED_RESERVATION_IDS: &[i64] = &[1, 2, 3, 4, 5];

/// Demo dataset for local runs and end-to-end checks.
pub struct SeedDataset;

impl SeedDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/lunchly_seed.sql");

    /// Load the dataset. Rows are upserted by fixed id, so loading twice is harmless.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;

        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        let customers_seeded = SEED_CUSTOMERS
            .iter()
            .map(|customer| SeededCustomer {
                id: customer.id,
                full_name: format!("{} {}", customer.first_name, customer.last_name),
                reservations: customer.expected_reservations,
            })
            .collect::<Vec<_>>();

        Ok(SeedResult { customers_seeded, reservations_seeded: SEED_RESERVATION_IDS.len() })
    }

    /// Verify that every seeded customer exists with its expected reservation count.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for customer in SEED_CUSTOMERS {
            let exists: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM customers WHERE id = ?1 AND first_name = ?2 AND last_name = ?3)",
            )
            .bind(customer.id)
            .bind(customer.first_name)
            .bind(customer.last_name)
            .fetch_one(pool)
            .await?;
            checks.push((customer.last_name, exists == 1));

            let reservations: i64 =
                sqlx::query_scalar("SELECT COUNT(1) FROM reservations WHERE customer_id = ?1")
                    .bind(customer.id)
                    .fetch_one(pool)
                    .await?;
            checks.push((
                customer.reservation_label,
                reservations == customer.expected_reservations,
            ));
        }

        let all_present = checks.iter().all(|(_, passed)| *passed);
        Ok(VerificationResult { all_present, checks })
    }

    /// Remove seeded rows from a test database.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;

        for id in SEED_RESERVATION_IDS.iter().copied() {
            sqlx::query("DELETE FROM reservations WHERE id = ?1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        for customer in SEED_CUSTOMERS {
            sqlx::query("DELETE FROM customers WHERE id = ?1")
                .bind(customer.id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedCustomerContract {
    id: i64,
    first_name: &'static str,
    last_name: &'static str,
    expected_reservations: i64,
    reservation_label: &'static str,
}

#[derive(Debug)]
pub struct SeedResult {
    pub customers_seeded: Vec<SeededCustomer>,
    pub reservations_seeded: usize,
}

#[derive(Debug)]
pub struct SeededCustomer {
    pub id: i64,
    pub full_name: String,
    pub reservations: i64,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

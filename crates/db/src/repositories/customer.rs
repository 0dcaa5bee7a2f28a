use std::sync::Arc;

use sqlx::{sqlite::SqliteRow, Row};
use tracing::debug;

use lunchly_core::domain::customer::{Customer, CustomerId};
use lunchly_core::domain::reservation::Reservation;

use super::{CustomerRepository, RepositoryError, ReservationRepository, SqlReservationRepository};
use crate::DbPool;

pub struct SqlCustomerRepository {
    pool: DbPool,
    reservations: Arc<dyn ReservationRepository>,
}

impl SqlCustomerRepository {
    pub fn new(pool: DbPool, reservations: Arc<dyn ReservationRepository>) -> Self {
        Self { pool, reservations }
    }

    /// Wires reservation lookups to the same pool.
    pub fn with_sql_reservations(pool: DbPool) -> Self {
        let reservations = Arc::new(SqlReservationRepository::new(pool.clone()));
        Self::new(pool, reservations)
    }
}

fn row_to_customer(row: &SqliteRow) -> Result<Customer, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let first_name: String =
        row.try_get("first_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let last_name: String =
        row.try_get("last_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let phone: Option<String> =
        row.try_get("phone").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let notes: Option<String> =
        row.try_get("notes").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(Customer { id: Some(CustomerId(id)), first_name, last_name, phone, notes })
}

/// `needle` must already be lowercased.
fn name_matches(customer: &Customer, needle: &str) -> bool {
    customer.first_name.to_lowercase().contains(needle)
        || customer.last_name.to_lowercase().contains(needle)
}

#[async_trait::async_trait]
impl CustomerRepository for SqlCustomerRepository {
    async fn list_all(&self) -> Result<Vec<Customer>, RepositoryError> {
        let rows: Vec<SqliteRow> = sqlx::query(
            "SELECT id, first_name, last_name, phone, notes
             FROM customers
             ORDER BY last_name, first_name",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_customer).collect::<Result<Vec<_>, _>>()
    }

    async fn get_by_id(&self, id: &CustomerId) -> Result<Customer, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, first_name, last_name, phone, notes
             FROM customers WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => row_to_customer(r),
            None => {
                debug!(
                    event_name = "db.customer.not_found",
                    customer_id = id.0,
                    "no such customer"
                );
                Err(RepositoryError::not_found("customer", id.0))
            }
        }
    }

    async fn search_by_name(&self, name: &str) -> Result<Vec<Customer>, RepositoryError> {
        // SQLite's LOWER and LIKE only fold ASCII, so matching happens here.
        let needle = name.to_lowercase();
        let customers = self.list_all().await?;

        Ok(customers.into_iter().filter(|customer| name_matches(customer, &needle)).collect())
    }

    async fn top_n(&self, n: u32) -> Result<Vec<Customer>, RepositoryError> {
        // Ascending: customers with the fewest reservations come first.
        let rows: Vec<SqliteRow> = sqlx::query(
            "SELECT c.id, c.first_name, c.last_name, c.phone, c.notes,
                    COUNT(r.id) AS num_reservations
             FROM customers c
             LEFT JOIN reservations r ON c.id = r.customer_id
             GROUP BY c.id, c.first_name, c.last_name, c.phone, c.notes
             ORDER BY num_reservations
             LIMIT ?",
        )
        .bind(n)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_customer).collect::<Result<Vec<_>, _>>()
    }

    async fn reservations(
        &self,
        customer: &Customer,
    ) -> Result<Vec<Reservation>, RepositoryError> {
        match customer.id {
            Some(ref id) => self.reservations.list_for_customer(id).await,
            None => Ok(Vec::new()),
        }
    }

    async fn save(&self, customer: Customer) -> Result<Customer, RepositoryError> {
        let Some(id) = customer.id else {
            let row = sqlx::query(
                "INSERT INTO customers (first_name, last_name, phone, notes)
                 VALUES (?, ?, ?, ?)
                 RETURNING id",
            )
            .bind(&customer.first_name)
            .bind(&customer.last_name)
            .bind(&customer.phone)
            .bind(&customer.notes)
            .fetch_one(&self.pool)
            .await?;

            let id: i64 = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            debug!(event_name = "db.customer.inserted", customer_id = id, "customer inserted");
            return Ok(Customer { id: Some(CustomerId(id)), ..customer });
        };

        sqlx::query(
            "UPDATE customers SET first_name = ?, last_name = ?, phone = ?, notes = ?
             WHERE id = ?",
        )
        .bind(&customer.first_name)
        .bind(&customer.last_name)
        .bind(&customer.phone)
        .bind(&customer.notes)
        .bind(id.0)
        .execute(&self.pool)
        .await?;

        debug!(event_name = "db.customer.updated", customer_id = id.0, "customer updated");
        Ok(customer)
    }
}

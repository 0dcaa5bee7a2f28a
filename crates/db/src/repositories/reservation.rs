use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};
use tracing::debug;

use lunchly_core::domain::customer::CustomerId;
use lunchly_core::domain::reservation::{Reservation, ReservationId};

use super::{RepositoryError, ReservationRepository};
use crate::DbPool;

pub struct SqlReservationRepository {
    pool: DbPool,
}

impl SqlReservationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_reservation(row: &SqliteRow) -> Result<Reservation, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let customer_id: i64 =
        row.try_get("customer_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let start_at_str: String =
        row.try_get("start_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let num_guests: i64 =
        row.try_get("num_guests").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let notes: Option<String> =
        row.try_get("notes").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let start_at = DateTime::parse_from_rfc3339(&start_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            RepositoryError::Decode(format!("reservation {id} has invalid start_at: {e}"))
        })?;

    Ok(Reservation {
        id: Some(ReservationId(id)),
        customer_id: CustomerId(customer_id),
        start_at,
        num_guests,
        notes,
    })
}

#[async_trait::async_trait]
impl ReservationRepository for SqlReservationRepository {
    async fn list_for_customer(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Vec<Reservation>, RepositoryError> {
        let rows: Vec<SqliteRow> = sqlx::query(
            "SELECT id, customer_id, start_at, num_guests, notes
             FROM reservations
             WHERE customer_id = ?
             ORDER BY start_at",
        )
        .bind(customer_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_reservation).collect::<Result<Vec<_>, _>>()
    }

    async fn get_by_id(&self, id: &ReservationId) -> Result<Reservation, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, customer_id, start_at, num_guests, notes
             FROM reservations WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => row_to_reservation(r),
            None => Err(RepositoryError::not_found("reservation", id.0)),
        }
    }

    async fn save(&self, reservation: Reservation) -> Result<Reservation, RepositoryError> {
        let start_at_str = reservation.start_at.to_rfc3339();

        let Some(id) = reservation.id else {
            let row = sqlx::query(
                "INSERT INTO reservations (customer_id, start_at, num_guests, notes)
                 VALUES (?, ?, ?, ?)
                 RETURNING id",
            )
            .bind(reservation.customer_id.0)
            .bind(&start_at_str)
            .bind(reservation.num_guests)
            .bind(&reservation.notes)
            .fetch_one(&self.pool)
            .await?;

            let id: i64 = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            debug!(
                event_name = "db.reservation.inserted",
                reservation_id = id,
                customer_id = reservation.customer_id.0,
                "reservation inserted"
            );
            return Ok(Reservation { id: Some(ReservationId(id)), ..reservation });
        };

        sqlx::query(
            "UPDATE reservations SET customer_id = ?, start_at = ?, num_guests = ?, notes = ?
             WHERE id = ?",
        )
        .bind(reservation.customer_id.0)
        .bind(&start_at_str)
        .bind(reservation.num_guests)
        .bind(&reservation.notes)
        .bind(id.0)
        .execute(&self.pool)
        .await?;

        Ok(reservation)
    }
}

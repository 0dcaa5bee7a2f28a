use std::collections::BTreeMap;

use tokio::sync::RwLock;

use lunchly_core::domain::customer::CustomerId;
use lunchly_core::domain::reservation::{Reservation, ReservationId};

use super::{RepositoryError, ReservationRepository};

/// Reservation store backed by a map, for wiring customer repositories in
/// tests without a reservations table.
#[derive(Default)]
pub struct InMemoryReservationRepository {
    reservations: RwLock<BTreeMap<i64, Reservation>>,
}

#[async_trait::async_trait]
impl ReservationRepository for InMemoryReservationRepository {
    async fn list_for_customer(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Vec<Reservation>, RepositoryError> {
        let reservations = self.reservations.read().await;
        let mut found: Vec<Reservation> = reservations
            .values()
            .filter(|reservation| reservation.customer_id == *customer_id)
            .cloned()
            .collect();
        found.sort_by_key(|reservation| reservation.start_at);
        Ok(found)
    }

    async fn get_by_id(&self, id: &ReservationId) -> Result<Reservation, RepositoryError> {
        let reservations = self.reservations.read().await;
        reservations
            .get(&id.0)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found("reservation", id.0))
    }

    async fn save(&self, reservation: Reservation) -> Result<Reservation, RepositoryError> {
        let mut reservations = self.reservations.write().await;
        let saved = match reservation.id {
            Some(_) => reservation,
            None => {
                let next_id = reservations.keys().next_back().copied().unwrap_or(0) + 1;
                Reservation { id: Some(ReservationId(next_id)), ..reservation }
            }
        };
        if let Some(id) = saved.id {
            reservations.insert(id.0, saved.clone());
        }
        Ok(saved)
    }
}

use async_trait::async_trait;
use thiserror::Error;

use lunchly_core::domain::customer::{Customer, CustomerId};
use lunchly_core::domain::reservation::{Reservation, ReservationId};
use lunchly_core::errors::ApplicationError;

pub mod customer;
pub mod memory;
pub mod reservation;

pub use customer::SqlCustomerRepository;
pub use memory::InMemoryReservationRepository;
pub use reservation::SqlReservationRepository;

pub const NOT_FOUND_STATUS: u16 = 404;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("No such {entity}: {id}")]
    NotFound { entity: &'static str, id: i64, status: u16 },
}

impl RepositoryError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id, status: NOT_FOUND_STATUS }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// HTTP-equivalent status for the calling layer. Anything other than an
    /// explicit not-found is an unhandled failure.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound { status, .. } => *status,
            Self::Database(_) | Self::Decode(_) => 500,
        }
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        let message = value.to_string();
        match value {
            RepositoryError::NotFound { status, .. } => {
                ApplicationError::NotFound { message, status }
            }
            RepositoryError::Database(_) | RepositoryError::Decode(_) => {
                ApplicationError::Persistence(message)
            }
        }
    }
}

#[async_trait]
pub trait CustomerRepository: Send + Sync {
    /// All customers ordered by last name, then first name.
    async fn list_all(&self) -> Result<Vec<Customer>, RepositoryError>;

    /// Fails with [`RepositoryError::NotFound`] when no row matches.
    async fn get_by_id(&self, id: &CustomerId) -> Result<Customer, RepositoryError>;

    /// Case-insensitive substring match on first or last name.
    async fn search_by_name(&self, name: &str) -> Result<Vec<Customer>, RepositoryError>;

    /// The `n` customers with the fewest reservations, fewest first.
    async fn top_n(&self, n: u32) -> Result<Vec<Customer>, RepositoryError>;

    async fn reservations(&self, customer: &Customer)
        -> Result<Vec<Reservation>, RepositoryError>;

    /// Inserts a new customer or overwrites every field of an existing one,
    /// returning the persisted value.
    async fn save(&self, customer: Customer) -> Result<Customer, RepositoryError>;
}

#[async_trait]
pub trait ReservationRepository: Send + Sync {
    async fn list_for_customer(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Vec<Reservation>, RepositoryError>;

    async fn get_by_id(&self, id: &ReservationId) -> Result<Reservation, RepositoryError>;

    async fn save(&self, reservation: Reservation) -> Result<Reservation, RepositoryError>;
}

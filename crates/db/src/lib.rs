pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_with_settings, DbPool};
pub use fixtures::{SeedDataset, SeedResult, SeededCustomer, VerificationResult};
pub use repositories::{
    CustomerRepository, InMemoryReservationRepository, RepositoryError, ReservationRepository,
    SqlCustomerRepository, SqlReservationRepository,
};

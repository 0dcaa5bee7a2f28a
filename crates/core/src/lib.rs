pub mod config;
pub mod domain;
pub mod errors;

pub use chrono;

pub use domain::customer::{Customer, CustomerId};
pub use domain::reservation::{Reservation, ReservationId};
pub use errors::{ApplicationError, InterfaceError};

pub mod customer;
pub mod reservation;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::customer::CustomerId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReservationId(pub i64);

impl std::fmt::Display for ReservationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A booking held by one customer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Option<ReservationId>,
    pub customer_id: CustomerId,
    pub start_at: DateTime<Utc>,
    pub num_guests: i64,
    pub notes: Option<String>,
}

impl Reservation {
    pub fn new(customer_id: CustomerId, start_at: DateTime<Utc>, num_guests: i64) -> Self {
        Self { id: None, customer_id, start_at, num_guests, notes: None }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

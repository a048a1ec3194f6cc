//! Message broadcasting
//!
//! Fans server messages out to recipient sets without blocking on slow peers.

mod router;

pub use router::{BroadcastRouter, DeliveryReport};

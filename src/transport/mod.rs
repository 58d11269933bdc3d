//! Transport adapters (TCP).

mod tcp;

pub use tcp::{bind, next_conn_id};

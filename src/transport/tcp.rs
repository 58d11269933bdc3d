//! TCP listener plumbing: bind helpers and connection identity.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::net::TcpListener;

use crate::error::Result;
use crate::relay::ConnId;

/// Process-wide connection counter; ids are never reused.
static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

/// Assign the next connection identifier.
pub fn next_conn_id() -> ConnId {
    ConnId(NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed))
}

/// Bind a listener, logging the resolved local address.
pub async fn bind(addr: SocketAddr, role: &str) -> Result<TcpListener> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(role, local_addr = %listener.local_addr()?, "listener bound");
    Ok(listener)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conn_ids_monotonic() {
        let a = next_conn_id();
        let b = next_conn_id();
        assert!(b.0 > a.0);
    }

    #[tokio::test]
    async fn test_bind_ephemeral() {
        let listener = bind("127.0.0.1:0".parse().unwrap(), "test").await.unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }
}

// SPDX-License-Identifier: MIT

//! Free-port finder (§4.2 C1): ask the OS for an unused loopback port by
//! binding to port 0 and immediately releasing it.

use std::io;
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Binds an ephemeral port on `127.0.0.1`, reads back the OS-assigned port,
/// then drops the listener so the caller's own bind can claim it. There is
/// an inherent (small) TOCTOU window between this call returning and the
/// caller binding the same port; acceptable here because the caller binds
/// immediately afterward in the same process.
pub async fn find_free_port() -> io::Result<u16> {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    Ok(addr.port())
}

/// Finds `count` distinct free ports by holding each listener open until all
/// have been chosen, avoiding the OS handing the same ephemeral port back
/// twice in one call.
pub async fn find_free_ports(count: usize) -> io::Result<Vec<u16>> {
    let mut listeners = Vec::with_capacity(count);
    for _ in 0..count {
        listeners.push(TcpListener::bind(("127.0.0.1", 0)).await?);
    }
    listeners
        .iter()
        .map(|listener| listener.local_addr().map(|addr| addr.port()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn finds_a_bindable_port() {
        let port = find_free_port().await.unwrap();
        assert!(port > 0);
        // Must actually be bindable now that the finder's listener is dropped.
        let listener = TcpListener::bind(("127.0.0.1", port)).await.unwrap();
        assert_eq!(listener.local_addr().unwrap().port(), port);
    }

    #[tokio::test]
    async fn finds_distinct_ports() {
        let ports = find_free_ports(3).await.unwrap();
        assert_eq!(ports.len(), 3);
        let mut sorted = ports.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 3);
    }
}

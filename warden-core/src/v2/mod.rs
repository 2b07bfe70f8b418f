//! Versioned wire-protocol generation: length-prefixed JSON frames
//! with a key-exchange handshake and token authentication.

pub mod commands;
mod connection;
mod framing;
mod socket;

pub use connection::Connection;

use crate::pool::{ConnectionPool, PoolOptions};

/// Build a pool of versioned connections. The versioned server keeps
/// few sessions happy; default bounds are 1 open / 1 idle.
pub fn connection_pool(
    host: impl Into<String>,
    port: u16,
    password: impl Into<String>,
) -> ConnectionPool<Connection> {
    connection_pool_with(
        host,
        port,
        password,
        PoolOptions {
            max_open: 1,
            max_idle: 1,
        },
    )
}

/// Build a pool of versioned connections with explicit bounds.
pub fn connection_pool_with(
    host: impl Into<String>,
    port: u16,
    password: impl Into<String>,
    options: PoolOptions,
) -> ConnectionPool<Connection> {
    let host = host.into();
    let password = password.into();
    ConnectionPool::new(options, move || {
        let host = host.clone();
        let password = password.clone();
        Box::pin(async move { Connection::open(host, port, password).await })
    })
}

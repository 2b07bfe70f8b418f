//! Legacy wire-protocol generation: XOR-ciphered free-text commands
//! with tab-delimited lists and inferred response boundaries.

mod connection;
mod data;
pub mod maps;
mod socket;

pub use connection::Connection;
pub use data::{
    AdminId, GameScore, GameState, PlayerCount, PlayerId, PlayerInfo, Score, Unit,
};

use crate::pool::{ConnectionPool, PoolOptions};

/// Build a pool of legacy connections. Defaults to 10 open / 10 idle.
pub fn connection_pool(
    host: impl Into<String>,
    port: u16,
    password: impl Into<String>,
) -> ConnectionPool<Connection> {
    connection_pool_with(host, port, password, PoolOptions::default())
}

/// Build a pool of legacy connections with explicit bounds.
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

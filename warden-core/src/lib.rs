//! Client library for the remote-administration channel of a game
//! server.
//!
//! The server speaks two wire-protocol generations over TCP: a legacy
//! XOR-ciphered free-text protocol ([`v1`]) and a length-prefixed
//! JSON protocol with a key-exchange handshake and token
//! authentication ([`v2`]). On top of the sockets sit a bounded
//! [`pool`](ConnectionPool) that loans each connection to exactly one
//! caller at a time, and a [`LogLoop`](logs::LogLoop) that polls the
//! admin log and delivers deduplicated batches of structured events.
//!
//! ```no_run
//! use warden_core::{Deadline, v1};
//!
//! # async fn demo() -> Result<(), warden_core::RconError> {
//! let pool = v1::connection_pool("203.0.113.7", 27020, "hunter2");
//! let mut conn = pool.get(Deadline::none()).await?;
//! let (players, cap) = conn.slots().await?;
//! println!("{players}/{cap} players online");
//! # Ok(())
//! # }
//! ```

mod cipher;
mod config;
mod deadline;
mod error;
mod pool;

pub mod logs;
pub mod v1;
pub mod v2;

pub use config::{LogConfig, PoolConfig, RconConfig, ServerConfig};
pub use deadline::{Deadline, DEFAULT_ACQUIRE_TIMEOUT, DEFAULT_IO_TIMEOUT};
pub use error::RconError;
pub use pool::{ConnectionPool, PoolOptions, Pooled, PooledConnection};

pub type Result<T, E = RconError> = std::result::Result<T, E>;

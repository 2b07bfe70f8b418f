//! Bounded pool of protocol connections.
//!
//! The pool enforces the library's central invariant: a connection is
//! loaned to at most one caller at a time. Open count is capped,
//! returned connections are cached warm up to an idle limit, and
//! callers arriving at capacity park in a strict-FIFO queue that a
//! return serves before the idle cache.
//!
//! The mutex guards O(1) bookkeeping only; no I/O happens under it.

use std::collections::{HashMap, VecDeque};
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use tokio::sync::oneshot;
use tracing::debug;

use crate::deadline::Deadline;
use crate::error::RconError;

/// What a connection must offer to live in a pool.
pub trait Pooled: Send + 'static {
    /// Identity within the idle table. Unique per pool instance.
    fn id(&self) -> u64;

    /// Push the caller's deadline down onto the transport so it
    /// bounds every I/O operation of the loan.
    fn set_deadline(&mut self, deadline: Deadline);
}

/// Connection ids only need to be unique within one pool; nanoseconds
/// since the epoch are plenty.
pub(crate) fn connection_id() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

/// Pool bounds. `max_idle` is clamped to `max_open`.
#[derive(Debug, Clone, Copy)]
pub struct PoolOptions {
    pub max_open: usize,
    pub max_idle: usize,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_open: 10,
            max_idle: 10,
        }
    }
}

type Factory<C> = Box<dyn Fn() -> BoxFuture<'static, Result<C, RconError>> + Send + Sync>;

/// Bounded factory and cache of connections. Cheap to clone; clones
/// share the same pool.
pub struct ConnectionPool<C: Pooled> {
    inner: Arc<PoolInner<C>>,
}

impl<C: Pooled> Clone for ConnectionPool<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct PoolInner<C: Pooled> {
    factory: Factory<C>,
    state: Mutex<PoolState<C>>,
}

struct PoolState<C> {
    max_open: usize,
    max_idle: usize,
    num_open: usize,
    idle: HashMap<u64, C>,
    waiters: VecDeque<oneshot::Sender<C>>,
    closed: bool,
}

enum Acquire<C> {
    Idle(C),
    Open,
    Wait(oneshot::Receiver<C>),
}

impl<C: Pooled> ConnectionPool<C> {
    /// Build a pool over a connection factory. The factory performs
    /// the full connect-and-handshake for one fresh connection.
    pub fn new<F>(options: PoolOptions, factory: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, Result<C, RconError>> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(PoolInner {
                factory: Box::new(factory),
                state: Mutex::new(PoolState {
                    max_open: options.max_open.max(1),
                    max_idle: options.max_idle.min(options.max_open.max(1)),
                    num_open: 0,
                    idle: HashMap::new(),
                    waiters: VecDeque::new(),
                    closed: false,
                }),
            }),
        }
    }

    /// Acquire a connection: any idle one, a freshly opened one while
    /// under the cap, or — at capacity — a parked wait for a return.
    ///
    /// The wait is bounded by the caller's deadline (default 5 s);
    /// expiry surfaces [`RconError::PoolTimeout`]. A waiter that gave
    /// up does not corrupt the queue: a later return skips it.
    pub async fn get(&self, deadline: Deadline) -> Result<PooledConnection<C>, RconError> {
        let action = {
            let mut st = self.inner.state.lock().expect("pool mutex");
            if st.closed {
                return Err(RconError::PoolClosed);
            }
            if let Some(&id) = st.idle.keys().next() {
                debug!(id, idle = st.idle.len(), "pool: serving from idle cache");
                Acquire::Idle(st.idle.remove(&id).expect("idle entry"))
            } else if st.num_open < st.max_open {
                st.num_open += 1;
                debug!(open = st.num_open, "pool: opening fresh connection");
                Acquire::Open
            } else {
                let (tx, rx) = oneshot::channel();
                st.waiters.push_back(tx);
                debug!(queued = st.waiters.len(), "pool: at capacity, parking waiter");
                Acquire::Wait(rx)
            }
        };

        match action {
            Acquire::Idle(mut conn) => {
                conn.set_deadline(deadline);
                Ok(self.loaned(conn))
            }
            Acquire::Open => match (self.inner.factory)().await {
                Ok(mut conn) => {
                    conn.set_deadline(deadline);
                    Ok(self.loaned(conn))
                }
                Err(e) => {
                    let mut st = self.inner.state.lock().expect("pool mutex");
                    st.num_open -= 1;
                    Err(e)
                }
            },
            Acquire::Wait(rx) => match tokio::time::timeout_at(deadline.acquire_at(), rx).await {
                Ok(Ok(mut conn)) => {
                    conn.set_deadline(deadline);
                    Ok(self.loaned(conn))
                }
                Ok(Err(_)) => Err(RconError::PoolClosed),
                Err(_) => Err(RconError::PoolTimeout),
            },
        }
    }

    /// Acquire, run `f` with the loaned connection, and return it on
    /// every exit path — the loan guard guarantees the return even
    /// when `f` errors, the future is dropped, or the task unwinds.
    pub async fn with_connection<T, F, Fut>(&self, deadline: Deadline, f: F) -> Result<T, RconError>
    where
        F: FnOnce(PooledConnection<C>) -> Fut,
        Fut: std::future::Future<Output = Result<T, RconError>>,
    {
        let conn = self.get(deadline).await?;
        f(conn).await
    }

    /// Raise or lower the cap on open connections. Affects subsequent
    /// acquisitions only; parked waiters are not re-evaluated.
    pub fn set_pool_size(&self, max_open: usize) {
        let mut st = self.inner.state.lock().expect("pool mutex");
        debug!(old = st.max_open, new = max_open, "pool: set max open");
        st.max_open = max_open.max(1);
        st.max_idle = st.max_idle.min(st.max_open);
    }

    /// Adjust the idle cache size, clamped to the open cap.
    pub fn set_max_idle(&self, max_idle: usize) {
        let mut st = self.inner.state.lock().expect("pool mutex");
        let clamped = max_idle.min(st.max_open);
        debug!(old = st.max_idle, new = clamped, "pool: set max idle");
        st.max_idle = clamped;
    }

    /// Close every idle connection and refuse further acquisitions.
    /// Loaned connections stay with their callers and are closed on
    /// return.
    pub fn shutdown(&self) {
        let dropped = {
            let mut st = self.inner.state.lock().expect("pool mutex");
            st.closed = true;
            // Dropping the senders fails every parked waiter.
            st.waiters.clear();
            let drained: Vec<C> = st.idle.drain().map(|(_, c)| c).collect();
            st.num_open -= drained.len();
            drained
        };
        debug!(closed = dropped.len(), "pool: shut down");
        drop(dropped);
    }

    /// Current (in-use, idle) counts. Test and diagnostics hook.
    pub fn counts(&self) -> (usize, usize) {
        let st = self.inner.state.lock().expect("pool mutex");
        (st.num_open - st.idle.len(), st.idle.len())
    }

    fn loaned(&self, conn: C) -> PooledConnection<C> {
        PooledConnection {
            conn: Some(conn),
            inner: Arc::clone(&self.inner),
            discard: false,
        }
    }
}

impl<C: Pooled> PoolInner<C> {
    /// Return path: prefer the queue head, then the idle cache, then
    /// close. Waiters that stopped listening are skipped.
    fn release(&self, conn: C) {
        let mut st = self.state.lock().expect("pool mutex");
        if st.closed {
            st.num_open -= 1;
            return;
        }
        let mut conn = conn;
        while let Some(waiter) = st.waiters.pop_front() {
            match waiter.send(conn) {
                Ok(()) => {
                    debug!("pool: handing returned connection to waiter");
                    return;
                }
                Err(back) => conn = back,
            }
        }
        if st.idle.len() < st.max_idle {
            debug!(id = conn.id(), "pool: caching returned connection");
            st.idle.insert(conn.id(), conn);
        } else {
            debug!(id = conn.id(), "pool: idle cache full, closing");
            st.num_open -= 1;
        }
    }

    /// Drop a suspect connection without re-idling it.
    fn forget(&self, conn: C) {
        let mut st = self.state.lock().expect("pool mutex");
        st.num_open -= 1;
        debug!(id = conn.id(), "pool: discarding connection");
    }
}

/// A connection on loan from the pool.
///
/// Dereferences to the protocol connection. Dropping the guard hands
/// the connection back; [`discard`](Self::discard) closes it instead,
/// for sockets left in an undefined protocol state.
pub struct PooledConnection<C: Pooled> {
    conn: Option<C>,
    inner: Arc<PoolInner<C>>,
    discard: bool,
}

impl<C: Pooled> PooledConnection<C> {
    /// Close this connection on return instead of re-idling it.
    pub fn discard(mut self) {
        self.discard = true;
    }
}

impl<C: Pooled> Deref for PooledConnection<C> {
    type Target = C;

    fn deref(&self) -> &C {
        self.conn.as_ref().expect("loaned connection present")
    }
}

impl<C: Pooled> DerefMut for PooledConnection<C> {
    fn deref_mut(&mut self) -> &mut C {
        self.conn.as_mut().expect("loaned connection present")
    }
}

impl<C: Pooled> Drop for PooledConnection<C> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            if self.discard {
                self.inner.forget(conn);
            } else {
                self.inner.release(conn);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::time::Duration;

    struct TestConn {
        id: u64,
    }

    impl Pooled for TestConn {
        fn id(&self) -> u64 {
            self.id
        }

        fn set_deadline(&mut self, _deadline: Deadline) {}
    }

    fn test_pool(max_open: usize, max_idle: usize) -> (ConnectionPool<TestConn>, Arc<AtomicUsize>) {
        let opened = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&opened);
        let ids = Arc::new(AtomicU64::new(1));
        let pool = ConnectionPool::new(
            PoolOptions { max_open, max_idle },
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                let id = ids.fetch_add(1, Ordering::SeqCst);
                Box::pin(async move { Ok(TestConn { id }) })
            },
        );
        (pool, opened)
    }

    #[tokio::test]
    async fn reuses_idle_connections() {
        let (pool, opened) = test_pool(2, 2);

        let first = pool.get(Deadline::none()).await.unwrap();
        let first_id = first.id();
        drop(first);

        let second = pool.get(Deadline::none()).await.unwrap();
        assert_eq!(second.id(), first_id);
        assert_eq!(opened.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn open_count_never_exceeds_cap() {
        let (pool, opened) = test_pool(2, 2);

        let a = pool.get(Deadline::none()).await.unwrap();
        let b = pool.get(Deadline::none()).await.unwrap();
        assert_eq!(pool.counts(), (2, 0));

        let res = pool.get(Deadline::after(Duration::from_millis(50))).await;
        assert!(matches!(res, Err(RconError::PoolTimeout)));
        assert_eq!(opened.load(Ordering::SeqCst), 2);

        drop(a);
        drop(b);
        assert_eq!(pool.counts(), (0, 2));
    }

    #[tokio::test]
    async fn idle_cache_is_bounded() {
        let (pool, _) = test_pool(3, 1);

        let a = pool.get(Deadline::none()).await.unwrap();
        let b = pool.get(Deadline::none()).await.unwrap();
        let c = pool.get(Deadline::none()).await.unwrap();
        drop(a);
        drop(b);
        drop(c);

        let (in_use, idle) = pool.counts();
        assert_eq!(in_use, 0);
        assert_eq!(idle, 1);
    }

    #[tokio::test]
    async fn waiters_are_served_fifo() {
        let (pool, _) = test_pool(1, 1);
        let held = pool.get(Deadline::none()).await.unwrap();

        let (order_tx, mut order_rx) = tokio::sync::mpsc::unbounded_channel();

        for tag in [1u8, 2, 3] {
            let pool = pool.clone();
            let order_tx = order_tx.clone();
            tokio::spawn(async move {
                let conn = pool.get(Deadline::after(Duration::from_secs(5))).await.unwrap();
                order_tx.send(tag).unwrap();
                tokio::time::sleep(Duration::from_millis(10)).await;
                drop(conn);
            });
            // Deterministic enqueue order.
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        drop(held);
        let mut served = Vec::new();
        for _ in 0..3 {
            served.push(order_rx.recv().await.unwrap());
        }
        assert_eq!(served, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn return_skips_abandoned_waiters() {
        let (pool, _) = test_pool(1, 1);
        let held = pool.get(Deadline::none()).await.unwrap();

        // This waiter gives up before anything is returned.
        let impatient = pool.get(Deadline::after(Duration::from_millis(20))).await;
        assert!(matches!(impatient, Err(RconError::PoolTimeout)));

        drop(held);
        // The abandoned waiter must not swallow the connection.
        let conn = pool.get(Deadline::after(Duration::from_millis(100))).await;
        assert!(conn.is_ok());
    }

    #[tokio::test]
    async fn factory_error_releases_capacity() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let pool: ConnectionPool<TestConn> = ConnectionPool::new(
            PoolOptions { max_open: 1, max_idle: 1 },
            move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                Box::pin(async move {
                    if n == 0 {
                        Err(RconError::InvalidCredentials)
                    } else {
                        Ok(TestConn { id: 7 })
                    }
                })
            },
        );

        let first = pool.get(Deadline::none()).await;
        assert!(matches!(first, Err(RconError::InvalidCredentials)));
        assert_eq!(pool.counts(), (0, 0));

        // The failed slot is free again.
        let second = pool.get(Deadline::none()).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn discard_frees_capacity_without_idling() {
        let (pool, opened) = test_pool(1, 1);

        let conn = pool.get(Deadline::none()).await.unwrap();
        conn.discard();
        assert_eq!(pool.counts(), (0, 0));

        let _again = pool.get(Deadline::none()).await.unwrap();
        assert_eq!(opened.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn shutdown_fails_new_and_parked_requests() {
        let (pool, _) = test_pool(1, 1);
        let held = pool.get(Deadline::none()).await.unwrap();

        let parked = {
            let pool = pool.clone();
            tokio::spawn(async move { pool.get(Deadline::after(Duration::from_secs(5))).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        pool.shutdown();
        assert!(matches!(parked.await.unwrap(), Err(RconError::PoolClosed)));
        assert!(matches!(
            pool.get(Deadline::none()).await,
            Err(RconError::PoolClosed)
        ));

        // A loaned connection returned after shutdown is closed.
        drop(held);
        assert_eq!(pool.counts(), (0, 0));
    }

    #[tokio::test]
    async fn stress_respects_cap_under_contention() {
        let (pool, opened) = test_pool(2, 2);
        let concurrent = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..10 {
            let pool = pool.clone();
            let concurrent = Arc::clone(&concurrent);
            let peak = Arc::clone(&peak);
            tasks.push(tokio::spawn(async move {
                let conn = pool.get(Deadline::after(Duration::from_secs(10))).await.unwrap();
                let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                concurrent.fetch_sub(1, Ordering::SeqCst);
                drop(conn);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(opened.load(Ordering::SeqCst), 2);
        assert_eq!(pool.counts(), (0, 2));
    }

    #[tokio::test]
    async fn with_connection_returns_on_error() {
        let (pool, _) = test_pool(1, 1);

        let res: Result<(), RconError> = pool
            .with_connection(Deadline::none(), |_conn| async {
                Err(RconError::CommandFailed)
            })
            .await;
        assert!(matches!(res, Err(RconError::CommandFailed)));

        // The connection went back despite the error.
        assert_eq!(pool.counts(), (0, 1));
    }

    #[tokio::test]
    async fn max_idle_is_clamped_to_max_open() {
        let (pool, _) = test_pool(2, 2);
        pool.set_max_idle(10);
        let a = pool.get(Deadline::none()).await.unwrap();
        let b = pool.get(Deadline::none()).await.unwrap();
        drop(a);
        drop(b);
        let (_, idle) = pool.counts();
        assert!(idle <= 2);
    }
}

//! Log-loop behavior against a scripted server: windowing, batch
//! dedupe across overlapping fetches, and the callback stop signal.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use warden_core::logs::{LogAction, LogLoop, LogLoopOptions};
use warden_core::v1;
use warden_core::PoolOptions;

const KEY: &[u8] = b"LK";
const PASSWORD: &str = "hunter2";

fn xor(data: &[u8]) -> Vec<u8> {
    data.iter()
        .enumerate()
        .map(|(i, b)| b ^ KEY[i % KEY.len()])
        .collect()
}

/// One session; `showlog` replies advance through `scripts` per call,
/// sticking to the last one. Also records the minutes argument of
/// every `showlog`.
async fn log_server(
    scripts: Vec<String>,
    minutes_seen: Arc<std::sync::Mutex<Vec<String>>>,
) -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let calls = AtomicUsize::new(0);
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            stream.write_all(KEY).await.ok();
            let mut buf = vec![0u8; 8196];
            loop {
                let Ok(n) = stream.read(&mut buf).await else {
                    break;
                };
                if n == 0 {
                    break;
                }
                let cmd = String::from_utf8(xor(&buf[..n])).unwrap_or_default();
                if cmd.starts_with("login ") {
                    stream.write_all(&xor(b"SUCCESS")).await.ok();
                } else if let Some(minutes) = cmd.strip_prefix("showlog ") {
                    minutes_seen.lock().unwrap().push(minutes.to_string());
                    let idx = calls.fetch_add(1, Ordering::SeqCst).min(scripts.len() - 1);
                    stream.write_all(&xor(scripts[idx].as_bytes())).await.ok();
                } else {
                    stream.write_all(&xor(b"OK")).await.ok();
                }
            }
        }
    });
    addr
}

fn fast_options() -> LogLoopOptions {
    LogLoopOptions {
        initial_window: Duration::from_secs(60 * 60),
        follow_window: Duration::from_secs(60),
        poll_interval: Duration::from_millis(100),
    }
}

#[tokio::test]
async fn delivers_deduplicated_batches_and_honours_stop() {
    let minutes_seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let addr = log_server(
        vec![
            // Initial fetch: two events.
            "[355 ms (1671484269)] CONNECTED A (1)\n[1.2 sec (1671484270)] DISCONNECTED B (2)"
                .to_string(),
            // Overlap: B again plus one genuinely new kill.
            "[1.2 sec (1671484270)] DISCONNECTED B (2)\n\
             [1:49 min (1671484280)] KILL: A(Axis/1) -> B(Allies/2) with M3 GREASE GUN"
                .to_string(),
        ],
        Arc::clone(&minutes_seen),
    )
    .await;

    let pool = v1::connection_pool_with(
        addr.ip().to_string(),
        addr.port(),
        PASSWORD,
        PoolOptions {
            max_open: 1,
            max_idle: 1,
        },
    );

    let log_loop = LogLoop::with_options(pool.clone(), fast_options());
    let batches = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = Arc::clone(&batches);

    log_loop
        .run(move |batch| {
            let mut all = sink.lock().unwrap();
            all.push(batch);
            // Stop once the overlap round delivered its one new event.
            all.len() >= 2
        })
        .await
        .unwrap();

    let all = batches.lock().unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].len(), 2);
    assert_eq!(all[0][0].action, LogAction::Connected);
    assert_eq!(all[0][1].action, LogAction::Disconnected);
    // The repeated DISCONNECTED was suppressed by its timestamp.
    assert_eq!(all[1].len(), 1);
    assert_eq!(all[1][0].action, LogAction::Kill);
    assert_eq!(all[1][0].weapon, "M3 GREASE GUN");

    // First fetch asked for the hour of history, later ones for a
    // single minute.
    let minutes = minutes_seen.lock().unwrap();
    assert_eq!(minutes[0], "60");
    assert!(minutes[1..].iter().all(|m| m == "1"));
    pool.shutdown();
}

#[tokio::test]
async fn cancellation_token_stops_an_idle_loop() {
    let minutes_seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let addr = log_server(vec!["EMPTY".to_string()], minutes_seen).await;

    let pool = v1::connection_pool_with(
        addr.ip().to_string(),
        addr.port(),
        PASSWORD,
        PoolOptions {
            max_open: 1,
            max_idle: 1,
        },
    );

    let log_loop = LogLoop::with_options(pool.clone(), fast_options());
    let token = log_loop.cancellation_token();

    let handle = tokio::spawn(async move { log_loop.run(|_| false).await });
    tokio::time::sleep(Duration::from_millis(250)).await;
    token.cancel();

    let res = tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("loop did not stop on cancellation")
        .unwrap();
    assert!(res.is_ok());
    pool.shutdown();
}

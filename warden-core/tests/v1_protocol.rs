//! Legacy-protocol tests against a scripted server on localhost:
//! key exchange, login, command rejection, tab-list completion, and
//! the open-ended log read.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use warden_core::v1::Connection;
use warden_core::RconError;

const KEY: &[u8] = b"WKEY";
const PASSWORD: &str = "hunter2";

// ── Helpers ──────────────────────────────────────────────────────

fn xor(data: &[u8]) -> Vec<u8> {
    data.iter()
        .enumerate()
        .map(|(i, b)| b ^ KEY[i % KEY.len()])
        .collect()
}

async fn read_command(stream: &mut TcpStream) -> Option<String> {
    let mut buf = vec![0u8; 8196];
    let n = stream.read(&mut buf).await.ok()?;
    if n == 0 {
        return None;
    }
    String::from_utf8(xor(&buf[..n])).ok()
}

async fn send(stream: &mut TcpStream, text: &str) {
    stream.write_all(&xor(text.as_bytes())).await.unwrap();
}

/// Spin up a scripted server: pushes the key frame, accepts one
/// login, then answers every command through `handler`. Each reply
/// frame is separated by a short pause so the client sees distinct
/// reads.
async fn scripted_server<F>(mut handler: F) -> std::net::SocketAddr
where
    F: FnMut(&str) -> Vec<String> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            // Key frame, zero-padded the way the real server pads it.
            let mut key_frame = KEY.to_vec();
            key_frame.resize(KEY.len() + 16, 0);
            stream.write_all(&key_frame).await.unwrap();

            let Some(login) = read_command(&mut stream).await else {
                continue;
            };
            if login == format!("login {PASSWORD}") {
                send(&mut stream, "SUCCESS").await;
            } else {
                send(&mut stream, "FAIL").await;
                continue;
            }

            while let Some(cmd) = read_command(&mut stream).await {
                for frame in handler(&cmd) {
                    send(&mut stream, &frame).await;
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            }
        }
    });
    addr
}

async fn connect(addr: std::net::SocketAddr) -> Connection {
    Connection::open(addr.ip().to_string(), addr.port(), PASSWORD)
        .await
        .unwrap()
}

// ── Handshake ────────────────────────────────────────────────────

#[tokio::test]
async fn login_succeeds_with_correct_password() {
    let addr = scripted_server(|_| vec!["OK".into()]).await;
    let mut conn = connect(addr).await;
    assert_eq!(conn.command("noop").await.unwrap(), "OK");
}

#[tokio::test]
async fn login_failure_is_bad_credentials() {
    let addr = scripted_server(|_| Vec::new()).await;
    let res = Connection::open(addr.ip().to_string(), addr.port(), "wrong").await;
    assert!(matches!(res, Err(RconError::InvalidCredentials)));
}

// ── Commands ─────────────────────────────────────────────────────

#[tokio::test]
async fn rejected_command_surfaces_as_command_failed() {
    let addr = scripted_server(|cmd| {
        if cmd.starts_with("map ") {
            vec!["FAIL".into()]
        } else {
            vec!["OK".into()]
        }
    })
    .await;
    let mut conn = connect(addr).await;
    let res = conn.command("map nowhere_warfare").await;
    assert!(matches!(res, Err(RconError::CommandFailed)));
}

#[tokio::test]
async fn list_command_strips_count_and_empty_tail() {
    // First token "3", then four tab-separated items with an empty
    // tail: exactly three elements come back.
    let addr = scripted_server(|_| vec!["3\talpha\tbravo\tcharlie\t".into()]).await;
    let mut conn = connect(addr).await;
    let items = conn.list_command("get playerids").await.unwrap();
    assert_eq!(items, vec!["alpha", "bravo", "charlie"]);
}

#[tokio::test]
async fn list_command_reads_across_frames() {
    let addr = scripted_server(|_| vec!["2\tal".into(), "pha\tbravo\t".into()]).await;
    let mut conn = connect(addr).await;
    let items = conn.list_command("get adminids").await.unwrap();
    assert_eq!(items, vec!["alpha", "bravo"]);
}

#[tokio::test]
async fn list_command_rejects_non_numeric_count() {
    let addr = scripted_server(|_| vec!["junk\ta\tb\t".into()]).await;
    let mut conn = connect(addr).await;
    let res = conn.list_command("get playerids").await;
    assert!(matches!(res, Err(RconError::BadListCount(_))));
}

#[tokio::test]
async fn typed_player_ids_parse_names_and_ids() {
    let addr = scripted_server(|_| {
        vec!["2\t[1.Fjg]Toasty : 76561198025480905\tOne : 76561198032765590\t".into()]
    })
    .await;
    let mut conn = connect(addr).await;
    let players = conn.player_ids().await.unwrap();
    assert_eq!(players.len(), 2);
    assert_eq!(players[0].name, "[1.Fjg]Toasty");
    assert_eq!(players[0].id, "76561198025480905");
    assert_eq!(players[1].name, "One");
}

#[tokio::test]
async fn slots_splits_current_and_max() {
    let addr = scripted_server(|_| vec!["87/100".into()]).await;
    let mut conn = connect(addr).await;
    assert_eq!(conn.slots().await.unwrap(), (87, 100));
}

// ── Reconnection ─────────────────────────────────────────────────

#[tokio::test]
async fn connection_reset_mid_read_reconnects_transparently() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        // First session: handshake, then reset the connection hard
        // while the client waits for its command reply.
        let (mut first, _) = listener.accept().await.unwrap();
        first.write_all(KEY).await.unwrap();
        let _login = read_command(&mut first).await.unwrap();
        send(&mut first, "SUCCESS").await;
        let _cmd = read_command(&mut first).await.unwrap();
        first.set_linger(Some(Duration::ZERO)).unwrap();
        drop(first);

        // Second session: fresh handshake; push the reply the retried
        // read is waiting for.
        let (mut second, _) = listener.accept().await.unwrap();
        second.write_all(KEY).await.unwrap();
        let _login = read_command(&mut second).await.unwrap();
        send(&mut second, "SUCCESS").await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        send(&mut second, "RECOVERED").await;
        // Hold the session open until the client hangs up.
        let mut buf = [0u8; 16];
        let _ = second.read(&mut buf).await;
    });

    let mut conn = connect(addr).await;
    let reply = conn.command("get name").await.unwrap();
    assert_eq!(reply, "RECOVERED");
}

// ── Open-ended log read ──────────────────────────────────────────

#[tokio::test]
async fn show_log_empty_window_yields_no_lines() {
    let addr = scripted_server(|cmd| {
        assert!(cmd.starts_with("showlog "));
        vec!["EMPTY".into()]
    })
    .await;
    let mut conn = connect(addr).await;
    let lines = conn.show_log(Duration::from_secs(30 * 60)).await.unwrap();
    assert!(lines.is_empty());
}

#[tokio::test]
async fn show_log_accumulates_dribbled_frames_until_quiet() {
    let addr = scripted_server(|_| {
        vec![
            "[355 ms (1671484269)] CONNECTED A (1)\n[356 ms (1671484270)] KILL: first ".into(),
            "half joined\n".into(),
            "[357 ms (1671484271)] DISCONNECTED B (2)".into(),
        ]
    })
    .await;
    let mut conn = connect(addr).await;
    let lines = conn.show_log(Duration::from_secs(60)).await.unwrap();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "[355 ms (1671484269)] CONNECTED A (1)");
    // The wrapped entry is joined with its continuation.
    assert_eq!(lines[1], "[356 ms (1671484270)] KILL: first half joined");
    assert_eq!(lines[2], "[357 ms (1671484271)] DISCONNECTED B (2)");
}

//! Binary POSTs against a live emulated device.
//!
//! # Design
//! Starts the mock server on a random port and drives every delivery style
//! of `QwebClient` over real HTTP with the default ureq transport. A bare
//! TCP listener that never answers stands in for an exchange that never
//! completes.

use std::net::SocketAddr;
use std::sync::mpsc;
use std::time::Duration;

use mock_server::{payload_text, Device, Reply, Status};
use qweb_client::{json_to_bytes, string_to_bytes, Callbacks, PostOutcome, QwebClient, QwebError};

const WAIT: Duration = Duration::from_secs(5);

fn start_device(device: Device) -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(4)
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener, device).await
        })
        .unwrap();
    });

    addr
}

/// Accepts connections and holds them open without ever replying.
fn start_silent_listener() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        let mut held = Vec::new();
        for stream in listener.incoming() {
            held.push(stream);
        }
    });
    addr
}

fn test_device() -> Device {
    Device::new()
        .on_post("/hello", |_, _| Reply::ok("hello"))
        .on_post("/missing", |_, _| Reply::status(Status::NOT_FOUND, "not found"))
        .on_post("/echo", |_, payload| Reply::ok(payload_text(payload)))
        .on_post("/len", |_, payload| Reply::ok(payload.len().to_string()))
        // Device handlers run on the blocking pool, so sleeping here does
        // not hold up `/fast`.
        .on_post("/slow", |_, _| {
            std::thread::sleep(Duration::from_millis(300));
            Reply::ok("slow")
        })
        .on_post("/fast", |_, _| Reply::ok("fast"))
}

/// Callbacks that report which side fired, tagged with `label`.
fn tagged_callbacks(
    label: &'static str,
    tx: mpsc::Sender<(&'static str, &'static str, String)>,
) -> Callbacks {
    let tx2 = tx.clone();
    Callbacks::new()
        .on_success(move |body| tx.send((label, "success", body)).unwrap())
        .on_failure(move |body| tx2.send((label, "failure", body)).unwrap())
}

#[test]
fn status_200_invokes_only_success() {
    let addr = start_device(test_device());
    let client = QwebClient::new(&format!("http://{addr}"));

    let (tx, rx) = mpsc::channel();
    client.post("/hello", string_to_bytes("hi"), tagged_callbacks("hello", tx));

    assert_eq!(
        rx.recv_timeout(WAIT).unwrap(),
        ("hello", "success", "hello".to_string())
    );
    assert!(rx.recv_timeout(WAIT).is_err(), "only one callback may fire");
}

#[test]
fn status_404_invokes_only_failure() {
    let addr = start_device(test_device());
    let client = QwebClient::new(&format!("http://{addr}"));

    let (tx, rx) = mpsc::channel();
    client.post("/missing", Vec::new(), tagged_callbacks("missing", tx));

    assert_eq!(
        rx.recv_timeout(WAIT).unwrap(),
        ("missing", "failure", "not found".to_string())
    );
    assert!(rx.recv_timeout(WAIT).is_err(), "only one callback may fire");
}

#[test]
fn unregistered_path_is_a_failure() {
    let addr = start_device(test_device());
    let client = QwebClient::new(&format!("http://{addr}"));

    let outcome = client.send("/nowhere", &string_to_bytes("x")).unwrap();
    assert_eq!(outcome, PostOutcome::Failure(String::new()));
}

#[test]
fn exchange_that_never_completes_fires_nothing() {
    let addr = start_silent_listener();
    let client = QwebClient::new(&format!("http://{addr}"));

    let (tx, rx) = mpsc::channel();
    client.post("/hang", string_to_bytes("x"), tagged_callbacks("hang", tx));

    assert!(matches!(
        rx.recv_timeout(Duration::from_millis(500)),
        Err(mpsc::RecvTimeoutError::Timeout)
    ));
}

#[test]
fn concurrent_posts_get_their_own_bodies() {
    let addr = start_device(test_device());
    let client = QwebClient::new(&format!("http://{addr}"));

    let (tx, rx) = mpsc::channel();
    client.post("/slow", Vec::new(), tagged_callbacks("slow", tx.clone()));
    client.post("/fast", Vec::new(), tagged_callbacks("fast", tx));

    let mut got = vec![rx.recv_timeout(WAIT).unwrap(), rx.recv_timeout(WAIT).unwrap()];
    got.sort();
    assert_eq!(
        got,
        vec![
            ("fast", "success", "fast".to_string()),
            ("slow", "success", "slow".to_string()),
        ]
    );
}

#[test]
fn json_payload_reaches_device_null_terminated() {
    let addr = start_device(test_device());
    let client = QwebClient::new(&format!("http://{addr}"));

    let payload = json_to_bytes(&serde_json::json!({"led": 2, "on": true})).unwrap();
    assert_eq!(client.send("/len", &payload).unwrap().into_body(), payload.len().to_string());

    let outcome = client.send("/echo", &payload).unwrap();
    assert_eq!(outcome, PostOutcome::Success(r#"{"led":2,"on":true}"#.to_string()));
}

#[test]
fn empty_payload_is_sent() {
    let addr = start_device(test_device());
    let client = QwebClient::new(&format!("http://{addr}"));

    assert_eq!(client.send("/len", &[]).unwrap(), PostOutcome::Success("0".to_string()));
}

#[test]
fn refused_connection_completes_as_empty_failure() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let client = QwebClient::new(&format!("http://{addr}"));

    let err = client.send("/hello", &[]).unwrap_err();
    assert!(matches!(err, QwebError::Transport(_)));

    let (tx, rx) = mpsc::channel();
    client.post_with("/hello", Vec::new(), move |outcome| tx.send(outcome).unwrap());
    assert_eq!(rx.recv_timeout(WAIT).unwrap(), PostOutcome::Failure(String::new()));
}

#[tokio::test(flavor = "multi_thread")]
async fn send_async_against_device() {
    let addr = start_device(test_device());
    let client = QwebClient::new(&format!("http://{addr}"));

    let ok = client.send_async("/hello", string_to_bytes("ok")).await.unwrap();
    assert_eq!(ok, PostOutcome::Success("hello".to_string()));

    let missing = client.send_async("/missing", Vec::new()).await.unwrap();
    assert_eq!(missing, PostOutcome::Failure("not found".to_string()));
}

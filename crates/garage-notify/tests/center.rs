//! End-to-end tests: REST load, live stream and store fan-out through one
//! `NotificationCenter`.

use std::{
    convert::Infallible,
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use garage_notify::{
    ApiConfig, ConnectionStatus, NotificationCenter, NotificationId, Session, StoreSnapshot,
    StreamConfig,
};
use http::Method;
use http_body_util::{BodyExt, Full, StreamBody, combinators::UnsyncBoxBody};
use hyper::{
    Request, Response,
    body::{Bytes, Frame, Incoming},
    server::conn::http1,
    service::service_fn,
};
use hyper_util::rt::TokioIo;
use tokio::{net::TcpListener, time::timeout};

type Body = UnsyncBoxBody<Bytes, Infallible>;

const PAGE: &str = r#"{"content":[
    {"id":"1","title":"Oil change booked","type":"APPOINTMENT","read":false,"createdAt":"2026-10-01T09:00:00Z"},
    {"id":"0","title":"Welcome","type":"SYSTEM","read":true,"createdAt":"2026-09-01T09:00:00Z"}
],"totalElements":2}"#;

const STREAM: [&str; 3] = [
    "data: heartbeat\n",
    "data: {\"id\":\"1\",\"title\":\"Oil change booked\"}\n",
    "data: {\"id\":\"2\",\"title\":\"Task assigned\",\"type\":\"TASK_ASSIGNED\"}\n",
];

fn json(status: u16, body: &'static str) -> Response<Body> {
    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Full::new(Bytes::from_static(body.as_bytes())).boxed_unsync())
        .expect("build response")
}

fn event_stream() -> Response<Body> {
    let frames = futures_util::stream::unfold(STREAM.into_iter(), |mut chunks| async move {
        match chunks.next() {
            Some(chunk) => {
                tokio::time::sleep(Duration::from_millis(20)).await;
                let frame = Frame::data(Bytes::from_static(chunk.as_bytes()));
                Some((Ok::<_, Infallible>(frame), chunks))
            }
            None => {
                std::future::pending::<()>().await;
                None
            }
        }
    });
    Response::builder()
        .status(200)
        .header("content-type", "text/event-stream")
        .body(StreamBody::new(frames).boxed_unsync())
        .expect("build response")
}

/// Portal backend serving both the REST routes and the stream.
async fn start_portal(fail_mutations: bool) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock server");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let _ = http1::Builder::new()
                    .serve_connection(
                        TokioIo::new(stream),
                        service_fn(move |req: Request<Incoming>| {
                            let resp = match (req.method(), req.uri().path()) {
                                (&Method::GET, "/api/notifications") => json(200, PAGE),
                                (&Method::GET, "/api/notifications/unread-count") => {
                                    json(200, r#"{"count":1}"#)
                                }
                                (&Method::GET, "/api/notifications/stream/42") => event_stream(),
                                (&Method::PUT | &Method::DELETE, _) if fail_mutations => {
                                    json(500, r#"{"error":"unavailable"}"#)
                                }
                                (&Method::PUT | &Method::DELETE, _) => json(204, ""),
                                _ => json(404, ""),
                            };
                            async move { Ok::<_, Infallible>(resp) }
                        }),
                    )
                    .await;
            });
        }
    });

    addr
}

fn center(addr: SocketAddr, session: Session) -> NotificationCenter {
    let base = format!("http://{addr}");
    NotificationCenter::new(
        session,
        StreamConfig::new(&base).reconnect_interval(Duration::from_millis(50)),
        ApiConfig::new(&base),
    )
    .expect("center")
}

async fn wait_until(what: &str, condition: impl Fn() -> bool) {
    timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {what}"));
}

#[tokio::test]
async fn test_load_then_stream_into_shared_store() {
    let addr = start_portal(false).await;
    let center = center(addr, Session::new("42", "token"));

    let badge = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&badge);
    let _badge_sub = center
        .store()
        .on_change(move |s: &StoreSnapshot| seen.lock().expect("lock").push(s.unread_count));

    // A second surface sharing the same center.
    let header_view = center.clone();
    let raw = Arc::new(Mutex::new(Vec::new()));
    let raw_in = Arc::clone(&raw);
    let _raw_sub = header_view
        .store()
        .on_notification(move |n| raw_in.lock().expect("lock").push(n.id.to_string()));

    center.start().await.expect("start");
    assert_eq!(center.store().notifications().len(), 2);
    assert_eq!(center.store().unread_count(), 1);

    wait_until("streamed notification", || {
        center.store().get(&NotificationId::from("2")).is_some()
    })
    .await;

    let store = header_view.store();
    let ids: Vec<_> = store
        .notifications()
        .into_iter()
        .map(|n| n.id.to_string())
        .collect();
    assert_eq!(ids, vec!["2", "1", "0"]);
    assert_eq!(store.unread_count(), 2);
    assert_eq!(store.total_unread(), 2);
    assert_eq!(store.status(), ConnectionStatus::Connected);
    assert_eq!(*raw.lock().expect("lock"), vec!["1", "2"]);

    store.mark_all_as_read().await.expect("mark all");
    assert_eq!(store.unread_count(), 0);
    assert_eq!(badge.lock().expect("lock").last(), Some(&0));

    center.shutdown().await;
    assert_eq!(store.status(), ConnectionStatus::Disconnected);
}

#[tokio::test]
async fn test_backend_failure_keeps_store_state() {
    let addr = start_portal(true).await;
    let center = center(addr, Session::new("42", "token"));
    center.start().await.expect("start");

    let store = center.store();
    let before = store.snapshot();
    assert!(store.mark_as_read(&NotificationId::from("1")).await.is_err());
    assert!(store.delete_notification(&NotificationId::from("1")).await.is_err());

    let after = store.snapshot();
    assert_eq!(after.notifications.len(), before.notifications.len());
    assert!(!store.get(&NotificationId::from("1")).expect("kept").read);

    center.shutdown().await;
}

#[tokio::test]
async fn test_signed_out_center_stays_idle() {
    let addr = start_portal(false).await;
    let center = center(addr, Session::new("42", ""));

    center.start().await.expect("start");

    assert!(center.store().notifications().is_empty());
    assert!(!center.connection().is_running().await);
    assert!(center.store().refresh().await.expect_err("no session").is_unauthorized());
}

//! Notification Feed Example
//!
//! Connects to a portal backend, prints the initial page and every live
//! notification until Ctrl-C.
//!
//! Run with:
//! `PORTAL_URL=https://portal.example.com PORTAL_USER=42 PORTAL_TOKEN=... \
//!  cargo run -p garage-notify --example notification_feed`

use std::time::Duration;

use chrono::Utc;
use garage_notify::{ApiConfig, NotificationCenter, RetryPolicy, Session, StreamConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,garage_notify=debug")),
        )
        .init();

    let base_url = std::env::var("PORTAL_URL").unwrap_or_else(|_| "http://localhost:8080".into());
    let session = Session::new(
        std::env::var("PORTAL_USER").unwrap_or_default(),
        std::env::var("PORTAL_TOKEN").unwrap_or_default(),
    );

    let center = NotificationCenter::new(
        session,
        StreamConfig::new(&base_url).retry(
            RetryPolicy::exponential(Duration::from_secs(1), Duration::from_secs(30)),
        ),
        ApiConfig::new(&base_url).page_size(10),
    )?;

    let _status = center.store().on_status_change(|status| {
        println!("[stream] {status}");
    });
    let _live = center.store().on_notification(|n| {
        println!("[{}] {}: {}", n.kind, n.title, n.message);
    });
    let _badge = center.store().on_change(|snapshot| {
        println!(
            "[badge] {} unread on this page, {} total",
            snapshot.unread_count, snapshot.total_unread
        );
    });

    if let Err(e) = center.start().await {
        eprintln!("Initial load failed: {e}");
    }

    let now = Utc::now();
    for n in center.store().notifications() {
        let marker = if n.read { ' ' } else { '*' };
        println!("{marker} {:<40} {}", n.title, n.time_ago(now));
    }

    tokio::signal::ctrl_c().await?;
    center.shutdown().await;
    Ok(())
}

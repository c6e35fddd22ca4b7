//! Tracing subscriber setup.
//!
//! `RUST_LOG` controls the filter; the default keeps the crate at `info`
//! and the HTTP stack at `warn`. Log lines never carry token plaintext,
//! digests or full object paths.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("portal_api=info,tower_http=warn,axum=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .compact()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .init();
}

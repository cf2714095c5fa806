//! Test Tracing Setup
//!
//! Installs a `tracing-subscriber` writing through the test harness so log
//! output shows up only for failing tests. Honors `RUST_LOG`.

use once_cell::sync::Lazy;
use tracing_subscriber::EnvFilter;

static TRACING: Lazy<()> = Lazy::new(|| {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
});

/// Installs the test subscriber once per test binary
pub fn init_test_tracing() {
    Lazy::force(&TRACING);
}

//! Tracing bootstrap for binaries and tests.
//!
//! Verification decisions are logged at `warn`, signing and decryption
//! internals at `debug`; `RUST_LOG` overrides the crate-scoped default.

use std::sync::OnceLock;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt as _,
    util::SubscriberInitExt as _,
};

static INIT: OnceLock<()> = OnceLock::new();

/// Installs the global subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = INIT.get_or_init(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("warn,saml_trust=info"));
        let fmt_layer = fmt::layer().with_span_events(FmtSpan::ENTER | FmtSpan::EXIT);
        let _ = tracing_subscriber::registry()
            .with(fmt_layer)
            .with(env_filter)
            .try_init();
    });
}

use std::{any::Any, panic::Location};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;

/// Installs the stdout and audit-file layers. Protocol events (target
/// `consensus`) go only to `logs/audit-<name>.log`; everything else goes to
/// stdout, filtered by `RUST_LOG`. Keep the guard alive until exit.
pub fn init(name: &str) -> WorkerGuard {
    let file_appender = tracing_appender::rolling::never("logs", format!("audit-{name}.log"));
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let consensus_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_filter(tracing_subscriber::filter::filter_fn(|metadata| {
            metadata.target() == "consensus" || metadata.target().starts_with("benor_")
        }));

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,benor_node=debug".into()),
        )
        .with_filter(tracing_subscriber::filter::filter_fn(|metadata| {
            metadata.target() != "consensus"
        }));

    tracing_subscriber::registry()
        .with(consensus_layer)
        .with(stdout_layer)
        .init();

    guard
}

const PANIC_LOG: &str = "panic.log";

/// Writes panics to stderr and `panic.log` before the process dies.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let report = crash_report(info.payload(), info.location());
        eprintln!("{report}");
        if let Err(e) = std::fs::write(PANIC_LOG, format!("{report}\n")) {
            eprintln!("could not write {PANIC_LOG}: {e}");
        }
    }));
}

fn crash_report(payload: &(dyn Any + Send), location: Option<&Location<'_>>) -> String {
    let reason = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload");
    match location {
        Some(at) => format!("CRASH: {reason} at {at}"),
        None => format!("CRASH: {reason}"),
    }
}

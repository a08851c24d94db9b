//! Logging infrastructure for structured console and file output.

mod logger;
mod subscriber;
mod types;
mod utils;

pub use logger::Logger;
pub use subscriber::{init_subscriber, module_span};
pub use types::{Log, ModuleEntry, ModuleStatus};

/// Logger whose events go to a run log in a fresh temporary directory,
/// through a thread-local subscriber.
///
/// Keep the returned directory and guard alive for the whole test.
#[cfg(test)]
#[allow(clippy::expect_used)]
pub(crate) fn isolated_logger() -> (Logger, tempfile::TempDir, tracing::dispatcher::DefaultGuard) {
    use tracing_subscriber::{Layer as _, filter::LevelFilter, layer::SubscriberExt as _};

    let tmp = tempfile::tempdir().expect("create temp dir");
    let path = tmp.path().join("test.log");
    let run_log = subscriber::FileLayer::create(&path, "test").expect("create run log");
    let subscriber = tracing_subscriber::registry().with(run_log.with_filter(LevelFilter::DEBUG));
    let guard = tracing::dispatcher::set_default(&tracing::Dispatch::new(subscriber));
    (Logger::writing_to(path), tmp, guard)
}

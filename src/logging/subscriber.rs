//! Tracing subscriber: console formatting, the per-command run log, and the
//! `module` span that attributes log lines to the module being run.
use std::fs;
use std::io::Write as _;
use std::path::Path;
use std::sync::Mutex;

use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context as LayerContext;
use tracing_subscriber::registry::LookupSpan;

use super::utils::{CLOCK, DATE_AND_CLOCK, log_file_path, strip_ansi, utc_now};

/// Tracing target used for stage headers.
pub(super) const STAGE_TARGET: &str = "tildeconfig::stage";

const MODULE_SPAN: &str = "module";

/// Span covering one module's run. Events emitted inside it are tagged with
/// the module name in the run log.
#[must_use]
pub fn module_span(module: &str) -> tracing::Span {
    tracing::info_span!("module", module)
}

/// How an event is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Stage,
    Error,
    Warn,
    Info,
    Debug,
}

impl Kind {
    fn of(event: &Event<'_>) -> Self {
        let metadata = event.metadata();
        match *metadata.level() {
            Level::ERROR => Self::Error,
            Level::WARN => Self::Warn,
            Level::INFO if metadata.target() == STAGE_TARGET => Self::Stage,
            Level::INFO => Self::Info,
            _ => Self::Debug,
        }
    }

    const fn tag(self) -> &'static str {
        match self {
            Self::Stage => "==>",
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
        }
    }
}

/// Collects a single named field of an event or span as text.
struct FieldText {
    name: &'static str,
    value: Option<String>,
}

impl FieldText {
    const fn new(name: &'static str) -> Self {
        Self { name, value: None }
    }
}

impl Visit for FieldText {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == self.name {
            self.value = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == self.name {
            self.value = Some(format!("{value:?}"));
        }
    }
}

fn message_of(event: &Event<'_>) -> String {
    let mut text = FieldText::new("message");
    event.record(&mut text);
    text.value.unwrap_or_default()
}

/// Module name stored on a `module` span.
struct ModuleName(String);

/// Appends every event to the run log, one plain-text line each:
///
/// ```text
/// 12:00:01 ==> Install zsh
/// 12:00:01 INFO  [zsh] $ chsh -s /bin/zsh
/// ```
#[derive(Debug)]
pub(super) struct FileLayer {
    file: Mutex<fs::File>,
}

impl FileLayer {
    /// Run log for `command` in the cache directory.
    pub(super) fn for_command(command: &str) -> Option<Self> {
        Self::create(&log_file_path(command)?, command)
    }

    /// Truncate `path`, write the run header, and append from then on.
    ///
    /// Returns `None` if the file cannot be written.
    pub(super) fn create(path: &Path, command: &str) -> Option<Self> {
        let version = option_env!("TILDECONFIG_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"));
        let header = format!(
            "# tildeconfig {version} {command}, started {} UTC\n",
            utc_now(DATE_AND_CLOCK)
        );
        fs::write(path, header).ok()?;
        let file = fs::OpenOptions::new().append(true).open(path).ok()?;
        Some(Self {
            file: Mutex::new(file),
        })
    }

    fn render(kind: Kind, module: Option<&str>, msg: &str) -> String {
        let clock = utc_now(CLOCK);
        let msg = strip_ansi(msg);
        match (kind, module) {
            (Kind::Stage, _) => format!("{clock} ==> {msg}"),
            (_, Some(module)) => format!("{clock} {:<5} [{module}] {msg}", kind.tag()),
            (_, None) => format!("{clock} {:<5} {msg}", kind.tag()),
        }
    }
}

impl<S> tracing_subscriber::Layer<S> for FileLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: LayerContext<'_, S>) {
        if attrs.metadata().name() != MODULE_SPAN {
            return;
        }
        let mut text = FieldText::new("module");
        attrs.record(&mut text);
        if let (Some(name), Some(span)) = (text.value, ctx.span(id)) {
            span.extensions_mut().insert(ModuleName(name));
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: LayerContext<'_, S>) {
        // Innermost module span wins.
        let module = ctx.event_scope(event).and_then(|mut scope| {
            scope.find_map(|span| {
                let extensions = span.extensions();
                extensions.get::<ModuleName>().map(|m| m.0.clone())
            })
        });
        let line = Self::render(Kind::of(event), module.as_deref(), &message_of(event));
        if let Ok(mut file) = self.file.lock() {
            writeln!(file, "{line}").ok();
        }
    }
}

/// Console formatter: colored level tags, `==>` stage headers, indented
/// info lines, and dimmed debug lines.
struct ConsoleFormatter;

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for ConsoleFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: tracing_subscriber::fmt::format::Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let msg = message_of(event);
        match Kind::of(event) {
            Kind::Stage => writeln!(writer, "\x1b[1;34m==>\x1b[0m \x1b[1m{msg}\x1b[0m"),
            Kind::Error => writeln!(writer, "\x1b[31mERROR\x1b[0m {msg}"),
            Kind::Warn => writeln!(writer, "\x1b[33mWARN\x1b[0m  {msg}"),
            Kind::Info => writeln!(writer, "  {msg}"),
            Kind::Debug => writeln!(writer, "  \x1b[2m{msg}\x1b[0m"),
        }
    }
}

/// Install the global subscriber. Call once, before anything logs.
///
/// Warnings and errors go to stderr and everything else to stdout; debug
/// lines reach the console only when `verbose`. The run log for `command`
/// receives every event at debug level and above.
pub fn init_subscriber(verbose: bool, command: &str) {
    use tracing_subscriber::fmt::writer::MakeWriterExt as _;
    use tracing_subscriber::{
        Layer as _, filter::LevelFilter, fmt, layer::SubscriberExt as _,
        util::SubscriberInitExt as _,
    };

    let console_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let console = fmt::layer()
        .event_format(ConsoleFormatter)
        .with_writer(
            std::io::stderr
                .with_max_level(Level::WARN)
                .and(std::io::stdout.with_min_level(Level::INFO)),
        )
        .with_filter(console_level);
    let run_log = FileLayer::for_command(command).map(|l| l.with_filter(LevelFilter::DEBUG));

    tracing_subscriber::registry()
        .with(console)
        .with(run_log)
        .init();
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::logging::isolated_logger;

    fn lines(log: &crate::logging::Logger) -> Vec<String> {
        let contents = fs::read_to_string(log.log_path().expect("log path")).unwrap();
        contents.lines().map(str::to_string).collect()
    }

    /// Drop the leading `HH:MM:SS ` clock.
    fn without_clock(line: &str) -> &str {
        &line[9..]
    }

    #[test]
    fn events_inside_module_span_name_the_module() {
        let (log, _tmp, _guard) = isolated_logger();
        {
            let _zsh = module_span("zsh").entered();
            log.info("$ chsh -s /bin/zsh");
            log.warn("\x1b[33mno system selected\x1b[0m");
        }
        log.info("after");

        let lines = lines(&log);
        assert!(lines[0].starts_with("# tildeconfig "));
        let body: Vec<&str> = lines[1..].iter().map(|l| without_clock(l)).collect();
        assert_eq!(
            body,
            vec![
                "INFO  [zsh] $ chsh -s /bin/zsh",
                "WARN  [zsh] no system selected",
                "INFO  after",
            ]
        );
    }

    #[test]
    fn innermost_module_span_wins() {
        let (log, _tmp, _guard) = isolated_logger();
        let _outer = module_span("outer").entered();
        let _inner = module_span("inner").entered();
        log.debug("nested");

        let lines = lines(&log);
        assert_eq!(without_clock(&lines[1]), "DEBUG [inner] nested");
    }

    #[test]
    fn stage_lines_have_no_module_tag() {
        let (log, _tmp, _guard) = isolated_logger();
        let _git = module_span("git").entered();
        log.stage("Install git");

        let lines = lines(&log);
        assert_eq!(without_clock(&lines[1]), "==> Install git");
    }
}

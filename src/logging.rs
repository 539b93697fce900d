// Diagnostic logging setup

use chrono::Local;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

const CRATE_TARGET: &str = "rp_reporter";

/// Emoji-prefixed single line per event. Events from other crates carry
/// their target so they can be told apart from the reporter's own.
pub struct CustomFormatter;

impl<S, N> FormatEvent<S, N> for CustomFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let metadata = event.metadata();
        let timestamp = Local::now().format("%H:%M:%S%.3f");

        write!(
            writer,
            "{} {} [{}]",
            level_emoji(metadata.level()),
            metadata.level(),
            timestamp
        )?;
        if !metadata.target().starts_with(CRATE_TARGET) {
            write!(writer, " {}", metadata.target())?;
        }
        write!(writer, ": ")?;

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

fn level_emoji(level: &Level) -> &'static str {
    match *level {
        Level::TRACE => "🔬",
        Level::DEBUG => "🐛",
        Level::INFO => "ℹ️ ",
        Level::WARN => "⚠️ ",
        Level::ERROR => "❌",
    }
}

/// Filter used when `RUST_LOG` is not set.
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "rp_reporter=debug,warn"
    } else {
        "rp_reporter=warn,error"
    }
}

/// Install the global subscriber. Output goes to stderr, stdout is kept for
/// the operation stream.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    let _ = tracing_subscriber::fmt()
        .event_format(CustomFormatter)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

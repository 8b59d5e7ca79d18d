use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt::{self, format::FmtSpan}};

/// Tracing target of the `quilt-native` binary, which reports failed runs.
pub const FAILURE_TARGET: &str = "quilt_native";

/// Picks the tracing filter: an explicit filter wins, then `RUST_LOG`, then
/// the verbosity count (`info`, `-v` debug, `-vv` trace).
pub fn select_filter(explicit: Option<&str>, rust_log: Option<&str>, verbose: u8) -> String {
    if let Some(filter) = explicit.filter(|f| !f.trim().is_empty()) {
        return filter.to_string();
    }
    if let Some(filter) = rust_log.filter(|f| !f.trim().is_empty()) {
        return filter.to_string();
    }
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
    .to_string()
}

/// Whether some directive of `filter` already decides the level of [`FAILURE_TARGET`]:
/// a bare level other than `off`, or a target that prefixes it.
fn covers_failure_target(filter: &str) -> bool {
    filter.split(',').map(str::trim).filter(|d| !d.is_empty()).any(|directive| {
        if let Ok(level) = directive.parse::<LevelFilter>() {
            return level != LevelFilter::OFF;
        }
        let target = directive.split(['[', '=']).next().unwrap_or_default().trim();
        !target.is_empty() && FAILURE_TARGET.starts_with(target)
    })
}

/// Builds the env filter for `filter`, falling back to `info` when it does not parse.
/// Errors of the binary stay enabled unless the filter names its target itself.
pub fn build_env_filter(filter: &str) -> EnvFilter {
    let (env_filter, effective) = match EnvFilter::try_new(filter) {
        Ok(env_filter) => (env_filter, filter),
        Err(_) => (EnvFilter::new("info"), "info"),
    };
    if covers_failure_target(effective) {
        return env_filter;
    }
    match format!("{FAILURE_TARGET}=error").parse::<Directive>() {
        Ok(directive) => env_filter.add_directive(directive),
        Err(_) => env_filter,
    }
}

/// Installs the global subscriber, writing to stderr.
pub fn init(explicit_filter: Option<&str>, verbose: u8) {
    let rust_log = std::env::var("RUST_LOG").ok();
    let filter = select_filter(explicit_filter, rust_log.as_deref(), verbose);
    let env_filter = build_env_filter(&filter);

    let is_debug = filter.contains("debug") || filter.contains("trace");

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_timer(fmt::time::uptime())
        .with_span_events(if is_debug {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

/// In-memory log sink for tests.
#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct CapturedLog(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

#[cfg(test)]
impl CapturedLog {
    pub(crate) fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

#[cfg(test)]
impl std::io::Write for CapturedLog {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
impl<'a> fmt::MakeWriter<'a> for CapturedLog {
    type Writer = CapturedLog;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

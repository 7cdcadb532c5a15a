//! Fire-and-forget analytics events.

/// Sink for usage events. Implementations must not block and must swallow
/// their own failures.
pub trait Telemetry: Send + Sync + 'static {
    fn log_event(&self, name: &str, attributes: &[(&str, String)]);
}

/// Writes events to the log at `info` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTelemetry;

impl Telemetry for LogTelemetry {
    fn log_event(&self, name: &str, attributes: &[(&str, String)]) {
        let rendered = attributes
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(" ");
        log::info!(target: "telemetry", "{name} {rendered}");
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetry;

impl Telemetry for NoopTelemetry {
    fn log_event(&self, _name: &str, _attributes: &[(&str, String)]) {}
}

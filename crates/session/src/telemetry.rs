use crate::session::Session;
use eventspace_resources::ReleaseReport;

#[derive(Debug, thiserror::Error)]
#[error("telemetry: {0}")]
pub struct TelemetryError(pub String);

/// Receives session start and end notifications.
///
/// Delivery is best effort. A returned error is logged at debug level and
/// otherwise ignored.
pub trait SessionObserver {
    fn session_started(&mut self, session: &Session) -> Result<(), TelemetryError>;

    fn session_ended(&mut self, session: &Session, report: &ReleaseReport) -> Result<(), TelemetryError>;
}

#[derive(Debug, Default)]
pub struct NoopObserver;

impl SessionObserver for NoopObserver {
    fn session_started(&mut self, _: &Session) -> Result<(), TelemetryError> {
        Ok(())
    }

    fn session_ended(&mut self, _: &Session, _: &ReleaseReport) -> Result<(), TelemetryError> {
        Ok(())
    }
}

/// Emits one structured log line per notification.
#[derive(Debug, Default)]
pub struct LogObserver;

impl SessionObserver for LogObserver {
    fn session_started(&mut self, session: &Session) -> Result<(), TelemetryError> {
        tracing::info!(
            target: "eventspace::telemetry",
            session = %session.id(),
            event = session.event_name(),
            participants = session.participants().len(),
            "event started"
        );
        Ok(())
    }

    fn session_ended(&mut self, session: &Session, report: &ReleaseReport) -> Result<(), TelemetryError> {
        tracing::info!(
            target: "eventspace::telemetry",
            session = %session.id(),
            event = session.event_name(),
            state = ?session.state(),
            elapsed = session.elapsed(),
            restored = report.restored,
            conflicts = report.conflicts(),
            "event ended"
        );
        Ok(())
    }
}

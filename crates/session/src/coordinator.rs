use crate::context::EngineContext;
use crate::registry::SessionRegistry;
use eventspace_kernel::WorldHost;
use eventspace_persist::FlushReport;
use tracing::{info, info_span, warn};

/// What a shutdown did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Sessions cancelled through the normal ending path.
    pub terminated: usize,
    /// Claims found without a live session and released directly.
    pub orphaned_claims: usize,
    pub flush: FlushReport,
}

/// Brings every active session to a terminal state when the host disables
/// the engine. Afterwards no claim is open and no session is registered.
#[derive(Debug, Default)]
pub struct DisableCoordinator;

impl DisableCoordinator {
    pub fn shutdown<W: WorldHost>(
        registry: &mut SessionRegistry,
        ctx: &mut EngineContext<W>,
    ) -> ShutdownReport {
        let _span = info_span!("shutdown").entered();
        let mut report = ShutdownReport::default();
        registry.close();

        let active = registry.list_active();
        if !active.is_empty() {
            info!(sessions = active.len(), "terminating active sessions");
        }
        for session in &active {
            if registry.terminate(ctx, session.id(), "shutdown") {
                report.terminated += 1;
            }
        }

        for session in ctx.resources.sessions_with_claims() {
            let (resources, mut cx) = ctx.resource_cx();
            let released = resources.release_all(&mut cx, session);
            warn!(%session, claims = released.released(), "released orphaned claims");
            report.orphaned_claims += released.released();
        }

        report.flush = ctx.persistence.flush();
        info!(
            terminated = report.terminated,
            orphaned = report.orphaned_claims,
            written = report.flush.written,
            "shutdown complete"
        );
        report
    }
}

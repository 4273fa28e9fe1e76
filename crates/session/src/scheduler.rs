use crate::context::{EngineContext, EventContext};
use crate::error::HookError;
use crate::registry::{SessionEntry, SessionRegistry};
use crate::session::SessionState;
use eventspace_common::{ParticipantId, SessionId};
use eventspace_kernel::WorldHost;
use eventspace_persist::FlushReport;
use eventspace_resources::InventorySpec;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::{debug, error, info, info_span};

/// What one external tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    /// Running sessions visited this tick.
    pub sessions_advanced: usize,
    /// Tick hooks that completed successfully.
    pub hooks_invoked: usize,
    pub deferred_run: usize,
    pub ended: usize,
    pub cancelled: usize,
    pub landings: usize,
    pub flush: FlushReport,
}

/// Drives session lifecycles from the host's external tick.
#[derive(Debug, Default)]
pub struct EventScheduler {
    hook_failures: u64,
}

impl EventScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hook failures (errors and panics) caught so far.
    pub fn hook_failures(&self) -> u64 {
        self.hook_failures
    }

    /// Move a pending session to `Running`: strip inventories if configured,
    /// run the start hook, then count participation.
    ///
    /// A failure cancels the session without running its end hook. Returns
    /// whether the session is now running.
    pub fn start<W: WorldHost>(
        &mut self,
        registry: &mut SessionRegistry,
        ctx: &mut EngineContext<W>,
        id: SessionId,
    ) -> bool {
        let Some(entry) = registry.entry_mut(id) else {
            return false;
        };
        if entry.session.state != SessionState::Pending {
            return false;
        }
        let _span = info_span!("start", session = %id, event = %entry.session.event_name).entered();

        let mut failure: Option<HookError> = None;
        if entry.session.config.strips_inventory {
            let (resources, mut cx) = ctx.resource_cx();
            for &participant in &entry.session.participants {
                if let Err(e) = resources.take_inventory(&mut cx, id, InventorySpec::strip(participant)) {
                    failure = Some(e.into());
                    break;
                }
            }
        }
        if failure.is_none() {
            let SessionEntry {
                session,
                lifecycle,
                timers,
            } = &mut *entry;
            let mut cx = EventContext::new(
                session,
                timers,
                &mut ctx.world,
                &mut ctx.resources,
                &mut ctx.persistence,
                ctx.tick,
            );
            if let Err(e) = guard(|| lifecycle.start(&mut cx)) {
                failure = Some(e);
            }
        }

        if let Some(e) = failure {
            self.hook_failures += 1;
            error!(error = %e, "start failed, cancelling session");
            run_ending(
                registry,
                ctx,
                id,
                SessionState::Cancelled,
                &format!("start failed: {e}"),
                false,
            );
            return false;
        }

        ctx.count_participation(&entry.session.participants);
        entry.session.state = SessionState::Running;
        info!("session running");
        if let Err(e) = ctx.observer.session_started(&entry.session) {
            debug!(error = %e, "observer rejected start notification");
        }
        true
    }

    /// Process one external tick for every running session, in creation order.
    pub fn tick<W: WorldHost>(
        &mut self,
        registry: &mut SessionRegistry,
        ctx: &mut EngineContext<W>,
    ) -> TickReport {
        ctx.tick += 1;
        let _span = info_span!("tick", tick = ctx.tick).entered();
        let mut report = TickReport {
            tick: ctx.tick,
            ..TickReport::default()
        };

        {
            let (resources, mut cx) = ctx.resource_cx();
            report.landings = resources.poll_projectiles(&mut cx).len();
        }

        for id in registry.running_ids() {
            report.sessions_advanced += 1;
            self.advance(registry, ctx, id, &mut report);
        }

        if ctx.settings.flush_every_tick {
            report.flush = ctx.persistence.flush();
        }
        report
    }

    fn advance<W: WorldHost>(
        &mut self,
        registry: &mut SessionRegistry,
        ctx: &mut EngineContext<W>,
        id: SessionId,
        report: &mut TickReport,
    ) {
        let departed: Vec<ParticipantId> = match registry.get(id) {
            Some(s) if s.state() == SessionState::Running => s
                .participants()
                .iter()
                .copied()
                .filter(|p| !ctx.world.is_online(*p))
                .collect(),
            _ => return,
        };
        for participant in departed {
            registry.drop_participant(ctx, id, participant);
        }
        if registry.get(id).is_some_and(|s| s.participants().is_empty()) {
            run_ending(registry, ctx, id, SessionState::Cancelled, "no participants", true);
            report.cancelled += 1;
            return;
        }

        let Some(entry) = registry.entry_mut(id) else {
            return;
        };
        entry.session.elapsed += 1;
        let elapsed = entry.session.elapsed;
        let interval = entry.session.config.tick_interval;
        let duration = entry.session.config.duration_ticks;

        let mut failure: Option<(&'static str, HookError)> = None;
        for (_, callback) in entry.timers.drain_due(ctx.tick) {
            let SessionEntry { session, timers, .. } = &mut *entry;
            let mut cx = EventContext::new(
                session,
                timers,
                &mut ctx.world,
                &mut ctx.resources,
                &mut ctx.persistence,
                ctx.tick,
            );
            match guard(move || callback(&mut cx)) {
                Ok(()) => report.deferred_run += 1,
                Err(e) => {
                    failure = Some(("deferred callback", e));
                    break;
                }
            }
        }

        if failure.is_none() && elapsed % interval == 0 {
            let SessionEntry {
                session,
                lifecycle,
                timers,
            } = &mut *entry;
            let mut cx = EventContext::new(
                session,
                timers,
                &mut ctx.world,
                &mut ctx.resources,
                &mut ctx.persistence,
                ctx.tick,
            );
            match guard(|| lifecycle.tick(&mut cx)) {
                Ok(()) => report.hooks_invoked += 1,
                Err(e) => failure = Some(("tick hook", e)),
            }
        }

        if let Some((what, e)) = failure {
            self.hook_failures += 1;
            error!(session = %id, error = %e, "{what} failed, cancelling session");
            run_ending(
                registry,
                ctx,
                id,
                SessionState::Cancelled,
                &format!("{what} failed: {e}"),
                false,
            );
            report.cancelled += 1;
            return;
        }

        if elapsed >= duration {
            match run_ending(registry, ctx, id, SessionState::Ended, "completed", true) {
                Some(SessionState::Ended) => report.ended += 1,
                Some(_) => report.cancelled += 1,
                None => {}
            }
        }
    }
}

/// Run a hook, turning a panic into a [`HookError`].
fn guard<F>(hook: F) -> Result<(), HookError>
where
    F: FnOnce() -> Result<(), HookError>,
{
    match catch_unwind(AssertUnwindSafe(hook)) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_owned())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_owned());
            Err(HookError::Panicked(message))
        }
    }
}

/// Take an active session through `Ending` to `outcome`: cancel its timers,
/// run the end hook if asked and the session was running, release every claim, notify the observer,
/// remove it. A failing end hook turns the outcome into `Cancelled` but the
/// release still happens. Returns the final state, or `None` if the session
/// was not active.
pub(crate) fn run_ending<W: WorldHost>(
    registry: &mut SessionRegistry,
    ctx: &mut EngineContext<W>,
    id: SessionId,
    outcome: SessionState,
    reason: &str,
    invoke_end: bool,
) -> Option<SessionState> {
    let entry = registry.entry_mut(id)?;
    if !entry.session.state.is_active() {
        return None;
    }
    let _span = info_span!("ending", session = %id).entered();
    // A session whose start hook never completed gets no end hook.
    let started = entry.session.state == SessionState::Running;
    entry.session.state = SessionState::Ending;
    entry.session.end_reason = Some(reason.to_owned());
    let dropped = entry.timers.cancel_all();
    if dropped > 0 {
        debug!(dropped, "pending callbacks dropped");
    }

    let mut final_state = outcome;
    if invoke_end && started {
        let SessionEntry {
            session,
            lifecycle,
            timers,
        } = &mut *entry;
        let mut cx = EventContext::new(
            session,
            timers,
            &mut ctx.world,
            &mut ctx.resources,
            &mut ctx.persistence,
            ctx.tick,
        );
        if let Err(e) = guard(|| lifecycle.end(&mut cx)) {
            error!(error = %e, "end hook failed, releasing anyway");
            final_state = SessionState::Cancelled;
        }
        // Callbacks the end hook scheduled never run.
        entry.timers.cancel_all();
    }

    let report = {
        let (resources, mut cx) = ctx.resource_cx();
        resources.release_all(&mut cx, id)
    };
    entry.session.state = final_state;
    info!(
        state = ?final_state,
        reason,
        restored = report.restored,
        skipped = report.skipped.len(),
        "session finished"
    );
    if let Err(e) = ctx.observer.session_ended(&entry.session, &report) {
        debug!(error = %e, "observer rejected end notification");
    }
    registry.remove(id);
    Some(final_state)
}

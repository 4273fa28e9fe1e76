use super::{ClaimRef, ResourceCx, ResourceManager};
use crate::error::ResourceError;
use crate::ledger::{ClaimSnapshot, ClaimTarget, ResourceClaim, ResourceKind, ResourceLedger};
use crate::timer::TimerSet;
use eventspace_common::{ClaimId, ProjectileId, SessionId};
use eventspace_kernel::ProjectileLaunch;

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectileSpec {
    pub launch: ProjectileLaunch,
    /// Ticks until the projectile lands and is removed. `None` flies until released.
    pub flight_ticks: Option<u64>,
}

impl ProjectileSpec {
    /// A launch that lands after `flight_ticks`, or never if `None`.
    pub fn new(launch: ProjectileLaunch, flight_ticks: Option<u64>) -> Self {
        Self {
            launch,
            flight_ticks,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectileHandle {
    pub session: SessionId,
    pub claim: ClaimId,
    pub projectile: ProjectileId,
}

impl From<ProjectileHandle> for ClaimRef {
    fn from(h: ProjectileHandle) -> Self {
        ClaimRef {
            session: h.session,
            kind: ResourceKind::Projectile,
            claim: h.claim,
        }
    }
}

/// A projectile whose flight ended this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectileLanding {
    pub session: SessionId,
    pub projectile: ProjectileId,
}

#[derive(Debug)]
struct PendingLanding {
    session: SessionId,
    claim: ClaimId,
    projectile: ProjectileId,
}

/// Tracks in-flight projectiles and their scheduled landings.
#[derive(Debug, Default)]
pub struct ProjectileManager {
    landings: TimerSet<PendingLanding>,
}

impl ProjectileManager {
    /// Projectiles still in flight.
    pub fn pending(&self) -> usize {
        self.landings.len()
    }

    /// Resolve every landing due by `cx.tick`: the projectile is removed and
    /// its claim closed.
    pub fn poll(&mut self, ledger: &mut ResourceLedger, cx: &mut ResourceCx<'_>) -> Vec<ProjectileLanding> {
        let mut landed = Vec::new();
        for (_, pending) in self.landings.drain_due(cx.tick) {
            if ledger
                .take(pending.session, Self::KIND, pending.claim)
                .is_none()
            {
                continue;
            }
            cx.world.remove_projectile(pending.projectile);
            tracing::debug!(session = %pending.session, claim = %pending.claim, "projectile landed");
            landed.push(ProjectileLanding {
                session: pending.session,
                projectile: pending.projectile,
            });
        }
        landed
    }
}

impl ResourceManager for ProjectileManager {
    const KIND: ResourceKind = ResourceKind::Projectile;
    type Spec = ProjectileSpec;
    type Handle = ProjectileHandle;

    fn acquire(
        &mut self,
        ledger: &mut ResourceLedger,
        cx: &mut ResourceCx<'_>,
        session: SessionId,
        spec: ProjectileSpec,
    ) -> Result<ProjectileHandle, ResourceError> {
        let projectile = cx.world.launch_projectile(&spec.launch);
        let claim = ledger.record(
            session,
            Self::KIND,
            ClaimTarget::Projectile(projectile),
            ClaimSnapshot::Projectile { effect: None },
        );
        if let Some(flight) = spec.flight_ticks {
            let timer = self.landings.schedule(
                cx.tick.saturating_add(flight),
                PendingLanding {
                    session,
                    claim,
                    projectile,
                },
            );
            if let Some(c) = ledger.get_mut(session, Self::KIND, claim) {
                c.snapshot = ClaimSnapshot::Projectile {
                    effect: Some(timer),
                };
            }
        }
        Ok(ProjectileHandle {
            session,
            claim,
            projectile,
        })
    }

    fn restore(&mut self, claim: &ResourceClaim, cx: &mut ResourceCx<'_>) -> Result<(), ResourceError> {
        let (ClaimTarget::Projectile(projectile), ClaimSnapshot::Projectile { effect }) =
            (&claim.target, &claim.snapshot)
        else {
            return Err(ResourceError::SnapshotMismatch {
                claim: claim.id,
                kind: Self::KIND,
            });
        };
        if let Some(timer) = effect {
            self.landings.cancel(*timer);
        }
        if !cx.world.remove_projectile(*projectile) {
            tracing::debug!(claim = %claim.id, "projectile already resolved");
        }
        Ok(())
    }
}

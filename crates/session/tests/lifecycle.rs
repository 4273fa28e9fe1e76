//! End-to-end session lifecycle tests against the in-memory world.
//!
//! Each test drives an [`EventEngine`] tick by tick and checks what hooks
//! ran and what the world looks like afterwards.

use std::cell::RefCell;
use std::rc::Rc;

use eventspace_common::{ActorSpawn, BlockKind, BlockPos, Inventory, ItemStack, ParticipantId, SessionId};
use eventspace_kernel::{ProjectileLaunch, World, WorldHost};
use eventspace_persist::{
    ContainerKind, ContainerRecord, MemoryStore, ParticipantRecord, Record, WorldRecord,
};
use eventspace_resources::{ContainerSpec, ResourceError};
use eventspace_session::{
    DisableCoordinator, EngineContext, EngineSettings, EventCatalog, EventContext, EventEngine,
    EventLifecycle, HookError, Session, SessionConfig, SessionError, SessionObserver,
    SessionRegistry, SessionState, TelemetryError,
};
use glam::Vec3;

type Log = Rc<RefCell<Vec<String>>>;

/// What a scripted event does inside its hooks.
#[derive(Clone, Copy, Default)]
struct Script {
    fail_start: bool,
    fail_tick_at: Option<u64>,
    panic_tick_at: Option<u64>,
    fail_end: bool,
    /// Claim one of every resource kind on start.
    claim_everything: bool,
}

struct Scripted {
    log: Log,
    script: Script,
    ticks: u64,
}

impl EventLifecycle for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    fn description(&self) -> &str {
        "records every hook call"
    }

    fn start(&mut self, cx: &mut EventContext<'_>) -> Result<(), HookError> {
        self.log.borrow_mut().push("start".into());
        cx.spawn_actor(ActorSpawn::new("ZOMBIE", Vec3::ZERO))?;
        if self.script.claim_everything {
            cx.set_block(BlockPos::new(0, 64, 0), BlockKind::new("GOLD"))?;
            cx.launch_projectile(
                ProjectileLaunch {
                    kind: "ARROW".into(),
                    origin: Vec3::ZERO,
                    velocity: Vec3::X,
                    shooter: None,
                },
                None,
            )?;
            cx.place_container(
                ContainerSpec::new(BlockPos::new(3, 64, 3), ContainerKind::Regular)
                    .with_contents(vec![ItemStack::new("DIAMOND", 3)]),
            )?;
            let first = cx.participants()[0];
            cx.give_kit(first, Inventory::new(vec![ItemStack::new("BOW", 1)]))?;
        }
        if self.script.fail_start {
            return Err(HookError::msg("start refused"));
        }
        Ok(())
    }

    fn tick(&mut self, _cx: &mut EventContext<'_>) -> Result<(), HookError> {
        self.ticks += 1;
        self.log.borrow_mut().push("tick".into());
        if self.script.fail_tick_at == Some(self.ticks) {
            return Err(HookError::msg("tick failed"));
        }
        if self.script.panic_tick_at == Some(self.ticks) {
            panic!("tick exploded");
        }
        Ok(())
    }

    fn end(&mut self, _cx: &mut EventContext<'_>) -> Result<(), HookError> {
        self.log.borrow_mut().push("end".into());
        if self.script.fail_end {
            return Err(HookError::msg("end failed"));
        }
        Ok(())
    }
}

fn catalog(log: &Log, script: Script) -> EventCatalog {
    let mut catalog = EventCatalog::new();
    let log = Rc::clone(log);
    catalog.register("scripted", move || {
        Box::new(Scripted {
            log: Rc::clone(&log),
            script,
            ticks: 0,
        })
    });
    catalog
}

fn kit() -> Inventory {
    Inventory::new(vec![ItemStack::new("A", 1), ItemStack::new("B", 2)])
}

fn engine_with(script: Script) -> (EventEngine<World>, Log, ParticipantId) {
    let log: Log = Rc::default();
    let mut world = World::new();
    world.set_block(BlockPos::new(0, 64, 0), BlockKind::new("STONE"));
    let player = world.join("alex", kit());
    let engine = EventEngine::new(
        world,
        Box::new(MemoryStore::new()),
        catalog(&log, script),
        EngineSettings::default(),
    );
    (engine, log, player)
}

fn count(log: &Log, hook: &str) -> usize {
    log.borrow().iter().filter(|h| *h == hook).count()
}

fn run(engine: &mut EventEngine<World>, ticks: u64) {
    for _ in 0..ticks {
        engine.tick();
    }
}

#[test]
fn twenty_tick_hooks_then_one_end() {
    let (mut engine, log, player) = engine_with(Script::default());
    let id = engine
        .create("scripted", [player], SessionConfig::new(1, 20))
        .unwrap();
    assert_eq!(engine.get(id).unwrap().state(), SessionState::Running);

    run(&mut engine, 19);
    assert_eq!(count(&log, "tick"), 19);
    assert_eq!(count(&log, "end"), 0);

    run(&mut engine, 6);
    assert_eq!(count(&log, "tick"), 20);
    assert_eq!(count(&log, "end"), 1);
    assert_eq!(log.borrow().first().map(String::as_str), Some("start"));
    assert_eq!(log.borrow().last().map(String::as_str), Some("end"));
    assert!(engine.get(id).is_none());
    assert!(engine.list_active().is_empty());
    assert_eq!(engine.world().actor_count(), 0);
}

#[test]
fn tick_interval_spaces_hooks() {
    let (mut engine, log, player) = engine_with(Script::default());
    engine
        .create("scripted", [player], SessionConfig::new(5, 20))
        .unwrap();
    run(&mut engine, 30);
    assert_eq!(count(&log, "tick"), 4);
    assert_eq!(count(&log, "end"), 1);
}

#[test]
fn duration_two_hundred_interval_ten() {
    let (mut engine, log, player) = engine_with(Script::default());
    engine
        .create("scripted", [player], SessionConfig::new(10, 200))
        .unwrap();
    run(&mut engine, 250);
    assert_eq!(count(&log, "tick"), 20);
    assert_eq!(count(&log, "end"), 1);
    assert_eq!(log.borrow().len(), 22);
}

#[test]
fn creation_errors_leave_nothing_behind() {
    let (mut engine, log, player) = engine_with(Script::default());

    let empty: [ParticipantId; 0] = [];
    assert_eq!(
        engine.create("scripted", empty, SessionConfig::default()),
        Err(SessionError::EmptyParticipantSet)
    );
    assert_eq!(
        engine.create("nope", [player], SessionConfig::default()),
        Err(SessionError::UnknownEvent("nope".into()))
    );
    assert!(matches!(
        engine.create("scripted", [player], SessionConfig::new(0, 10)),
        Err(SessionError::InvalidConfig(_))
    ));
    assert!(engine.list_active().is_empty());
    assert!(log.borrow().is_empty());
}

#[test]
fn participant_cannot_join_two_sessions() {
    let (mut engine, _log, player) = engine_with(Script::default());
    let first = engine
        .create("scripted", [player], SessionConfig::default())
        .unwrap();
    assert_eq!(
        engine.create("scripted", [player], SessionConfig::default()),
        Err(SessionError::ParticipantBusy {
            participant: player,
            session: first,
        })
    );
    assert_eq!(engine.session_of(player), Some(first));
}

#[test]
fn capacity_limit_is_enforced() {
    let log: Log = Rc::default();
    let mut world = World::new();
    let a = world.join("a", Inventory::default());
    let b = world.join("b", Inventory::default());
    let settings = EngineSettings {
        max_sessions: Some(1),
        ..EngineSettings::default()
    };
    let mut engine = EventEngine::new(
        world,
        Box::new(MemoryStore::new()),
        catalog(&log, Script::default()),
        settings,
    );
    engine.create("scripted", [a], SessionConfig::default()).unwrap();
    assert_eq!(
        engine.create("scripted", [b], SessionConfig::default()),
        Err(SessionError::CapacityExceeded { limit: 1 })
    );
}

#[test]
fn terminate_unknown_id_is_noop() {
    let (mut engine, log, player) = engine_with(Script::default());
    let id = engine
        .create("scripted", [player], SessionConfig::default())
        .unwrap();

    assert!(!engine.terminate(SessionId::new(), "nobody"));
    assert_eq!(engine.list_active().len(), 1);

    assert!(engine.terminate(id, "admin"));
    assert_eq!(count(&log, "end"), 1);
    assert!(!engine.terminate(id, "again"));
    assert_eq!(count(&log, "end"), 1);
    assert_eq!(
        engine.session(id).unwrap_err(),
        SessionError::SessionNotFound(id)
    );
}

#[test]
fn shutdown_releases_everything_and_refuses_new_sessions() {
    let log: Log = Rc::default();
    let mut world = World::new();
    let players: Vec<ParticipantId> = (0..3)
        .map(|i| world.join(format!("p{i}"), kit()))
        .collect();
    let before = world.state_hash();
    let mut engine = EventEngine::new(
        world,
        Box::new(MemoryStore::new()),
        catalog(&log, Script::default()),
        EngineSettings::default(),
    );
    for &p in &players {
        engine
            .create("scripted", [p], SessionConfig::default().stripping_inventory())
            .unwrap();
    }
    run(&mut engine, 3);
    assert_eq!(engine.list_active().len(), 3);

    let report = engine.shutdown();
    assert_eq!(report.terminated, 3);
    assert_eq!(report.orphaned_claims, 0);
    assert!(engine.list_active().is_empty());
    assert!(engine.resources().ledger().is_empty());
    assert_eq!(count(&log, "end"), 3);
    assert_eq!(engine.world().state_hash(), before);

    assert_eq!(
        engine.create("scripted", [players[0]], SessionConfig::default()),
        Err(SessionError::ShuttingDown)
    );
}

#[test]
fn tick_failure_cancels_and_stops_hooks() {
    let (mut engine, log, player) = engine_with(Script {
        fail_tick_at: Some(3),
        ..Script::default()
    });
    let id = engine
        .create("scripted", [player], SessionConfig::new(1, 100))
        .unwrap();
    assert_eq!(engine.world().actor_count(), 1);

    run(&mut engine, 10);
    assert_eq!(count(&log, "tick"), 3);
    assert_eq!(count(&log, "end"), 0);
    assert!(engine.get(id).is_none());
    assert_eq!(engine.world().actor_count(), 0);
    assert_eq!(engine.resources().open_claims(id), 0);
    assert_eq!(engine.hook_failures(), 1);
}

#[test]
fn panicking_tick_hook_is_contained() {
    let (mut engine, log, player) = engine_with(Script {
        panic_tick_at: Some(2),
        ..Script::default()
    });
    engine
        .create("scripted", [player], SessionConfig::new(1, 100))
        .unwrap();

    run(&mut engine, 5);
    assert_eq!(count(&log, "tick"), 2);
    assert!(engine.list_active().is_empty());
    assert_eq!(engine.world().actor_count(), 0);
    assert_eq!(engine.hook_failures(), 1);
}

#[test]
fn failed_start_cancels_without_end_hook() {
    let (mut engine, log, player) = engine_with(Script {
        fail_start: true,
        ..Script::default()
    });
    let id = engine
        .create("scripted", [player], SessionConfig::default().stripping_inventory())
        .unwrap();

    assert!(engine.get(id).is_none());
    assert_eq!(count(&log, "end"), 0);
    assert_eq!(engine.world().actor_count(), 0);
    assert_eq!(engine.world().inventory(player), Some(kit()));
    // The participant is free again.
    assert_eq!(engine.session_of(player), None);
}

#[derive(Clone, Default)]
struct Recorder {
    seen: Rc<RefCell<Vec<(SessionId, SessionState)>>>,
}

impl SessionObserver for Recorder {
    fn session_started(&mut self, session: &Session) -> Result<(), TelemetryError> {
        self.seen.borrow_mut().push((session.id(), session.state()));
        Err(TelemetryError("collector offline".into()))
    }

    fn session_ended(
        &mut self,
        session: &Session,
        _report: &eventspace_resources::ReleaseReport,
    ) -> Result<(), TelemetryError> {
        self.seen.borrow_mut().push((session.id(), session.state()));
        Ok(())
    }
}

#[test]
fn failed_end_hook_still_releases_and_reports_cancelled() {
    let (engine, log, player) = engine_with(Script {
        fail_end: true,
        ..Script::default()
    });
    let recorder = Recorder::default();
    let mut engine = engine.with_observer(recorder.clone());
    let id = engine
        .create("scripted", [player], SessionConfig::new(1, 2))
        .unwrap();

    run(&mut engine, 2);
    assert_eq!(count(&log, "end"), 1);
    assert!(engine.get(id).is_none());
    assert_eq!(engine.world().actor_count(), 0);
    assert_eq!(
        *recorder.seen.borrow(),
        vec![(id, SessionState::Running), (id, SessionState::Cancelled)]
    );
}

#[test]
fn inventory_is_overwritten_on_restore() {
    let (mut engine, _log, player) = engine_with(Script::default());
    engine
        .create("scripted", [player], SessionConfig::new(1, 5).stripping_inventory())
        .unwrap();
    assert_eq!(engine.world().inventory(player), Some(Inventory::default()));

    engine.world_mut().give(player, ItemStack::new("C", 1));
    run(&mut engine, 5);

    assert_eq!(engine.world().inventory(player), Some(kit()));
}

#[test]
fn block_changed_by_host_is_not_restored() {
    let (mut engine, _log, player) = engine_with(Script {
        claim_everything: true,
        ..Script::default()
    });
    let pos = BlockPos::new(0, 64, 0);
    engine
        .create("scripted", [player], SessionConfig::new(1, 5))
        .unwrap();
    assert_eq!(engine.world().block_at(pos), BlockKind::new("GOLD"));

    engine.world_mut().set_block(pos, BlockKind::new("DIRT"));
    run(&mut engine, 5);

    assert!(engine.list_active().is_empty());
    assert_eq!(engine.world().block_at(pos), BlockKind::new("DIRT"));
}

#[test]
fn world_is_reverted_after_a_full_session() {
    let (mut engine, _log, player) = engine_with(Script {
        claim_everything: true,
        ..Script::default()
    });
    let before = engine.world().state_hash();
    let id = engine
        .create("scripted", [player], SessionConfig::new(2, 10).stripping_inventory())
        .unwrap();
    assert_ne!(engine.world().state_hash(), before);
    assert_eq!(engine.resources().open_claims(id), 5);

    run(&mut engine, 10);
    assert!(engine.list_active().is_empty());
    assert_eq!(engine.world().state_hash(), before);
    assert_eq!(engine.world().projectile_count(), 0);
}

#[test]
fn departed_participant_gets_inventory_back_and_session_cancels() {
    let (mut engine, log, player) = engine_with(Script::default());
    let id = engine
        .create("scripted", [player], SessionConfig::new(1, 100).stripping_inventory())
        .unwrap();
    run(&mut engine, 2);

    engine.world_mut().leave(player);
    engine.tick();

    assert!(engine.get(id).is_none());
    assert_eq!(engine.world().inventory(player), Some(kit()));
    assert_eq!(count(&log, "end"), 1);
    assert_eq!(count(&log, "tick"), 2);
}

#[test]
fn participant_left_restores_immediately() {
    let log: Log = Rc::default();
    let mut world = World::new();
    let a = world.join("a", kit());
    let b = world.join("b", kit());
    let mut engine = EventEngine::new(
        world,
        Box::new(MemoryStore::new()),
        catalog(&log, Script::default()),
        EngineSettings::default(),
    );
    let id = engine
        .create("scripted", [a, b], SessionConfig::new(1, 100).stripping_inventory())
        .unwrap();

    assert_eq!(engine.participant_left(a), Some(id));
    assert_eq!(engine.world().inventory(a), Some(kit()));
    assert_eq!(engine.world().inventory(b), Some(Inventory::default()));
    assert_eq!(engine.get(id).unwrap().participants(), &[b]);
    assert_eq!(engine.participant_left(a), None);
}

struct Timed {
    log: Log,
}

impl EventLifecycle for Timed {
    fn name(&self) -> &str {
        "timed"
    }

    fn start(&mut self, cx: &mut EventContext<'_>) -> Result<(), HookError> {
        let log = Rc::clone(&self.log);
        cx.schedule(3, move |cx: &mut EventContext<'_>| {
            log.borrow_mut().push(format!("fired@{}", cx.tick()));
            Ok(())
        });
        let log = Rc::clone(&self.log);
        cx.schedule(50, move |_: &mut EventContext<'_>| {
            log.borrow_mut().push("late".into());
            Ok(())
        });
        Ok(())
    }

    fn tick(&mut self, _cx: &mut EventContext<'_>) -> Result<(), HookError> {
        Ok(())
    }

    fn end(&mut self, cx: &mut EventContext<'_>) -> Result<(), HookError> {
        self.log
            .borrow_mut()
            .push(format!("end pending={}", cx.pending_timers()));
        Ok(())
    }
}

#[test]
fn deferred_callbacks_fire_once_and_die_with_session() {
    let log: Log = Rc::default();
    let mut world = World::new();
    let p = world.join("p", Inventory::default());
    let mut catalog = EventCatalog::new();
    let shared = Rc::clone(&log);
    catalog.register("timed", move || {
        Box::new(Timed {
            log: Rc::clone(&shared),
        })
    });
    let mut engine = EventEngine::new(
        world,
        Box::new(MemoryStore::new()),
        catalog,
        EngineSettings::default(),
    );
    engine
        .create("timed", [p], SessionConfig::new(1, 10))
        .unwrap();
    run(&mut engine, 60);

    assert_eq!(
        *log.borrow(),
        vec!["fired@3".to_string(), "end pending=0".to_string()]
    );
}

#[test]
fn block_permissions_follow_session_config() {
    let log: Log = Rc::default();
    let mut world = World::new();
    let locked = world.join("locked", Inventory::default());
    let builder = world.join("builder", Inventory::default());
    let outsider = world.join("outsider", Inventory::default());
    let mut engine = EventEngine::new(
        world,
        Box::new(MemoryStore::new()),
        catalog(&log, Script::default()),
        EngineSettings::default(),
    );
    engine
        .create("scripted", [locked], SessionConfig::new(1, 100))
        .unwrap();
    let building = engine
        .create("scripted", [builder], SessionConfig::new(1, 100).allowing_block_edits())
        .unwrap();

    let pos = BlockPos::new(9, 64, 9);
    assert!(!engine.allows_block_place(locked));
    assert!(matches!(
        engine.participant_block_change(locked, pos, BlockKind::new("DIRT")),
        Err(ResourceError::NotPermitted { .. })
    ));
    assert_eq!(
        engine.participant_block_change(outsider, pos, BlockKind::new("DIRT")),
        Ok(false)
    );
    assert!(engine.world().block_at(pos).is_air());

    assert_eq!(
        engine.participant_block_change(builder, pos, BlockKind::new("PLANKS")),
        Ok(true)
    );
    assert_eq!(engine.world().block_at(pos), BlockKind::new("PLANKS"));
    assert!(engine.terminate(building, "done"));
    assert!(engine.world().block_at(pos).is_air());
}

#[test]
fn persistence_tracks_participation_and_containers() {
    let (mut engine, _log, player) = engine_with(Script {
        claim_everything: true,
        ..Script::default()
    });
    let world_key = WorldRecord::key_for("world");
    assert!(engine
        .persistence_mut()
        .get_record::<WorldRecord>(&world_key)
        .is_some());

    let id = engine
        .create("scripted", [player], SessionConfig::new(1, 3))
        .unwrap();
    let container_key = ContainerRecord::key_for(format!("{id}-3_64_3"));
    let container: ContainerRecord = engine
        .persistence_mut()
        .get_record(&container_key)
        .unwrap();
    assert_eq!(container.session_id, id);
    assert!(container.clear_at_end);

    run(&mut engine, 3);
    assert!(engine.get(id).is_none());
    assert!(engine
        .persistence_mut()
        .get_record::<ContainerRecord>(&container_key)
        .is_none());
    assert_eq!(engine.persistence().pending(), 0);

    engine
        .create("scripted", [player], SessionConfig::new(1, 3))
        .unwrap();
    run(&mut engine, 3);
    let record: ParticipantRecord = engine
        .persistence_mut()
        .get_record(&ParticipantRecord::key_for(player))
        .unwrap();
    assert_eq!(record.events_participated, 2);
}

/// A context and registry with one session created but never started.
fn pending_session() -> (EngineContext<World>, SessionRegistry, Log, SessionId) {
    let log: Log = Rc::default();
    let mut world = World::new();
    let player = world.join("alex", kit());
    let ctx = EngineContext::new(
        world,
        Box::new(MemoryStore::new()),
        catalog(&log, Script::default()),
        EngineSettings::default(),
    );
    let mut registry = SessionRegistry::new(None);
    let id = registry
        .create(&ctx, "scripted", [player], SessionConfig::default())
        .unwrap();
    assert_eq!(registry.get(id).map(Session::state), Some(SessionState::Pending));
    (ctx, registry, log, id)
}

#[test]
fn terminating_pending_session_skips_end_hook() {
    let (mut ctx, mut registry, log, id) = pending_session();

    assert!(registry.terminate(&mut ctx, id, "changed my mind"));
    assert!(registry.get(id).is_none());
    assert!(log.borrow().is_empty());
}

#[test]
fn shutdown_with_pending_session_skips_end_hook() {
    let (mut ctx, mut registry, log, id) = pending_session();

    let report = DisableCoordinator::shutdown(&mut registry, &mut ctx);
    assert_eq!(report.terminated, 1);
    assert_eq!(report.orphaned_claims, 0);
    assert!(registry.get(id).is_none());
    assert_eq!(count(&log, "end"), 0);
    assert!(registry.is_closed());
}

#[test]
fn failed_start_counts_no_participation() {
    let (mut engine, _log, player) = engine_with(Script {
        fail_start: true,
        ..Script::default()
    });
    engine
        .create("scripted", [player], SessionConfig::default())
        .unwrap();

    assert!(engine
        .persistence_mut()
        .get_record::<ParticipantRecord>(&ParticipantRecord::key_for(player))
        .is_none());
}

#[test]
fn replaced_container_survives_session_end() {
    let (mut engine, log, player) = engine_with(Script {
        claim_everything: true,
        ..Script::default()
    });
    let id = engine
        .create("scripted", [player], SessionConfig::new(1, 100))
        .unwrap();
    let pos = BlockPos::new(3, 64, 3);
    let loot = vec![ItemStack::new("OWNER_LOOT", 5)];
    engine.world_mut().set_block(pos, BlockKind::new("BARREL"));
    engine.world_mut().set_container_contents(pos, loot.clone());

    assert!(engine.terminate(id, "admin"));
    assert_eq!(count(&log, "end"), 1);
    assert_eq!(engine.world().block_at(pos), BlockKind::new("BARREL"));
    assert_eq!(engine.world().container_contents(pos), Some(loot));
    // Everything else the session claimed is still reverted.
    assert_eq!(engine.world().block_at(BlockPos::new(0, 64, 0)), BlockKind::new("STONE"));
    assert_eq!(engine.resources().open_claims(id), 0);
}

//! Sample events shipped with the CLI.

use eventspace_common::{ActorSpawn, BlockKind, BlockPos, Inventory, ItemStack};
use eventspace_kernel::ProjectileLaunch;
use eventspace_persist::ContainerKind;
use eventspace_resources::{ActorHandle, ContainerSpec};
use eventspace_session::{EventCatalog, EventContext, EventLifecycle, HookError};
use glam::{IVec3, Vec3};

pub fn catalog() -> EventCatalog {
    let mut catalog = EventCatalog::new();
    catalog
        .register("drop-party", || Box::new(DropParty::default()))
        .register("block-race", || Box::new(BlockRace::default()))
        .register("mob-arena", || Box::new(MobArena::default()));
    catalog
}

const ORIGIN: BlockPos = BlockPos { x: 0, y: 64, z: 0 };

/// Reward chests appear around the origin while fireworks go up.
#[derive(Default)]
pub struct DropParty {
    drops: i32,
}

impl EventLifecycle for DropParty {
    fn name(&self) -> &str {
        "drop-party"
    }

    fn description(&self) -> &str {
        "reward chests and fireworks around spawn"
    }

    fn start(&mut self, cx: &mut EventContext<'_>) -> Result<(), HookError> {
        cx.set_block(ORIGIN, BlockKind::new("BEACON"))?;
        Ok(())
    }

    fn tick(&mut self, cx: &mut EventContext<'_>) -> Result<(), HookError> {
        self.drops += 1;
        let pos = ORIGIN.offset(IVec3::new(self.drops * 2, 0, 0));
        cx.place_container(
            ContainerSpec::new(pos, ContainerKind::InstantReward)
                .with_contents(vec![ItemStack::new("DIAMOND", 1)]),
        )?;
        let origin = pos.as_ivec3().as_vec3();
        cx.launch_projectile(
            ProjectileLaunch {
                kind: "FIREWORK".into(),
                origin,
                velocity: Vec3::Y,
                shooter: None,
            },
            Some(3),
        )?;
        Ok(())
    }

    fn end(&mut self, _cx: &mut EventContext<'_>) -> Result<(), HookError> {
        tracing::info!(drops = self.drops, "drop party over");
        Ok(())
    }
}

/// Everyone gets a pickaxe; a gold line is laid out one block per tick.
#[derive(Default)]
pub struct BlockRace {
    laid: i32,
}

impl EventLifecycle for BlockRace {
    fn name(&self) -> &str {
        "block-race"
    }

    fn description(&self) -> &str {
        "hand out pickaxes and lay a gold track"
    }

    fn start(&mut self, cx: &mut EventContext<'_>) -> Result<(), HookError> {
        let kit = Inventory::new(vec![ItemStack::new("IRON_PICKAXE", 1)]);
        for participant in cx.participants().to_vec() {
            cx.give_kit(participant, kit.clone())?;
        }
        Ok(())
    }

    fn tick(&mut self, cx: &mut EventContext<'_>) -> Result<(), HookError> {
        let pos = ORIGIN.offset(IVec3::new(0, 0, self.laid));
        cx.set_block(pos, BlockKind::new("GOLD_BLOCK"))?;
        self.laid += 1;
        Ok(())
    }

    fn end(&mut self, _cx: &mut EventContext<'_>) -> Result<(), HookError> {
        tracing::info!(laid = self.laid, "race track finished");
        Ok(())
    }
}

/// Waves of mobs; each wave is cleared five ticks after it spawns.
#[derive(Default)]
pub struct MobArena {
    wave: u32,
}

impl EventLifecycle for MobArena {
    fn name(&self) -> &str {
        "mob-arena"
    }

    fn description(&self) -> &str {
        "spawn short-lived mob waves"
    }

    fn start(&mut self, _cx: &mut EventContext<'_>) -> Result<(), HookError> {
        Ok(())
    }

    fn tick(&mut self, cx: &mut EventContext<'_>) -> Result<(), HookError> {
        self.wave += 1;
        let mut wave: Vec<ActorHandle> = Vec::new();
        for i in 0..self.wave.min(4) {
            let position = Vec3::new(i as f32 * 3.0, 64.0, 10.0);
            wave.push(cx.spawn_actor(ActorSpawn::new("ZOMBIE", position))?);
        }
        cx.schedule(5, move |cx: &mut EventContext<'_>| {
            for actor in wave {
                cx.release(actor);
            }
            Ok(())
        });
        Ok(())
    }

    fn end(&mut self, _cx: &mut EventContext<'_>) -> Result<(), HookError> {
        tracing::info!(waves = self.wave, "arena closed");
        Ok(())
    }
}

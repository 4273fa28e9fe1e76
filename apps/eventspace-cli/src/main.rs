mod events;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use eventspace_common::{Inventory, ItemStack, ParticipantId};
use eventspace_kernel::World;
use eventspace_persist::{FileStore, MemoryStore, RecordStore};
use eventspace_session::{EngineSettings, EventEngine, LogObserver};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "eventspace-cli", about = "Run timed world events against a simulated world")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Engine settings file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and effective settings
    Info,
    /// List the registered events
    Events,
    /// Run one session and check the world is reverted afterwards
    Run {
        /// Event to run
        #[arg(short, long, default_value = "drop-party")]
        event: String,
        /// External ticks to drive
        #[arg(short, long, default_value = "200")]
        ticks: u64,
        /// Number of simulated participants
        #[arg(short, long, default_value = "3")]
        participants: usize,
        /// Terminate the session at this tick
        #[arg(long)]
        cancel_at: Option<u64>,
        /// Persist records under this directory instead of in memory
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let settings = match &cli.config {
        Some(path) => EngineSettings::load(path)?,
        None => EngineSettings::default(),
    };

    match cli.command {
        Commands::Info => {
            println!("eventspace-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("world: {}", settings.world_name);
            match settings.max_sessions {
                Some(limit) => println!("max sessions: {limit}"),
                None => println!("max sessions: unlimited"),
            }
            println!(
                "default session: interval={} duration={} strips_inventory={}",
                settings.default_session.tick_interval,
                settings.default_session.duration_ticks,
                settings.default_session.strips_inventory
            );
            for name in settings.events.keys() {
                println!("override: {name}");
            }
        }
        Commands::Events => {
            for (name, description) in events::catalog().describe() {
                println!("{name:<12} {description}");
            }
        }
        Commands::Run {
            event,
            ticks,
            participants,
            cancel_at,
            data_dir,
        } => {
            let store: Box<dyn RecordStore> = match &data_dir {
                Some(dir) => Box::new(FileStore::open(dir)?),
                None => Box::new(MemoryStore::new()),
            };

            let mut world = World::new();
            let players: Vec<ParticipantId> = (0..participants)
                .map(|i| {
                    world.join(
                        format!("player{i}"),
                        Inventory::new(vec![
                            ItemStack::new("STONE_SWORD", 1),
                            ItemStack::new("BREAD", 8),
                        ]),
                    )
                })
                .collect();
            let before = world.state_hash();

            let mut engine = EventEngine::new(world, store, events::catalog(), settings)
                .with_observer(LogObserver);
            let id = engine.create_configured(&event, players)?;
            println!("Session {id} ({event}) started");

            for tick in 1..=ticks {
                engine.world_mut().step();
                let report = engine.tick();
                if cancel_at == Some(tick) && engine.terminate(id, "cancelled from cli") {
                    println!("Cancelled at tick {tick}");
                }
                if report.ended + report.cancelled > 0 || engine.list_active().is_empty() {
                    println!("Session over at tick {tick}");
                    break;
                }
            }

            let shutdown = engine.shutdown();
            let after = engine.world().state_hash();
            println!(
                "Shutdown: terminated={}, orphaned_claims={}, records_written={}",
                shutdown.terminated, shutdown.orphaned_claims, shutdown.flush.written
            );
            println!("World hash before={before:#x} after={after:#x}");
            println!(
                "Reverted: {}",
                if before == after { "OK" } else { "MISMATCH" }
            );
            if let Some(dir) = data_dir {
                let store = FileStore::open(&dir)?;
                store.verify_integrity()?;
                println!("Store at {} verified", dir.display());
            }
        }
    }

    Ok(())
}

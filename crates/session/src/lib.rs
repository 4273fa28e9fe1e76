//! Sessions: timed events that take over part of the world and always give
//! it back.
//!
//! # Invariants
//! - Hooks fire start, tick*, end, each session at most once per hook call
//!   site, never after the session left `Running`.
//! - A session is removed from the registry only after every claim it held
//!   was released.
//! - A failing hook cancels its session with a full release; the error
//!   never reaches the driving thread.
//! - Everything runs on the single driving tick thread. There are no locks;
//!   a threaded host must queue mutations onto that thread.

mod config;
mod context;
mod coordinator;
mod engine;
mod error;
mod lifecycle;
mod registry;
mod scheduler;
mod session;
mod telemetry;

pub use config::{ConfigError, EngineSettings, SessionConfig};
pub use context::{Deferred, EngineContext, EventContext};
pub use coordinator::{DisableCoordinator, ShutdownReport};
pub use engine::EventEngine;
pub use error::{HookError, SessionError};
pub use lifecycle::{EventCatalog, EventLifecycle};
pub use registry::SessionRegistry;
pub use scheduler::{EventScheduler, TickReport};
pub use session::{Session, SessionState};
pub use telemetry::{LogObserver, NoopObserver, SessionObserver, TelemetryError};

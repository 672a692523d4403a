//! Tick-driven simulation services for Tileworld.
//!
//! [`WorldSimulation`] drives the world one tick at a time: it plans actors
//! on spots with players present, moves hitboxes in substeps, rolls weather,
//! drains stamina and respawns monsters. All world state is read from and
//! written back through the repository ports in [`repository`], so the
//! simulation never holds aggregates between ticks.

/// Per-spot threat tables.
pub mod aggro;
/// Actor contexts, actions and the behaviour planner.
pub mod behavior;
/// Tick clock, time providers and time of day.
pub mod clock;
/// Configuration types and config services.
pub mod config;
/// Error types for the simulation crate.
pub mod error;
/// Event log, deduplication and the event publisher.
pub mod event;
/// Hitbox substep integration and collision resolution.
pub mod hitbox;
/// A* pathfinding with a per-actor path cache.
pub mod pathfinding;
/// Repository ports and in-memory adapters.
pub mod repository;
/// Top-level tick orchestrator.
pub mod simulation;
/// Weather transition rolls.
pub mod weather;

/// Re-exports of [`aggro::AggroEntry`] and [`aggro::AggroStore`].
pub use aggro::{AggroEntry, AggroStore};
/// Re-exports of the planner types.
pub use behavior::{
    ActorContexts, BehaviorAction, BehaviorPlanner, BehaviorService, GrowthContext, SkillContext,
    TargetContext,
};
/// Re-exports of [`clock::SimClock`], [`clock::TimeOfDay`] and [`clock::TimeProvider`].
pub use clock::{SimClock, TimeOfDay, TimeProvider};
/// Re-exports of the configuration types and services.
pub use config::{
    AggroConfig, AggroConfigService, BehaviorConfig, HitBoxConfig, HitBoxConfigService,
    SimConfig, WeatherConfig, WeatherConfigService, WorldTimeConfig, WorldTimeConfigService,
};
/// Re-exports of the error types.
pub use error::{RepositoryError, RepositoryResult, SimError, SimResult};
/// Re-exports of [`event::EventLog`], [`event::EventPublisher`] and [`event::InMemoryEventPublisher`].
pub use event::{EventLog, EventPublisher, InMemoryEventPublisher, RecordedEvent};
/// Re-exports of the hitbox engine types.
pub use hitbox::{CollisionGuard, HitBoxCollisionEngine, HitBoxStepOutcome, TargetHit};
/// Re-exports of [`pathfinding::PathCache`] and [`pathfinding::Pathfinder`].
pub use pathfinding::{PathCache, Pathfinder};
/// Re-exports of the repository ports and adapters.
pub use repository::{
    HitBoxRepository, InMemoryRepositories, InMemoryStore, Keyed, MonsterRepository,
    PhysicalMapRepository, PlayerStatusRepository, Repository, SkillLoadoutRepository,
    StagedRepository, TickTransaction, UnitOfWork, WeatherZoneRepository,
};
/// Re-exports of [`simulation::SimulationPorts`], [`simulation::TickReport`] and [`simulation::WorldSimulation`].
pub use simulation::{SimulationPorts, TickReport, WorldSimulation};
/// Re-export of [`weather::WeatherSimulationService`].
pub use weather::WeatherSimulationService;

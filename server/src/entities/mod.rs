//! Server-side horse entities.

pub mod horse;
pub mod ownership;
pub mod stable;

pub use horse::{normalize_display_name, HorseKey, LiveBinding, PlayerHorse};
pub use ownership::{MountRef, OwnershipRegistry};
pub use stable::{Stable, StableError, Stables};

use crate::config::HorsesConfig;
use crate::persistence::HorseDatabase;
use crate::world::WorldRuntime;

/// Collaborators a horse needs when it spawns, despawns or saves.
///
/// Built fresh for each call from the plugin's fields, so the world stays
/// borrowed only for the duration of one operation.
pub struct HorseContext<'a> {
    pub world: &'a mut dyn WorldRuntime,
    pub config: &'a HorsesConfig,
    pub database: &'a dyn HorseDatabase,
    pub ownership: &'a mut OwnershipRegistry,
}

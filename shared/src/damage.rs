//! Damage causes reported by the host world.

use serde::{Deserialize, Serialize};

/// Why an entity is being hurt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DamageCause {
    Contact,
    EntityAttack,
    EntitySweepAttack,
    Projectile,
    Suffocation,
    Fall,
    Fire,
    FireTick,
    Melting,
    Lava,
    Drowning,
    BlockExplosion,
    EntityExplosion,
    Void,
    Lightning,
    Suicide,
    Starvation,
    Poison,
    Magic,
    Wither,
    FallingBlock,
    Thorns,
    DragonBreath,
    Cramming,
    HotFloor,
    Custom,
}

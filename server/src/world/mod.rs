//! Host world interfaces.
//!
//! The plugin never owns entities itself. Everything it knows about a live
//! mount or player is read from, and written to, the host through
//! [`WorldRuntime`]. The host drives the plugin from its single simulation
//! thread, so every call here completes synchronously.

mod sim;

pub use sim::{SimAntiCheat, SimWorld};

use horses_shared::{
    DamageCause, EntityId, ItemStack, Location, MountStyle, MountVariant,
};

// =============================================================================
// Entities
// =============================================================================

/// What kind of thing an entity is, as far as damage resolution cares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Player,
    Mount(MountVariant),
    /// Arrows, tridents, snowballs. The shooter may have logged off or never existed.
    Projectile { shooter: Option<EntityId> },
    /// Lit TNT, remembering who lit it
    PrimedTnt { source: Option<EntityId> },
    Mob,
    Other,
}

// =============================================================================
// Damage Events
// =============================================================================

/// Where a hit came from
#[derive(Debug, Clone, PartialEq)]
pub enum DamageSource {
    /// Fall, drowning, starvation and anything else with no culprit
    Environment,
    /// Hit dealt by another entity (the projectile itself for ranged attacks)
    Entity(EntityId),
    /// Cactus, magma and the like
    Block(Option<Location>),
}

/// A cancellable notification that an entity is about to take damage.
///
/// Cancelling tells the host not to apply the natural effect of the hit.
#[derive(Debug, Clone, PartialEq)]
pub struct DamageEvent {
    pub target: EntityId,
    pub cause: DamageCause,
    pub damage: f64,
    pub source: DamageSource,
    cancelled: bool,
}

impl DamageEvent {
    pub fn new(target: EntityId, cause: DamageCause, damage: f64) -> Self {
        Self {
            target,
            cause,
            damage,
            source: DamageSource::Environment,
            cancelled: false,
        }
    }

    pub fn by_entity(damager: EntityId, target: EntityId, cause: DamageCause, damage: f64) -> Self {
        Self {
            source: DamageSource::Entity(damager),
            ..Self::new(target, cause, damage)
        }
    }

    pub fn by_block(block: Option<Location>, target: EntityId, cause: DamageCause, damage: f64) -> Self {
        Self {
            source: DamageSource::Block(block),
            ..Self::new(target, cause, damage)
        }
    }

    /// The entity that dealt the hit, if any
    pub fn damager(&self) -> Option<EntityId> {
        match self.source {
            DamageSource::Entity(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn set_cancelled(&mut self, cancelled: bool) {
        self.cancelled = cancelled;
    }

    /// Same cause and source, aimed at someone else. Starts uncancelled.
    pub fn redirected(&self, target: EntityId, damage: f64) -> Self {
        Self {
            target,
            cause: self.cause,
            damage,
            source: self.source.clone(),
            cancelled: false,
        }
    }
}

// =============================================================================
// Runtime Interfaces
// =============================================================================

/// Everything the plugin needs from the host world simulation.
///
/// Reads of unknown or removed entities return neutral values (`0.0`, empty
/// inventories, `None`) and writes to them are ignored.
pub trait WorldRuntime {
    // --- any entity ---

    fn entity_kind(&self, entity: EntityId) -> Option<EntityKind>;

    /// Entity still exists in a loaded part of the world
    fn is_valid(&self, entity: EntityId) -> bool;

    fn is_dead(&self, entity: EntityId) -> bool;

    fn location(&self, entity: EntityId) -> Option<Location>;

    /// Despawn an entity without killing it
    fn remove(&mut self, entity: EntityId);

    fn teleport(&mut self, entity: EntityId, to: &Location);

    fn health(&self, entity: EntityId) -> f64;

    fn set_health(&mut self, entity: EntityId, health: f64);

    /// Base value of the max-health attribute
    fn max_health(&self, entity: EntityId) -> f64;

    /// Set the base value of the max-health attribute. No-op for entities without one.
    fn set_max_health(&mut self, entity: EntityId, max_health: f64);

    /// Apply real damage, outside of any event
    fn damage(&mut self, entity: EntityId, amount: f64);

    fn passengers(&self, entity: EntityId) -> Vec<EntityId>;

    /// What the entity is riding
    fn vehicle(&self, entity: EntityId) -> Option<EntityId>;

    fn set_custom_name(&mut self, entity: EntityId, name: &str, visible: bool);

    // --- mounts ---

    /// Create a mount at a location. `bypass_protection` asks the host to ignore
    /// spawn-protection rules that would otherwise veto the spawn.
    fn spawn_mount(
        &mut self,
        variant: MountVariant,
        at: &Location,
        bypass_protection: bool,
    ) -> Option<EntityId>;

    fn style(&self, mount: EntityId) -> Option<MountStyle>;

    fn set_style(&mut self, mount: EntityId, style: MountStyle);

    /// Make the mount an adult, tamed, and owned by `owner`
    fn tame(&mut self, mount: EntityId, owner: EntityId);

    fn speed(&self, mount: EntityId) -> f64;

    fn set_speed(&mut self, mount: EntityId, speed: f64);

    fn jump_strength(&self, mount: EntityId) -> f64;

    fn set_jump_strength(&mut self, mount: EntityId, jump_strength: f64);

    /// Full inventory contents. Length is decided by the host.
    fn inventory(&self, mount: EntityId) -> Vec<Option<ItemStack>>;

    /// Replace inventory contents. Extra entries beyond the host's size are dropped.
    fn set_inventory(&mut self, mount: EntityId, contents: Vec<Option<ItemStack>>);

    fn set_inventory_slot(&mut self, mount: EntityId, slot: usize, item: Option<ItemStack>);

    fn is_carrying_chest(&self, mount: EntityId) -> bool;

    fn set_carrying_chest(&mut self, mount: EntityId, carrying: bool);

    /// Make the mount follow an entity
    fn set_target(&mut self, mount: EntityId, target: EntityId);

    // --- players ---

    fn player_name(&self, player: EntityId) -> Option<String>;

    fn online_player(&self, name: &str) -> Option<EntityId>;

    fn has_permission(&self, player: EntityId, node: &str) -> bool;

    fn send_message(&mut self, player: EntityId, message: &str);

    // --- events ---

    /// Run `event` through every listener the host has registered, in order,
    /// before returning. Listeners may cancel it.
    ///
    /// Re-entrancy: the plugin calls this from inside its own damage handler to
    /// probe a player-targeted copy of a mount hit. Hosts must not feed the
    /// probe back into the plugin's mount handler; since the probe never
    /// targets a mount, routing by target kind is enough.
    fn call_damage_event(&mut self, event: &mut DamageEvent);
}

/// Optional anti-cheat integration that can exempt players from its checks
pub trait AntiCheat {
    fn is_exempt(&self, player: EntityId) -> bool;

    fn exempt(&mut self, player: EntityId);

    fn unexempt(&mut self, player: EntityId);
}

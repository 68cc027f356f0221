//! Player-owned horses.
//!
//! A [`PlayerHorse`] is the durable half of a mount: stats, inventory and name
//! that survive despawns and restarts. While the horse is out in the world it
//! is bound to a live entity, and that entity is the source of truth. Every
//! getter refreshes the cached value from it and every setter pushes through
//! to it.

use log::{debug, info, warn};

use horses_shared::{
    EntityId, HorseType, ItemStack, ARMOR_SLOT, CARGO_START_SLOT, FIXED_JUMP_STRENGTH,
    SADDLE_SLOT, UNASSIGNED_HORSE_ID,
};

use crate::config::HorsesConfig;
use crate::messages::{strip_color, strip_formatting_codes, translate_color_codes, ALT_COLOR_CHAR};
use crate::persistence::{HorseDatabase, HorseRecord};
use crate::world::WorldRuntime;

use super::{HorseContext, MountRef};

/// Identifies a horse within its owner's stable. Unlike the storage id it is
/// known before the first save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HorseKey(pub u64);

/// Whether the horse currently has a body in the world
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveBinding {
    Unbound,
    Bound(EntityId),
}

/// Build the display name of a horse from what the player typed.
///
/// Formatting codes are dropped, colour codes become host colour escapes, any
/// other `&` is removed and spaces become underscores. Periods are removed only
/// when `strip_periods` is set.
pub fn normalize_display_name(raw: &str, strip_periods: bool) -> String {
    let colored = translate_color_codes(ALT_COLOR_CHAR, &strip_formatting_codes(raw));
    let name: String = colored
        .chars()
        .filter(|c| *c != ALT_COLOR_CHAR && !(strip_periods && *c == '.'))
        .map(|c| if c == ' ' { '_' } else { c })
        .collect();
    name
}

/// A horse owned by a player
#[derive(Debug, Clone)]
pub struct PlayerHorse {
    key: HorseKey,
    id: i32,
    owner: String,
    raw_name: String,
    display_name: String,
    name: String,
    horse_type: HorseType,

    // Cached stats, stale while bound
    max_health: f64,
    health: f64,
    speed: f64,
    jump_strength: f64,
    has_chest: bool,
    inventory: Vec<Option<ItemStack>>,

    /// Milliseconds since the epoch, 0 if the horse never died
    last_death: i64,
    live: LiveBinding,
}

impl PlayerHorse {
    /// Create an unbound horse, repairing out-of-range stats
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        key: HorseKey,
        owner: &str,
        name: &str,
        horse_type: HorseType,
        max_health: f64,
        health: f64,
        speed: f64,
        jump_strength: f64,
        id: i32,
        config: &HorsesConfig,
    ) -> Self {
        let health = if health <= 0.0 {
            config.type_config(horse_type).horse_hp
        } else {
            health
        };
        let max_health = if max_health < health || max_health <= 0.0 {
            health
        } else {
            max_health
        };
        let jump_strength = if jump_strength <= 0.0 && config.fix_zero_jump_strength {
            FIXED_JUMP_STRENGTH
        } else {
            jump_strength
        };

        let display_name = normalize_display_name(name, true);
        Self {
            key,
            id,
            owner: owner.to_string(),
            raw_name: name.to_string(),
            name: strip_color(&display_name),
            display_name,
            horse_type,
            max_health,
            health,
            speed: speed.max(0.0),
            jump_strength,
            has_chest: false,
            inventory: Vec::new(),
            last_death: 0,
            live: LiveBinding::Unbound,
        }
    }

    /// A horse with the base stats configured for its type
    pub fn fresh(key: HorseKey, owner: &str, name: &str, horse_type: HorseType, config: &HorsesConfig) -> Self {
        let base = config.type_config(horse_type);
        Self::new(
            key,
            owner,
            name,
            horse_type,
            base.horse_max_hp,
            base.horse_hp,
            base.speed,
            base.jump_strength,
            UNASSIGNED_HORSE_ID,
            config,
        )
    }

    /// Take over a mount already living in the world.
    ///
    /// Stats, chest and inventory are copied from `entity` once, then the
    /// entity is removed. The horse comes back when it is next summoned.
    pub fn adopt(
        key: HorseKey,
        owner: &str,
        name: &str,
        horse_type: HorseType,
        entity: EntityId,
        world: &mut dyn WorldRuntime,
        config: &HorsesConfig,
    ) -> Self {
        let mut horse = Self::new(
            key,
            owner,
            name,
            horse_type,
            world.max_health(entity),
            world.health(entity),
            world.speed(entity),
            world.jump_strength(entity),
            UNASSIGNED_HORSE_ID,
            config,
        );
        horse.max_health = world.max_health(entity);
        horse.health = world.health(entity);
        horse.speed = world.speed(entity);
        horse.jump_strength = world.jump_strength(entity);
        horse.has_chest = horse_type.is_chest_capable() && world.is_carrying_chest(entity);
        horse.inventory = world.inventory(entity);

        world.remove(entity);
        info!("{} adopted {} as '{}'", owner, entity, horse.name);
        horse
    }

    /// Rebuild a horse from storage
    pub fn from_record(key: HorseKey, record: &HorseRecord, config: &HorsesConfig) -> Self {
        let mut horse = Self::new(
            key,
            &record.owner,
            &record.name,
            record.horse_type,
            record.max_health,
            record.health,
            record.speed,
            record.jump_strength,
            record.id,
            config,
        );
        horse.has_chest = record.has_chest && record.horse_type.is_chest_capable();
        horse.inventory = record.inventory.clone();
        horse.last_death = record.last_death;
        horse
    }

    /// Snapshot of the cached state, as it would be stored
    pub fn to_record(&self) -> HorseRecord {
        HorseRecord {
            id: self.id,
            owner: self.owner.clone(),
            name: self.raw_name.clone(),
            horse_type: self.horse_type,
            max_health: self.max_health,
            health: self.health,
            speed: self.speed,
            jump_strength: self.jump_strength,
            has_chest: self.has_chest,
            last_death: self.last_death,
            inventory: self.inventory.clone(),
        }
    }

    // =========================================================================
    // Identity
    // =========================================================================

    pub fn key(&self) -> HorseKey {
        self.key
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Name as the player typed it
    pub fn raw_name(&self) -> &str {
        &self.raw_name
    }

    /// Name shown above the horse, with colour escapes
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Display name without colours
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn horse_type(&self) -> HorseType {
        self.horse_type
    }

    pub fn last_death(&self) -> i64 {
        self.last_death
    }

    pub fn set_last_death(&mut self, millis: i64) {
        self.last_death = millis;
    }

    /// Whole seconds left before a dead horse may be summoned again
    pub fn cooldown_remaining(&self, cooldown_secs: u64, now_millis: i64) -> u64 {
        if self.last_death <= 0 {
            return 0;
        }
        let ready_at = self.last_death.saturating_add((cooldown_secs as i64).saturating_mul(1000));
        let left = ready_at.saturating_sub(now_millis);
        if left <= 0 {
            0
        } else {
            ((left + 999) / 1000) as u64
        }
    }

    pub fn binding(&self) -> LiveBinding {
        self.live
    }

    /// The live entity, if the horse is bound to one that still exists
    pub fn live_entity(&self, world: &dyn WorldRuntime) -> Option<EntityId> {
        match self.live {
            LiveBinding::Bound(entity) if world.is_valid(entity) => Some(entity),
            _ => None,
        }
    }

    pub fn is_spawned(&self, world: &dyn WorldRuntime) -> bool {
        self.live_entity(world).is_some()
    }

    fn mount_ref(&self) -> MountRef {
        MountRef {
            owner: self.owner.clone(),
            key: self.key,
        }
    }

    // =========================================================================
    // Stats
    // =========================================================================

    pub fn max_health(&mut self, world: &dyn WorldRuntime) -> f64 {
        if let Some(entity) = self.live_entity(world) {
            self.max_health = world.max_health(entity);
        }
        self.max_health
    }

    pub fn set_max_health(&mut self, max_health: f64, world: &mut dyn WorldRuntime) {
        self.max_health = max_health;
        if let Some(entity) = self.live_entity(world) {
            world.set_max_health(entity, max_health);
        }
    }

    pub fn health(&mut self, world: &dyn WorldRuntime) -> f64 {
        if let Some(entity) = self.live_entity(world) {
            self.health = world.health(entity);
        }
        self.health
    }

    pub fn set_health(&mut self, health: f64, world: &mut dyn WorldRuntime) {
        self.health = health;
        if let Some(entity) = self.live_entity(world) {
            world.set_health(entity, health);
        }
    }

    pub fn speed(&mut self, world: &dyn WorldRuntime) -> f64 {
        if let Some(entity) = self.live_entity(world) {
            self.speed = world.speed(entity);
        }
        self.speed
    }

    pub fn set_speed(&mut self, speed: f64, world: &mut dyn WorldRuntime) {
        self.speed = speed;
        if let Some(entity) = self.live_entity(world) {
            world.set_speed(entity, speed);
        }
    }

    pub fn jump_strength(&mut self, world: &dyn WorldRuntime) -> f64 {
        if let Some(entity) = self.live_entity(world) {
            self.jump_strength = world.jump_strength(entity);
        }
        self.jump_strength
    }

    pub fn set_jump_strength(&mut self, jump_strength: f64, world: &mut dyn WorldRuntime) {
        self.jump_strength = jump_strength;
        if let Some(entity) = self.live_entity(world) {
            world.set_jump_strength(entity, jump_strength);
        }
    }

    /// Heal by up to `amount` without going over max health.
    /// Returns how much was actually applied.
    pub fn add_health(&mut self, amount: f64, world: &mut dyn WorldRuntime) -> f64 {
        let applied = self.heal_estimate(amount, world);
        let health = self.health(world) + applied;
        self.set_health(health, world);
        applied
    }

    /// How much `add_health(amount)` would apply right now
    pub fn heal_estimate(&self, amount: f64, world: &dyn WorldRuntime) -> f64 {
        let (max_health, health) = match self.live_entity(world) {
            Some(entity) => (world.max_health(entity), world.health(entity)),
            None => (self.max_health, self.health),
        };
        if health + amount > max_health {
            max_health - health
        } else {
            amount
        }
    }

    /// Raise max health and health together, uncapped
    pub fn add_max_health(&mut self, amount: f64, world: &mut dyn WorldRuntime) {
        let max_health = self.max_health(world) + amount;
        let health = self.health(world) + amount;
        self.set_max_health(max_health, world);
        self.set_health(health, world);
    }

    // =========================================================================
    // Inventory
    // =========================================================================

    /// Whether a chest is strapped on. Always false for types that can't carry one.
    pub fn has_chest(&mut self, world: &dyn WorldRuntime) -> bool {
        if !self.horse_type.is_chest_capable() {
            return false;
        }
        if let Some(entity) = self.live_entity(world) {
            self.has_chest = world.is_carrying_chest(entity);
        }
        self.has_chest
    }

    pub fn set_has_chest(&mut self, has_chest: bool, world: &mut dyn WorldRuntime) {
        if !self.horse_type.is_chest_capable() {
            return;
        }
        self.has_chest = has_chest;
        if let Some(entity) = self.live_entity(world) {
            world.set_carrying_chest(entity, has_chest);
        }
    }

    /// Item in a slot. `None` for empty, negative or out-of-range slots.
    pub fn item(&mut self, slot: i32, world: &dyn WorldRuntime) -> Option<ItemStack> {
        if slot < 0 {
            return None;
        }
        self.items(world).get(slot as usize).cloned().flatten()
    }

    pub fn items(&mut self, world: &dyn WorldRuntime) -> &[Option<ItemStack>] {
        if let Some(entity) = self.live_entity(world) {
            self.inventory = world.inventory(entity);
        }
        &self.inventory
    }

    /// Put an item in a slot, growing the inventory as needed. Negative slots are ignored.
    pub fn set_item(&mut self, slot: i32, item: Option<ItemStack>, world: &mut dyn WorldRuntime) {
        if slot < 0 {
            return;
        }
        let slot = slot as usize;
        let item = item.and_then(ItemStack::into_slot);
        if self.inventory.len() <= slot {
            self.inventory.resize(slot + 1, None);
        }
        self.inventory[slot] = item.clone();
        if let Some(entity) = self.live_entity(world) {
            world.set_inventory_slot(entity, slot, item);
        }
    }

    pub fn set_items(&mut self, items: Vec<Option<ItemStack>>, world: &mut dyn WorldRuntime) {
        self.inventory = items;
        if let Some(entity) = self.live_entity(world) {
            world.set_inventory(entity, self.inventory.clone());
        }
    }

    pub fn set_saddle(&mut self, material: &str, world: &mut dyn WorldRuntime) {
        self.set_item(SADDLE_SLOT as i32, Some(ItemStack::new(material)), world);
    }

    pub fn set_armour(&mut self, material: &str, world: &mut dyn WorldRuntime) {
        self.set_item(ARMOR_SLOT as i32, Some(ItemStack::new(material)), world);
    }

    // =========================================================================
    // World presence
    // =========================================================================

    /// Bring the horse out next to its owner.
    ///
    /// Does not touch any other horse of the owner; [`super::Stable::spawn_horse`]
    /// dismisses the previous one first.
    pub(crate) fn spawn_horse(&mut self, player: EntityId, ctx: &mut HorseContext<'_>) -> bool {
        if ctx.world.player_name(player).as_deref() != Some(self.owner.as_str()) {
            return false;
        }
        let Some(location) = ctx.world.location(player) else {
            return false;
        };

        if let Some(entity) = self.live_entity(&*ctx.world) {
            ctx.world.teleport(entity, &location);
            debug!("Teleported '{}' ({}) to {}", self.name, entity, self.owner);
            return true;
        }

        let bypass = ctx
            .config
            .perm_config(&*ctx.world, Some(player))
            .bypass_spawn_protection;
        let Some(entity) = ctx.world.spawn_mount(self.horse_type.variant(), &location, bypass) else {
            warn!("Could not spawn '{}' for {} at {:?}", self.name, self.owner, location);
            return false;
        };

        let world = &mut *ctx.world;
        if let Some(style) = self.horse_type.style() {
            world.set_style(entity, style);
        }
        world.tame(entity, player);
        if self.horse_type.is_chest_capable() && self.has_chest {
            world.set_carrying_chest(entity, true);
        }

        // Cargo first, then equipment into its dedicated slots
        let size = world.inventory(entity).len();
        let contents = (0..size)
            .map(|slot| {
                if slot < CARGO_START_SLOT {
                    None
                } else {
                    self.inventory.get(slot).cloned().flatten()
                }
            })
            .collect();
        world.set_inventory(entity, contents);
        for slot in [SADDLE_SLOT, ARMOR_SLOT] {
            if let Some(Some(item)) = self.inventory.get(slot) {
                world.set_inventory_slot(entity, slot, Some(item.clone()));
            }
        }

        world.set_custom_name(entity, &self.display_name, true);
        world.set_max_health(entity, self.max_health);
        world.set_health(entity, self.health);
        world.set_speed(entity, self.speed);
        world.set_jump_strength(entity, self.jump_strength);
        world.set_target(entity, player);

        ctx.ownership.bind(entity, self.mount_ref());
        self.live = LiveBinding::Bound(entity);
        info!("Spawned '{}' of {} as {}", self.name, self.owner, entity);
        true
    }

    /// Put the horse back in the stable, keeping what the live entity knew, then save.
    pub(crate) fn remove_horse(&mut self, ctx: &mut HorseContext<'_>) {
        if let LiveBinding::Bound(entity) = self.live {
            let world = &mut *ctx.world;
            // The entity may already be gone if the host unloaded it
            if world.entity_kind(entity).is_some() {
                let dead = world.is_dead(entity);
                if !dead {
                    self.health = world.health(entity);
                }
                self.has_chest = self.horse_type.is_chest_capable() && world.is_carrying_chest(entity);
                self.inventory = world.inventory(entity);

                if dead {
                    let owner = world.online_player(&self.owner);
                    if ctx.config.perm_config(&*world, owner).keep_equipment_on_death {
                        // Nothing left on the body to drop
                        world.set_inventory(entity, Vec::new());
                        world.set_carrying_chest(entity, false);
                    } else {
                        self.inventory.clear();
                        self.has_chest = false;
                    }
                }
                world.remove(entity);
            }

            ctx.ownership.unbind(entity);
            self.live = LiveBinding::Unbound;
            info!("Stabled '{}' of {}", self.name, self.owner);
        }

        self.save_changes(&*ctx.world, ctx.database);
    }

    /// Despawn without capturing anything and ask storage to forget the horse
    pub(crate) fn delete_horse(&mut self, ctx: &mut HorseContext<'_>) -> bool {
        if let LiveBinding::Bound(entity) = self.live {
            ctx.world.remove(entity);
            ctx.ownership.unbind(entity);
            self.live = LiveBinding::Unbound;
        }
        ctx.database.delete_horse(&self.owner, self.id)
    }

    /// Change the name, keeping any periods, and save
    pub fn rename(&mut self, new_name: &str, world: &mut dyn WorldRuntime, database: &dyn HorseDatabase) {
        self.raw_name = new_name.to_string();
        self.display_name = normalize_display_name(new_name, false);
        self.name = strip_color(&self.display_name);
        if let Some(entity) = self.live_entity(world) {
            world.set_custom_name(entity, &self.display_name, true);
        }
        self.save_changes(world, database);
    }

    /// Refresh from the live entity and hand the snapshot to storage
    pub fn save_changes(&mut self, world: &dyn WorldRuntime, database: &dyn HorseDatabase) {
        if self.live_entity(world).is_some() {
            self.max_health(world);
            self.health(world);
            self.speed(world);
            self.jump_strength(world);
            self.has_chest(world);
            self.items(world);
        }
        self.id = database.save_horse(&self.to_record());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::OwnershipRegistry;
    use crate::persistence::MemoryDatabase;
    use crate::world::SimWorld;
    use horses_shared::{Location, MountVariant};

    fn origin() -> Location {
        Location::new("world", 10.0, 64.0, -5.0)
    }

    fn horse(config: &HorsesConfig, max_health: f64, health: f64) -> PlayerHorse {
        PlayerHorse::new(
            HorseKey(1),
            "Steve",
            "Bucephalus",
            HorseType::Brown,
            max_health,
            health,
            0.25,
            0.6,
            UNASSIGNED_HORSE_ID,
            config,
        )
    }

    struct Fixture {
        world: SimWorld,
        config: HorsesConfig,
        database: MemoryDatabase,
        ownership: OwnershipRegistry,
        steve: EntityId,
    }

    impl Fixture {
        fn new() -> Self {
            let mut world = SimWorld::new();
            let steve = world.add_player("Steve", origin());
            Self {
                world,
                config: HorsesConfig::default(),
                database: MemoryDatabase::new(),
                ownership: OwnershipRegistry::new(),
                steve,
            }
        }

        fn ctx(&mut self) -> HorseContext<'_> {
            HorseContext {
                world: &mut self.world,
                config: &self.config,
                database: &self.database,
                ownership: &mut self.ownership,
            }
        }
    }

    #[test]
    fn test_missing_health_uses_type_default() {
        let config = HorsesConfig::default();
        for health in [0.0, -3.0] {
            let h = horse(&config, 30.0, health);
            assert_eq!(h.health, config.type_config(HorseType::Brown).horse_hp);
        }
    }

    #[test]
    fn test_max_health_never_below_health() {
        let config = HorsesConfig::default();
        assert_eq!(horse(&config, 10.0, 15.0).max_health, 15.0);
        assert_eq!(horse(&config, 0.0, 15.0).max_health, 15.0);
        assert_eq!(horse(&config, 25.0, 15.0).max_health, 25.0);
    }

    #[test]
    fn test_zero_jump_strength_is_fixed() {
        let mut config = HorsesConfig::default();
        let h = PlayerHorse::new(HorseKey(1), "Steve", "A", HorseType::Black, 20.0, 20.0, 0.2, 0.0, 5, &config);
        assert_eq!(h.jump_strength, FIXED_JUMP_STRENGTH);

        config.fix_zero_jump_strength = false;
        let h = PlayerHorse::new(HorseKey(1), "Steve", "A", HorseType::Black, 20.0, 20.0, 0.2, 0.0, 5, &config);
        assert_eq!(h.jump_strength, 0.0);
    }

    #[test]
    fn test_name_normalization() {
        let config = HorsesConfig::default();
        let h = PlayerHorse::new(HorseKey(1), "Steve", "&lMy &kHorse.1", HorseType::White, 0.0, 0.0, 0.2, 0.7, -1, &config);
        assert_eq!(h.display_name(), "My_Horse1");
        assert_eq!(h.name(), "My_Horse1");
        assert_eq!(h.raw_name(), "&lMy &kHorse.1");

        let h = PlayerHorse::new(HorseKey(1), "Steve", "&cRed & Ready", HorseType::White, 0.0, 0.0, 0.2, 0.7, -1, &config);
        assert_eq!(h.display_name(), "\u{a7}cRed__Ready");
        assert_eq!(h.name(), "Red__Ready");
    }

    #[test]
    fn test_add_health_clamps_and_reports_applied() {
        let config = HorsesConfig::default();
        let mut world = SimWorld::new();
        let mut h = horse(&config, 30.0, 25.0);

        assert_eq!(h.heal_estimate(10.0, &world), 5.0);
        assert_eq!(h.heal_estimate(10.0, &world), 5.0);
        assert_eq!(h.health, 25.0);

        assert_eq!(h.add_health(10.0, &mut world), 5.0);
        assert_eq!(h.health(&world), 30.0);
        assert_eq!(h.add_health(2.0, &mut world), 0.0);
        assert_eq!(h.health(&world), 30.0);

        h.set_health(10.0, &mut world);
        assert_eq!(h.add_health(4.0, &mut world), 4.0);
        assert_eq!(h.health(&world), 14.0);
    }

    #[test]
    fn test_add_max_health_raises_both() {
        let config = HorsesConfig::default();
        let mut world = SimWorld::new();
        let mut h = horse(&config, 30.0, 30.0);

        h.add_max_health(5.0, &mut world);
        assert_eq!(h.max_health(&world), 35.0);
        assert_eq!(h.health(&world), 35.0);
    }

    #[test]
    fn test_chest_only_on_chest_capable_types() {
        let config = HorsesConfig::default();
        let mut world = SimWorld::new();

        let mut h = horse(&config, 30.0, 20.0);
        h.set_has_chest(true, &mut world);
        assert!(!h.has_chest(&world));

        let mut donkey = PlayerHorse::fresh(HorseKey(2), "Steve", "Eeyore", HorseType::Donkey, &config);
        donkey.set_has_chest(true, &mut world);
        assert!(donkey.has_chest(&world));
    }

    #[test]
    fn test_item_slots() {
        let config = HorsesConfig::default();
        let mut world = SimWorld::new();
        let mut h = horse(&config, 30.0, 20.0);

        h.set_item(-1, Some(ItemStack::new("saddle")), &mut world);
        assert!(h.items(&world).is_empty());
        assert_eq!(h.item(-1, &world), None);

        h.set_item(3, Some(ItemStack::new("apple")), &mut world);
        assert_eq!(h.items(&world).len(), 4);
        assert_eq!(h.item(3, &world), Some(ItemStack::new("apple")));
        assert_eq!(h.item(2, &world), None);
        assert_eq!(h.item(9, &world), None);

        // Replaces rather than inserts
        h.set_item(3, Some(ItemStack::new("carrot")), &mut world);
        assert_eq!(h.items(&world).len(), 4);
        assert_eq!(h.item(3, &world), Some(ItemStack::new("carrot")));

        h.set_saddle("saddle", &mut world);
        h.set_armour("iron_horse_armor", &mut world);
        assert_eq!(h.item(0, &world), Some(ItemStack::new("saddle")));
        assert_eq!(h.item(1, &world), Some(ItemStack::new("iron_horse_armor")));
    }

    #[test]
    fn test_spawn_applies_snapshot_to_entity() {
        let mut fx = Fixture::new();
        let config = fx.config.clone();
        let mut donkey = PlayerHorse::new(HorseKey(4), "Steve", "Pack Mule", HorseType::Donkey, 26.0, 21.0, 0.18, 0.55, 3, &config);
        donkey.has_chest = true;
        donkey.inventory = vec![
            Some(ItemStack::new("saddle")),
            None,
            Some(ItemStack::with_amount("wheat", 32)),
        ];

        let steve = fx.steve;
        assert!(donkey.spawn_horse(steve, &mut fx.ctx()));
        let entity = match donkey.binding() {
            LiveBinding::Bound(entity) => entity,
            LiveBinding::Unbound => panic!("horse should be bound"),
        };

        let world = &fx.world;
        assert_eq!(world.entity_kind(entity), Some(crate::world::EntityKind::Mount(MountVariant::Donkey)));
        assert_eq!(world.taming(entity), Some((Some(steve), true, true)));
        assert!(world.is_carrying_chest(entity));
        assert_eq!(world.inventory(entity)[0], Some(ItemStack::new("saddle")));
        assert_eq!(world.inventory(entity)[2], Some(ItemStack::with_amount("wheat", 32)));
        assert_eq!(world.custom_name(entity), Some(("Pack_Mule", true)));
        assert_eq!(world.max_health(entity), 26.0);
        assert_eq!(world.health(entity), 21.0);
        assert_eq!(world.speed(entity), 0.18);
        assert_eq!(world.jump_strength(entity), 0.55);
        assert_eq!(world.target_of(entity), Some(steve));
        assert_eq!(world.location(entity), Some(origin()));

        let mount = fx.ownership.resolve(entity).unwrap();
        assert_eq!((mount.owner.as_str(), mount.key), ("Steve", HorseKey(4)));
    }

    #[test]
    fn test_spawn_refused_for_other_players() {
        let mut fx = Fixture::new();
        let alex = fx.world.add_player("Alex", origin());
        let mut h = horse(&fx.config.clone(), 30.0, 20.0);

        assert!(!h.spawn_horse(alex, &mut fx.ctx()));
        assert_eq!(h.binding(), LiveBinding::Unbound);
        assert_eq!(fx.world.mount_count(), 0);
    }

    #[test]
    fn test_spawn_failure_returns_false() {
        let mut fx = Fixture::new();
        fx.world.set_refuse_spawns(true);
        let mut h = horse(&fx.config.clone(), 30.0, 20.0);

        let steve = fx.steve;
        assert!(!h.spawn_horse(steve, &mut fx.ctx()));
        assert_eq!(h.binding(), LiveBinding::Unbound);
        assert!(fx.ownership.is_empty());
    }

    #[test]
    fn test_spawn_protection_bypass_follows_config() {
        let mut fx = Fixture::new();
        fx.world.set_spawn_protected(true);
        let mut h = horse(&fx.config.clone(), 30.0, 20.0);
        let steve = fx.steve;

        assert!(h.spawn_horse(steve, &mut fx.ctx()));

        let mut fx = Fixture::new();
        fx.world.set_spawn_protected(true);
        fx.config.permissions.default.bypass_spawn_protection = false;
        let mut h = horse(&fx.config.clone(), 30.0, 20.0);
        let steve = fx.steve;
        assert!(!h.spawn_horse(steve, &mut fx.ctx()));
    }

    #[test]
    fn test_second_spawn_teleports_in_place() {
        let mut fx = Fixture::new();
        let mut h = horse(&fx.config.clone(), 30.0, 20.0);
        let steve = fx.steve;
        assert!(h.spawn_horse(steve, &mut fx.ctx()));
        let first = h.binding();

        let elsewhere = Location::new("world", 100.0, 70.0, 100.0);
        fx.world.teleport(steve, &elsewhere);
        assert!(h.spawn_horse(steve, &mut fx.ctx()));

        assert_eq!(h.binding(), first);
        assert_eq!(fx.world.mount_count(), 1);
        if let LiveBinding::Bound(entity) = first {
            assert_eq!(fx.world.location(entity), Some(elsewhere));
        }
    }

    #[test]
    fn test_getters_read_through_live_entity() {
        let mut fx = Fixture::new();
        let mut h = horse(&fx.config.clone(), 30.0, 20.0);
        let steve = fx.steve;
        assert!(h.spawn_horse(steve, &mut fx.ctx()));
        let LiveBinding::Bound(entity) = h.binding() else {
            panic!("horse should be bound");
        };

        // Cache says one thing, the entity another
        h.health = 1.0;
        h.speed = 9.0;
        fx.world.set_health(entity, 12.5);
        fx.world.set_speed(entity, 0.31);
        fx.world.set_inventory_slot(entity, 0, Some(ItemStack::new("saddle")));

        assert_eq!(h.health(&fx.world), 12.5);
        assert_eq!(h.speed(&fx.world), 0.31);
        assert_eq!(h.item(0, &fx.world), Some(ItemStack::new("saddle")));

        // And setters write through
        h.set_jump_strength(0.9, &mut fx.world);
        assert_eq!(fx.world.jump_strength(entity), 0.9);
        h.set_items(vec![None, Some(ItemStack::new("gold_horse_armor"))], &mut fx.world);
        assert_eq!(fx.world.inventory(entity)[0], None);
        assert_eq!(fx.world.inventory(entity)[1], Some(ItemStack::new("gold_horse_armor")));
    }

    #[test]
    fn test_remove_captures_state_and_saves() {
        let mut fx = Fixture::new();
        let mut h = horse(&fx.config.clone(), 30.0, 20.0);
        let steve = fx.steve;
        assert!(h.spawn_horse(steve, &mut fx.ctx()));
        let LiveBinding::Bound(entity) = h.binding() else {
            panic!("horse should be bound");
        };

        fx.world.set_health(entity, 17.0);
        fx.world.set_inventory_slot(entity, 1, Some(ItemStack::new("gold_horse_armor")));

        h.remove_horse(&mut fx.ctx());

        assert_eq!(h.binding(), LiveBinding::Unbound);
        assert!(!fx.world.contains(entity));
        assert!(fx.ownership.resolve(entity).is_none());
        assert_ne!(h.id(), UNASSIGNED_HORSE_ID);

        let stored = fx.database.get(h.id()).unwrap();
        assert_eq!(stored.health, 17.0);
        assert_eq!(stored.inventory[1], Some(ItemStack::new("gold_horse_armor")));
    }

    #[test]
    fn test_death_drops_equipment_unless_kept() {
        for keep in [false, true] {
            let mut fx = Fixture::new();
            fx.config.permissions.default.keep_equipment_on_death = keep;
            let mut h = horse(&fx.config.clone(), 30.0, 20.0);
            h.inventory = vec![Some(ItemStack::new("saddle"))];
            let steve = fx.steve;
            assert!(h.spawn_horse(steve, &mut fx.ctx()));
            let LiveBinding::Bound(entity) = h.binding() else {
                panic!("horse should be bound");
            };

            fx.world.kill(entity);
            h.remove_horse(&mut fx.ctx());

            let saddle = h.item(0, &fx.world);
            if keep {
                assert_eq!(saddle, Some(ItemStack::new("saddle")));
            } else {
                assert_eq!(saddle, None);
            }
            assert!(!fx.world.contains(entity));
        }
    }

    #[test]
    fn test_adopt_captures_and_removes_entity() {
        let config = HorsesConfig::default();
        let mut world = SimWorld::new();
        let wild = world.add_wild_mount(MountVariant::Mule, None, origin());
        world.set_max_health(wild, 22.0);
        world.set_health(wild, 18.0);
        world.set_carrying_chest(wild, true);
        world.set_inventory_slot(wild, 5, Some(ItemStack::new("diamond")));

        let mut h = PlayerHorse::adopt(HorseKey(7), "Steve", "Stubborn", HorseType::Mule, wild, &mut world, &config);

        assert!(!world.contains(wild));
        assert_eq!(h.binding(), LiveBinding::Unbound);
        assert_eq!(h.max_health(&world), 22.0);
        assert_eq!(h.health(&world), 18.0);
        assert_eq!(h.speed(&world), 0.2);
        assert_eq!(h.jump_strength(&world), 0.5);
        assert!(h.has_chest(&world));
        assert_eq!(h.item(5, &world), Some(ItemStack::new("diamond")));
    }

    #[test]
    fn test_rename_keeps_periods_and_updates_entity() {
        let mut fx = Fixture::new();
        let mut h = horse(&fx.config.clone(), 30.0, 20.0);
        let steve = fx.steve;
        assert!(h.spawn_horse(steve, &mut fx.ctx()));
        let LiveBinding::Bound(entity) = h.binding() else {
            panic!("horse should be bound");
        };

        h.rename("&aSir. Trots", &mut fx.world, &fx.database);
        assert_eq!(h.name(), "Sir._Trots");
        assert_eq!(fx.world.custom_name(entity), Some(("\u{a7}aSir._Trots", true)));
        assert_eq!(fx.database.get(h.id()).unwrap().name, "&aSir. Trots");
    }

    #[test]
    fn test_death_cooldown() {
        let config = HorsesConfig::default();
        let mut h = horse(&config, 30.0, 20.0);
        assert_eq!(h.cooldown_remaining(60, 5_000), 0);

        h.set_last_death(10_000);
        assert_eq!(h.cooldown_remaining(60, 10_000), 60);
        assert_eq!(h.cooldown_remaining(60, 69_500), 1);
        assert_eq!(h.cooldown_remaining(60, 70_000), 0);
        assert_eq!(h.cooldown_remaining(0, 10_000), 0);
    }

    #[test]
    fn test_record_round_trip_keeps_state() {
        let config = HorsesConfig::default();
        let mut h = horse(&config, 30.0, 20.0);
        h.has_chest = false;
        h.last_death = 1_700_000_000_000;
        h.inventory = vec![None, Some(ItemStack::new("leather_horse_armor"))];

        let restored = PlayerHorse::from_record(HorseKey(9), &h.to_record(), &config);
        assert_eq!(restored.to_record(), h.to_record());
        assert_eq!(restored.key(), HorseKey(9));
    }
}

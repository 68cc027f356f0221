//! Plugin root.
//!
//! [`HorsesPlugin`] owns the config, the storage handle, every loaded stable
//! and the ownership table, and is what the host calls into. The host world
//! is passed in with each call rather than stored.

use log::{info, warn};

use horses_shared::EntityId;

use crate::config::HorsesConfig;
use crate::entities::{HorseContext, OwnershipRegistry, PlayerHorse, Stable, Stables};
use crate::listeners::DamageListener;
use crate::persistence::{HorseDatabase, HorseRecord};
use crate::world::{AntiCheat, DamageEvent, WorldRuntime};

/// Current time in milliseconds since the epoch
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub struct HorsesPlugin {
    config: HorsesConfig,
    database: Box<dyn HorseDatabase>,
    stables: Stables,
    ownership: OwnershipRegistry,
    damage_listener: DamageListener,
}

impl HorsesPlugin {
    pub fn new(
        config: HorsesConfig,
        database: Box<dyn HorseDatabase>,
        anticheat: Option<Box<dyn AntiCheat>>,
    ) -> Self {
        let damage_listener = DamageListener::new(anticheat);
        if damage_listener.has_anticheat() {
            info!("Anti-cheat integration enabled");
        }
        Self {
            config,
            database,
            stables: Stables::new(),
            ownership: OwnershipRegistry::new(),
            damage_listener,
        }
    }

    pub fn config(&self) -> &HorsesConfig {
        &self.config
    }

    /// Swap in a reloaded config. Horses already out keep their stats.
    pub fn set_config(&mut self, config: HorsesConfig) {
        self.config = config;
    }

    pub fn stables(&self) -> &Stables {
        &self.stables
    }

    pub fn stable(&self, owner: &str) -> Option<&Stable> {
        self.stables.get(owner)
    }

    pub fn ownership(&self) -> &OwnershipRegistry {
        &self.ownership
    }

    /// An owner's stable together with everything its operations need
    pub fn stable_context<'a>(
        &'a mut self,
        owner: &str,
        world: &'a mut dyn WorldRuntime,
    ) -> (&'a mut Stable, HorseContext<'a>) {
        (
            self.stables.entry(owner),
            HorseContext {
                world,
                config: &self.config,
                database: self.database.as_ref(),
                ownership: &mut self.ownership,
            },
        )
    }

    /// Install a stable loaded from storage. A stable already in memory wins,
    /// since it may have a horse out.
    pub fn load_stable(&mut self, owner: &str, records: &[HorseRecord]) {
        if self.stables.get(owner).is_some() {
            return;
        }
        let stable = Stable::from_records(owner, records, &self.config);
        info!("Loaded stable of {} ({} horses)", owner, stable.len());
        self.stables.insert(stable);
    }

    /// The managed horse a live entity is the body of
    pub fn resolve_owner_of(&self, entity: EntityId) -> Option<&PlayerHorse> {
        self.stables.resolve(&self.ownership, entity)
    }

    // =========================================================================
    // Host events
    // =========================================================================

    pub fn on_entity_damage(&mut self, event: &mut DamageEvent, world: &mut dyn WorldRuntime) {
        self.damage_listener
            .on_entity_damage(event, world, &self.config, &self.stables, &self.ownership);
    }

    /// A managed horse died: remember when, and put it back in the stable
    pub fn on_entity_death(&mut self, entity: EntityId, world: &mut dyn WorldRuntime) {
        let Some(mount) = self.resolve_owner_of(entity).map(|h| (h.owner().to_string(), h.key())) else {
            return;
        };
        let (owner, key) = mount;
        let (stable, mut ctx) = self.stable_context(&owner, world);
        if let Some(horse) = stable.get_mut(key) {
            horse.set_last_death(now_millis());
            info!("'{}' of {} died", horse.name(), owner);
        }
        stable.remove_horse(key, &mut ctx);
    }

    /// Put the owner's horse away and forget their stable
    pub fn on_player_quit(&mut self, owner: &str, world: &mut dyn WorldRuntime) {
        if self.stables.get(owner).is_none() {
            return;
        }
        let (stable, mut ctx) = self.stable_context(owner, world);
        stable.dismiss(&mut ctx);
        stable.save_all(&*ctx.world, ctx.database);
        self.stables.remove(owner);
    }

    /// Persist every loaded horse
    pub fn save_all(&mut self, world: &dyn WorldRuntime) {
        let mut saved = 0;
        for stable in self.stables.iter_mut() {
            stable.save_all(world, self.database.as_ref());
            saved += stable.len();
        }
        info!("Saved {} horses", saved);
    }

    /// Put every horse away and persist
    pub fn shutdown(&mut self, world: &mut dyn WorldRuntime) {
        let owners: Vec<String> = self
            .stables
            .iter_mut()
            .filter(|s| s.active_key().is_some())
            .map(|s| s.owner().to_string())
            .collect();
        for owner in owners {
            let (stable, mut ctx) = self.stable_context(&owner, world);
            stable.dismiss(&mut ctx);
        }
        self.save_all(&*world);
        if !self.ownership.is_empty() {
            warn!("{} mounts still tracked after shutdown", self.ownership.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::entities::LiveBinding;
    use crate::persistence::MemoryDatabase;
    use crate::world::SimWorld;
    use horses_shared::{DamageCause, HorseType, ItemStack, Location};

    fn origin() -> Location {
        Location::new("world", 0.0, 64.0, 0.0)
    }

    struct Fixture {
        world: SimWorld,
        database: Rc<MemoryDatabase>,
        plugin: HorsesPlugin,
        steve: EntityId,
    }

    impl Fixture {
        fn new(config: HorsesConfig) -> Self {
            let mut world = SimWorld::new();
            let steve = world.add_player("Steve", origin());
            let database = Rc::new(MemoryDatabase::new());
            let plugin = HorsesPlugin::new(config, Box::new(database.clone()), None);
            Self { world, database, plugin, steve }
        }

        /// Buy a horse for Steve and bring it out
        fn spawned(&mut self, name: &str) -> EntityId {
            let steve = self.steve;
            let (stable, mut ctx) = self.plugin.stable_context("Steve", &mut self.world);
            let key = stable.create_horse(name, HorseType::Donkey, &mut ctx).unwrap();
            assert!(stable.spawn_horse(key, steve, &mut ctx));
            match stable.get(key).unwrap().binding() {
                LiveBinding::Bound(entity) => entity,
                LiveBinding::Unbound => panic!("horse should be out"),
            }
        }
    }

    #[test]
    fn test_damage_goes_through_listener() {
        let mut config = HorsesConfig::default();
        config.permissions.default.invincible_horses = true;
        let mut fx = Fixture::new(config);
        let horse = fx.spawned("Eeyore");

        let mut event = DamageEvent::new(horse, DamageCause::Fall, 3.0);
        fx.plugin.on_entity_damage(&mut event, &mut fx.world);
        assert!(event.is_cancelled());
        assert_eq!(fx.plugin.resolve_owner_of(horse).unwrap().name(), "Eeyore");
    }

    #[test]
    fn test_death_records_time_and_stables_horse() {
        let mut fx = Fixture::new(HorsesConfig::default());
        let horse = fx.spawned("Eeyore");
        let before = now_millis();

        fx.world.kill(horse);
        fx.plugin.on_entity_death(horse, &mut fx.world);

        let stable = fx.plugin.stable("Steve").unwrap();
        assert_eq!(stable.active_key(), None);
        let stored = fx.database.stable("Steve").pop().unwrap();
        assert!(stored.last_death >= before);
        assert!(fx.plugin.resolve_owner_of(horse).is_none());
        assert!(!fx.world.contains(horse));
    }

    #[test]
    fn test_anticheat_is_handed_to_listener() {
        let fx = Fixture::new(HorsesConfig::default());
        assert!(!fx.plugin.damage_listener.has_anticheat());

        let database = Rc::new(MemoryDatabase::new());
        let anticheat: Box<dyn AntiCheat> = Box::new(crate::world::SimAntiCheat::new());
        let plugin = HorsesPlugin::new(HorsesConfig::default(), Box::new(database), Some(anticheat));
        assert!(plugin.damage_listener.has_anticheat());
    }

    #[test]
    fn test_unmanaged_death_is_ignored() {
        let mut fx = Fixture::new(HorsesConfig::default());
        let steve = fx.steve;
        fx.plugin.on_entity_death(steve, &mut fx.world);
        assert!(fx.plugin.stables().is_empty());
    }

    #[test]
    fn test_quit_stables_horse_and_unloads() {
        let mut fx = Fixture::new(HorsesConfig::default());
        let horse = fx.spawned("Eeyore");
        fx.world.set_inventory_slot(horse, 0, Some(ItemStack::new("saddle")));

        fx.plugin.on_player_quit("Steve", &mut fx.world);

        assert!(fx.plugin.stable("Steve").is_none());
        assert_eq!(fx.world.mount_count(), 0);
        let stored = fx.database.stable("Steve").pop().unwrap();
        assert_eq!(stored.inventory[0], Some(ItemStack::new("saddle")));

        // Coming back loads the same horse
        let records = fx.database.stable("Steve");
        fx.plugin.load_stable("Steve", &records);
        assert!(fx.plugin.stable("Steve").unwrap().find("eeyore").is_some());
    }

    #[test]
    fn test_load_keeps_stable_in_memory() {
        let mut fx = Fixture::new(HorsesConfig::default());
        fx.spawned("Eeyore");

        fx.plugin.load_stable("Steve", &[]);
        assert_eq!(fx.plugin.stable("Steve").unwrap().len(), 1);
    }

    #[test]
    fn test_shutdown_puts_everything_away() {
        let mut fx = Fixture::new(HorsesConfig::default());
        let horse = fx.spawned("Eeyore");
        fx.world.set_health(horse, 7.0);

        fx.plugin.shutdown(&mut fx.world);

        assert_eq!(fx.world.mount_count(), 0);
        assert!(fx.plugin.ownership().is_empty());
        assert_eq!(fx.database.stable("Steve")[0].health, 7.0);
    }
}

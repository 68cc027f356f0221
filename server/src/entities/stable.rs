//! Per-owner horse collections.
//!
//! A [`Stable`] holds every horse of one player and remembers which of them is
//! out in the world. At most one is: spawning another dismisses the previous
//! one first.

use std::collections::HashMap;

use log::{info, warn};

use horses_shared::{EntityId, HorseType};

use crate::config::{HorsesConfig, HorsesPermissionConfig};
use crate::messages::strip_color;
use crate::persistence::{HorseDatabase, HorseRecord};
use crate::world::{EntityKind, WorldRuntime};

use super::{normalize_display_name, HorseContext, HorseKey, LiveBinding, OwnershipRegistry, PlayerHorse};

/// Why a horse could not be added or renamed
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StableError {
    #[error("stable is full ({max} horses)")]
    Full { max: usize },
    #[error("you already have a horse named '{0}'")]
    NameTaken(String),
    #[error("horse names can't be empty")]
    EmptyName,
    #[error("you can't own {} horses", .0.name())]
    TypeNotAllowed(HorseType),
    #[error("no horse named '{0}'")]
    UnknownHorse(String),
    #[error("that mount can't be claimed")]
    NotClaimable,
}

/// Plain name a raw name would end up with
fn plain_name(raw: &str) -> String {
    strip_color(&normalize_display_name(raw, true))
}

/// All horses of one owner
#[derive(Debug)]
pub struct Stable {
    owner: String,
    horses: Vec<PlayerHorse>,
    active: Option<HorseKey>,
    next_key: u64,
}

impl Stable {
    pub fn new(owner: &str) -> Self {
        Self {
            owner: owner.to_string(),
            horses: Vec::new(),
            active: None,
            next_key: 1,
        }
    }

    /// Rebuild a stable from stored records
    pub fn from_records(owner: &str, records: &[HorseRecord], config: &HorsesConfig) -> Self {
        let mut stable = Self::new(owner);
        for record in records {
            if record.owner != owner {
                warn!("Skipping horse {} of {} while loading {}", record.id, record.owner, owner);
                continue;
            }
            let key = stable.allocate_key();
            stable.horses.push(PlayerHorse::from_record(key, record, config));
        }
        stable
    }

    fn allocate_key(&mut self) -> HorseKey {
        let key = HorseKey(self.next_key);
        self.next_key += 1;
        key
    }

    fn index_of(&self, key: HorseKey) -> Option<usize> {
        self.horses.iter().position(|h| h.key() == key)
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn horses(&self) -> &[PlayerHorse] {
        &self.horses
    }

    pub fn len(&self) -> usize {
        self.horses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.horses.is_empty()
    }

    pub fn get(&self, key: HorseKey) -> Option<&PlayerHorse> {
        self.horses.iter().find(|h| h.key() == key)
    }

    pub fn get_mut(&mut self, key: HorseKey) -> Option<&mut PlayerHorse> {
        self.horses.iter_mut().find(|h| h.key() == key)
    }

    /// Look a horse up by name, ignoring case and colours
    pub fn find(&self, name: &str) -> Option<&PlayerHorse> {
        let wanted = plain_name(name);
        self.horses.iter().find(|h| {
            h.name().eq_ignore_ascii_case(&wanted) || h.name().eq_ignore_ascii_case(name)
        })
    }

    pub fn find_key(&self, name: &str) -> Option<HorseKey> {
        self.find(name).map(|h| h.key())
    }

    /// The horse currently out in the world
    pub fn active(&self) -> Option<&PlayerHorse> {
        self.active.and_then(|key| self.get(key))
    }

    pub fn active_key(&self) -> Option<HorseKey> {
        self.active
    }

    // =========================================================================
    // Adding horses
    // =========================================================================

    fn check_new_horse(
        &self,
        name: &str,
        horse_type: HorseType,
        perm: &HorsesPermissionConfig,
    ) -> Result<(), StableError> {
        if self.horses.len() >= perm.max_stable_size {
            return Err(StableError::Full { max: perm.max_stable_size });
        }
        if !perm.allows_type(horse_type) {
            return Err(StableError::TypeNotAllowed(horse_type));
        }
        let plain = plain_name(name);
        if plain.trim_matches('_').is_empty() {
            return Err(StableError::EmptyName);
        }
        if self.find(&plain).is_some() {
            return Err(StableError::NameTaken(plain));
        }
        Ok(())
    }

    /// Buy a new horse with the base stats of its type
    pub fn create_horse(
        &mut self,
        name: &str,
        horse_type: HorseType,
        ctx: &mut HorseContext<'_>,
    ) -> Result<HorseKey, StableError> {
        let owner = ctx.world.online_player(&self.owner);
        self.check_new_horse(name, horse_type, ctx.config.perm_config(&*ctx.world, owner))?;

        let key = self.allocate_key();
        let mut horse = PlayerHorse::fresh(key, &self.owner, name, horse_type, ctx.config);
        horse.save_changes(&*ctx.world, ctx.database);
        info!("{} bought {} '{}'", self.owner, horse_type.name(), horse.name());
        self.horses.push(horse);
        Ok(key)
    }

    /// Take an untracked mount out of the world and into the stable
    pub fn adopt_horse(
        &mut self,
        name: &str,
        entity: EntityId,
        ctx: &mut HorseContext<'_>,
    ) -> Result<HorseKey, StableError> {
        let Some(EntityKind::Mount(variant)) = ctx.world.entity_kind(entity) else {
            return Err(StableError::NotClaimable);
        };
        if !ctx.world.is_valid(entity) || ctx.ownership.resolve(entity).is_some() {
            return Err(StableError::NotClaimable);
        }
        let horse_type = HorseType::from_parts(variant, ctx.world.style(entity))
            .ok_or(StableError::NotClaimable)?;

        let owner = ctx.world.online_player(&self.owner);
        self.check_new_horse(name, horse_type, ctx.config.perm_config(&*ctx.world, owner))?;

        let key = self.allocate_key();
        let mut horse = PlayerHorse::adopt(key, &self.owner, name, horse_type, entity, &mut *ctx.world, ctx.config);
        horse.save_changes(&*ctx.world, ctx.database);
        self.horses.push(horse);
        Ok(key)
    }

    // =========================================================================
    // World presence
    // =========================================================================

    /// Summon a horse next to `player`, dismissing whichever horse was out before
    pub fn spawn_horse(&mut self, key: HorseKey, player: EntityId, ctx: &mut HorseContext<'_>) -> bool {
        let Some(index) = self.index_of(key) else {
            return false;
        };
        if ctx.world.player_name(player).as_deref() != Some(self.owner.as_str()) {
            return false;
        }

        if !self.horses[index].is_spawned(&*ctx.world) {
            if let Some(previous) = self.active.take() {
                if let Some(horse) = self.get_mut(previous) {
                    horse.remove_horse(ctx);
                }
            }
        }

        if !self.horses[index].spawn_horse(player, ctx) {
            return false;
        }
        self.active = Some(key);
        true
    }

    /// Put a horse back in the stable
    pub fn remove_horse(&mut self, key: HorseKey, ctx: &mut HorseContext<'_>) {
        if self.active == Some(key) {
            self.active = None;
        }
        if let Some(horse) = self.get_mut(key) {
            horse.remove_horse(ctx);
        }
    }

    /// Put the active horse back in the stable. Returns false if none was out.
    pub fn dismiss(&mut self, ctx: &mut HorseContext<'_>) -> bool {
        match self.active {
            Some(key) => {
                self.remove_horse(key, ctx);
                true
            }
            None => false,
        }
    }

    /// Delete a horse for good
    pub fn delete_horse(&mut self, key: HorseKey, ctx: &mut HorseContext<'_>) -> bool {
        let Some(index) = self.index_of(key) else {
            return false;
        };
        if self.active == Some(key) {
            self.active = None;
        }
        if !self.horses[index].delete_horse(ctx) {
            warn!("Storage refused to delete horse {} of {}", self.horses[index].id(), self.owner);
            return false;
        }
        let horse = self.horses.remove(index);
        info!("{} deleted '{}'", self.owner, horse.name());
        true
    }

    pub fn rename_horse(
        &mut self,
        key: HorseKey,
        new_name: &str,
        world: &mut dyn WorldRuntime,
        database: &dyn HorseDatabase,
    ) -> Result<(), StableError> {
        let plain = strip_color(&normalize_display_name(new_name, false));
        if plain.trim_matches('_').is_empty() {
            return Err(StableError::EmptyName);
        }
        if self
            .horses
            .iter()
            .any(|h| h.key() != key && h.name().eq_ignore_ascii_case(&plain))
        {
            return Err(StableError::NameTaken(plain));
        }
        let horse = self
            .get_mut(key)
            .ok_or_else(|| StableError::UnknownHorse(new_name.to_string()))?;
        horse.rename(new_name, world, database);
        Ok(())
    }

    /// Persist every horse, refreshing the one that is out
    pub fn save_all(&mut self, world: &dyn WorldRuntime, database: &dyn HorseDatabase) {
        for horse in &mut self.horses {
            horse.save_changes(world, database);
        }
    }
}

// =============================================================================
// Stables
// =============================================================================

/// Every loaded stable, by owner name
#[derive(Debug, Default)]
pub struct Stables {
    stables: HashMap<String, Stable>,
}

impl Stables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, owner: &str) -> Option<&Stable> {
        self.stables.get(owner)
    }

    pub fn get_mut(&mut self, owner: &str) -> Option<&mut Stable> {
        self.stables.get_mut(owner)
    }

    /// The owner's stable, created empty if it was never loaded
    pub fn entry(&mut self, owner: &str) -> &mut Stable {
        self.stables
            .entry(owner.to_string())
            .or_insert_with(|| Stable::new(owner))
    }

    pub fn insert(&mut self, stable: Stable) {
        self.stables.insert(stable.owner().to_string(), stable);
    }

    pub fn remove(&mut self, owner: &str) -> Option<Stable> {
        self.stables.remove(owner)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Stable> {
        self.stables.values_mut()
    }

    pub fn len(&self) -> usize {
        self.stables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stables.is_empty()
    }

    /// The managed horse a live entity is the body of
    pub fn resolve(&self, ownership: &OwnershipRegistry, entity: EntityId) -> Option<&PlayerHorse> {
        let mount = ownership.resolve(entity)?;
        let horse = self.stables.get(&mount.owner)?.get(mount.key)?;
        (horse.binding() == LiveBinding::Bound(entity)).then_some(horse)
    }
}

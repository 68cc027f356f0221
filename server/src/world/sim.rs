//! In-memory host world.
//!
//! A small authoritative world that keeps every entity in a map and answers
//! the [`WorldRuntime`] calls the plugin makes. The server binary runs on it
//! and the unit tests use it in place of a real game host.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use log::{debug, info};

use horses_shared::{EntityId, ItemStack, Location, MountStyle, MountVariant};

use super::{AntiCheat, DamageEvent, EntityKind, WorldRuntime};

/// Health every simulated player joins with
const PLAYER_MAX_HEALTH: f64 = 20.0;

/// Equipment slots every mount has
const MOUNT_EQUIPMENT_SLOTS: usize = 2;

/// Extra slots a chest adds to donkeys and mules
const CHEST_SLOTS: usize = 15;

#[derive(Debug)]
struct SimMount {
    variant: MountVariant,
    style: Option<MountStyle>,
    owner: Option<EntityId>,
    tamed: bool,
    adult: bool,
    speed: f64,
    jump_strength: f64,
    inventory: Vec<Option<ItemStack>>,
    carrying_chest: bool,
    target: Option<EntityId>,
}

#[derive(Debug)]
struct SimPlayer {
    name: String,
    permissions: HashSet<String>,
    messages: Vec<String>,
}

#[derive(Debug)]
struct SimEntity {
    kind: EntityKind,
    location: Location,
    health: f64,
    max_health: f64,
    dead: bool,
    passengers: Vec<EntityId>,
    vehicle: Option<EntityId>,
    custom_name: Option<(String, bool)>,
    mount: Option<SimMount>,
    player: Option<SimPlayer>,
}

impl SimEntity {
    fn new(kind: EntityKind, location: Location, health: f64) -> Self {
        Self {
            kind,
            location,
            health,
            max_health: health,
            dead: false,
            passengers: Vec::new(),
            vehicle: None,
            custom_name: None,
            mount: None,
            player: None,
        }
    }
}

/// The simulated world
#[derive(Debug, Default)]
pub struct SimWorld {
    entities: HashMap<EntityId, SimEntity>,
    next_entity_id: u64,
    /// Players standing in a safe zone. Damage events aimed at them are cancelled.
    safe_players: HashSet<EntityId>,
    /// Spawn protection refuses mount spawns unless asked to bypass it
    spawn_protected: bool,
    /// Set to make every mount spawn fail
    refuse_spawns: bool,
    dispatched: Vec<DamageEvent>,
}

impl SimWorld {
    pub fn new() -> Self {
        Self {
            next_entity_id: 1,
            ..Default::default()
        }
    }

    fn allocate_id(&mut self) -> EntityId {
        let id = EntityId(self.next_entity_id.max(1));
        self.next_entity_id = id.0 + 1;
        id
    }

    // =========================================================================
    // Host-side setup
    // =========================================================================

    /// Log a player into the world
    pub fn add_player(&mut self, name: &str, location: Location) -> EntityId {
        let id = self.allocate_id();
        let mut entity = SimEntity::new(EntityKind::Player, location, PLAYER_MAX_HEALTH);
        entity.player = Some(SimPlayer {
            name: name.to_string(),
            permissions: HashSet::new(),
            messages: Vec::new(),
        });
        self.entities.insert(id, entity);
        info!("Player {} joined as {}", name, id);
        id
    }

    /// Add an entity that is neither a player nor a mount
    pub fn add_entity(&mut self, kind: EntityKind, location: Location) -> EntityId {
        let id = self.allocate_id();
        self.entities.insert(id, SimEntity::new(kind, location, 10.0));
        id
    }

    /// Add an untamed mount that nobody manages
    pub fn add_wild_mount(
        &mut self,
        variant: MountVariant,
        style: Option<MountStyle>,
        location: Location,
    ) -> EntityId {
        let id = self.insert_mount(variant, location);
        if let Some(mount) = self.mount_mut(id) {
            mount.style = style;
        }
        id
    }

    fn insert_mount(&mut self, variant: MountVariant, location: Location) -> EntityId {
        let id = self.allocate_id();
        let mut entity = SimEntity::new(EntityKind::Mount(variant), location, 15.0);
        entity.mount = Some(SimMount {
            variant,
            style: None,
            owner: None,
            tamed: false,
            adult: false,
            speed: 0.2,
            jump_strength: 0.5,
            inventory: vec![None; MOUNT_EQUIPMENT_SLOTS],
            carrying_chest: false,
            target: None,
        });
        self.entities.insert(id, entity);
        id
    }

    /// Sit `rider` on `vehicle`
    pub fn ride(&mut self, rider: EntityId, vehicle: EntityId) {
        if !self.entities.contains_key(&rider) {
            return;
        }
        if let Some(entity) = self.entities.get_mut(&vehicle) {
            entity.passengers.push(rider);
        } else {
            return;
        }
        if let Some(entity) = self.entities.get_mut(&rider) {
            entity.vehicle = Some(vehicle);
        }
    }

    pub fn grant_permission(&mut self, player: EntityId, node: &str) {
        if let Some(p) = self.entities.get_mut(&player).and_then(|e| e.player.as_mut()) {
            p.permissions.insert(node.to_string());
        }
    }

    /// Put a player in a safe zone where nothing can hurt them
    pub fn protect_player(&mut self, player: EntityId) {
        self.safe_players.insert(player);
    }

    pub fn set_spawn_protected(&mut self, protected: bool) {
        self.spawn_protected = protected;
    }

    pub fn set_refuse_spawns(&mut self, refuse: bool) {
        self.refuse_spawns = refuse;
    }

    /// Kill an entity in place. The body stays until removed.
    pub fn kill(&mut self, entity: EntityId) {
        if let Some(e) = self.entities.get_mut(&entity) {
            e.health = 0.0;
            e.dead = true;
            info!("Entity {} died", entity);
        }
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    pub fn contains(&self, entity: EntityId) -> bool {
        self.entities.contains_key(&entity)
    }

    /// Number of mounts currently in the world
    pub fn mount_count(&self) -> usize {
        self.entities.values().filter(|e| e.mount.is_some()).count()
    }

    pub fn messages(&self, player: EntityId) -> &[String] {
        self.entities
            .get(&player)
            .and_then(|e| e.player.as_ref())
            .map(|p| p.messages.as_slice())
            .unwrap_or(&[])
    }

    pub fn custom_name(&self, entity: EntityId) -> Option<(&str, bool)> {
        self.entities
            .get(&entity)
            .and_then(|e| e.custom_name.as_ref())
            .map(|(name, visible)| (name.as_str(), *visible))
    }

    /// Owner, tamed and adult flags of a mount
    pub fn taming(&self, mount: EntityId) -> Option<(Option<EntityId>, bool, bool)> {
        self.mount_ref(mount).map(|m| (m.owner, m.tamed, m.adult))
    }

    pub fn target_of(&self, mount: EntityId) -> Option<EntityId> {
        self.mount_ref(mount).and_then(|m| m.target)
    }

    /// Every damage event routed through the host listeners, in order
    pub fn dispatched_events(&self) -> &[DamageEvent] {
        &self.dispatched
    }

    fn mount_ref(&self, mount: EntityId) -> Option<&SimMount> {
        self.entities.get(&mount).and_then(|e| e.mount.as_ref())
    }

    fn mount_mut(&mut self, mount: EntityId) -> Option<&mut SimMount> {
        self.entities.get_mut(&mount).and_then(|e| e.mount.as_mut())
    }
}

impl WorldRuntime for SimWorld {
    fn entity_kind(&self, entity: EntityId) -> Option<EntityKind> {
        self.entities.get(&entity).map(|e| e.kind)
    }

    fn is_valid(&self, entity: EntityId) -> bool {
        self.entities.get(&entity).map(|e| !e.dead).unwrap_or(false)
    }

    fn is_dead(&self, entity: EntityId) -> bool {
        self.entities.get(&entity).map(|e| e.dead).unwrap_or(false)
    }

    fn location(&self, entity: EntityId) -> Option<Location> {
        self.entities.get(&entity).map(|e| e.location.clone())
    }

    fn remove(&mut self, entity: EntityId) {
        let Some(removed) = self.entities.remove(&entity) else {
            return;
        };
        for passenger in removed.passengers {
            if let Some(p) = self.entities.get_mut(&passenger) {
                p.vehicle = None;
            }
        }
        if let Some(vehicle) = removed.vehicle.and_then(|v| self.entities.get_mut(&v)) {
            vehicle.passengers.retain(|p| *p != entity);
        }
        self.safe_players.remove(&entity);
        debug!("Entity {} removed from world", entity);
    }

    fn teleport(&mut self, entity: EntityId, to: &Location) {
        if let Some(e) = self.entities.get_mut(&entity) {
            e.location = to.clone();
        }
    }

    fn health(&self, entity: EntityId) -> f64 {
        self.entities.get(&entity).map(|e| e.health).unwrap_or(0.0)
    }

    fn set_health(&mut self, entity: EntityId, health: f64) {
        if let Some(e) = self.entities.get_mut(&entity) {
            e.health = health.min(e.max_health);
        }
    }

    fn max_health(&self, entity: EntityId) -> f64 {
        self.entities.get(&entity).map(|e| e.max_health).unwrap_or(0.0)
    }

    fn set_max_health(&mut self, entity: EntityId, max_health: f64) {
        if let Some(e) = self.entities.get_mut(&entity) {
            e.max_health = max_health;
            e.health = e.health.min(max_health);
        }
    }

    fn damage(&mut self, entity: EntityId, amount: f64) {
        if let Some(e) = self.entities.get_mut(&entity) {
            e.health = (e.health - amount).max(0.0);
            if e.health <= 0.0 {
                e.dead = true;
            }
        }
    }

    fn passengers(&self, entity: EntityId) -> Vec<EntityId> {
        self.entities
            .get(&entity)
            .map(|e| e.passengers.clone())
            .unwrap_or_default()
    }

    fn vehicle(&self, entity: EntityId) -> Option<EntityId> {
        self.entities.get(&entity).and_then(|e| e.vehicle)
    }

    fn set_custom_name(&mut self, entity: EntityId, name: &str, visible: bool) {
        if let Some(e) = self.entities.get_mut(&entity) {
            e.custom_name = Some((name.to_string(), visible));
        }
    }

    fn spawn_mount(
        &mut self,
        variant: MountVariant,
        at: &Location,
        bypass_protection: bool,
    ) -> Option<EntityId> {
        if self.refuse_spawns || (self.spawn_protected && !bypass_protection) {
            debug!("Refused to spawn {:?} at {:?}", variant, at);
            return None;
        }
        Some(self.insert_mount(variant, at.clone()))
    }

    fn style(&self, mount: EntityId) -> Option<MountStyle> {
        self.mount_ref(mount).and_then(|m| m.style)
    }

    fn set_style(&mut self, mount: EntityId, style: MountStyle) {
        if let Some(m) = self.mount_mut(mount) {
            m.style = Some(style);
        }
    }

    fn tame(&mut self, mount: EntityId, owner: EntityId) {
        if let Some(m) = self.mount_mut(mount) {
            m.owner = Some(owner);
            m.tamed = true;
            m.adult = true;
        }
    }

    fn speed(&self, mount: EntityId) -> f64 {
        self.mount_ref(mount).map(|m| m.speed).unwrap_or(0.0)
    }

    fn set_speed(&mut self, mount: EntityId, speed: f64) {
        if let Some(m) = self.mount_mut(mount) {
            m.speed = speed;
        }
    }

    fn jump_strength(&self, mount: EntityId) -> f64 {
        self.mount_ref(mount).map(|m| m.jump_strength).unwrap_or(0.0)
    }

    fn set_jump_strength(&mut self, mount: EntityId, jump_strength: f64) {
        if let Some(m) = self.mount_mut(mount) {
            m.jump_strength = jump_strength;
        }
    }

    fn inventory(&self, mount: EntityId) -> Vec<Option<ItemStack>> {
        self.mount_ref(mount)
            .map(|m| m.inventory.clone())
            .unwrap_or_default()
    }

    fn set_inventory(&mut self, mount: EntityId, contents: Vec<Option<ItemStack>>) {
        if let Some(m) = self.mount_mut(mount) {
            let size = m.inventory.len();
            m.inventory = contents
                .into_iter()
                .map(|slot| slot.and_then(ItemStack::into_slot))
                .chain(std::iter::repeat(None))
                .take(size)
                .collect();
        }
    }

    fn set_inventory_slot(&mut self, mount: EntityId, slot: usize, item: Option<ItemStack>) {
        if let Some(m) = self.mount_mut(mount) {
            if let Some(existing) = m.inventory.get_mut(slot) {
                *existing = item.and_then(ItemStack::into_slot);
            }
        }
    }

    fn is_carrying_chest(&self, mount: EntityId) -> bool {
        self.mount_ref(mount).map(|m| m.carrying_chest).unwrap_or(false)
    }

    fn set_carrying_chest(&mut self, mount: EntityId, carrying: bool) {
        let Some(m) = self.mount_mut(mount) else {
            return;
        };
        if !matches!(m.variant, MountVariant::Donkey | MountVariant::Mule) {
            return;
        }
        m.carrying_chest = carrying;
        let size = if carrying {
            MOUNT_EQUIPMENT_SLOTS + CHEST_SLOTS
        } else {
            MOUNT_EQUIPMENT_SLOTS
        };
        m.inventory.resize(size, None);
    }

    fn set_target(&mut self, mount: EntityId, target: EntityId) {
        if let Some(m) = self.mount_mut(mount) {
            m.target = Some(target);
        }
    }

    fn player_name(&self, player: EntityId) -> Option<String> {
        self.entities
            .get(&player)
            .and_then(|e| e.player.as_ref())
            .map(|p| p.name.clone())
    }

    fn online_player(&self, name: &str) -> Option<EntityId> {
        self.entities
            .iter()
            .find(|(_, e)| e.player.as_ref().map(|p| p.name == name).unwrap_or(false))
            .map(|(id, _)| *id)
    }

    fn has_permission(&self, player: EntityId, node: &str) -> bool {
        self.entities
            .get(&player)
            .and_then(|e| e.player.as_ref())
            .map(|p| p.permissions.contains(node))
            .unwrap_or(false)
    }

    fn send_message(&mut self, player: EntityId, message: &str) {
        if let Some(p) = self.entities.get_mut(&player).and_then(|e| e.player.as_mut()) {
            info!("[to {}] {}", p.name, message);
            p.messages.push(message.to_string());
        }
    }

    fn call_damage_event(&mut self, event: &mut DamageEvent) {
        if self.safe_players.contains(&event.target) {
            event.set_cancelled(true);
        }
        self.dispatched.push(event.clone());
    }
}

// =============================================================================
// Anti-cheat
// =============================================================================

#[derive(Debug, Default)]
struct AntiCheatState {
    exempt: HashSet<EntityId>,
    /// (player, granted) in call order
    history: Vec<(EntityId, bool)>,
}

/// Anti-cheat stand-in. Clones share state, so a host can hand one clone to the
/// plugin and keep another to inspect.
#[derive(Debug, Clone, Default)]
pub struct SimAntiCheat {
    state: Rc<RefCell<AntiCheatState>>,
}

impl SimAntiCheat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exempt a player outside of the plugin, e.g. for an admin
    pub fn preexempt(&self, player: EntityId) {
        self.state.borrow_mut().exempt.insert(player);
    }

    pub fn exempted(&self) -> HashSet<EntityId> {
        self.state.borrow().exempt.clone()
    }

    pub fn history(&self) -> Vec<(EntityId, bool)> {
        self.state.borrow().history.clone()
    }
}

impl AntiCheat for SimAntiCheat {
    fn is_exempt(&self, player: EntityId) -> bool {
        self.state.borrow().exempt.contains(&player)
    }

    fn exempt(&mut self, player: EntityId) {
        let mut state = self.state.borrow_mut();
        state.exempt.insert(player);
        state.history.push((player, true));
    }

    fn unexempt(&mut self, player: EntityId) {
        let mut state = self.state.borrow_mut();
        state.exempt.remove(&player);
        state.history.push((player, false));
    }
}

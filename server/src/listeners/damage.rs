//! Protection rules for owned horses.
//!
//! Every damage event aimed at a managed mount goes through
//! [`DamageListener::on_entity_damage`], which decides from the owner's
//! permission config whether the hit goes through, is cancelled, or is moved
//! onto the riding owner.

use log::debug;

use horses_shared::EntityId;

use crate::config::HorsesConfig;
use crate::entities::{OwnershipRegistry, Stables};
use crate::messages::Message;
use crate::world::{AntiCheat, DamageEvent, EntityKind, WorldRuntime};

/// Exempts a player from anti-cheat checks until dropped.
///
/// Players that were already exempt are left alone, so the exemption is only
/// revoked if this guard granted it.
struct ExemptionGuard<'a> {
    anticheat: Option<&'a mut Box<dyn AntiCheat>>,
    granted: Option<EntityId>,
}

impl<'a> ExemptionGuard<'a> {
    fn acquire(anticheat: Option<&'a mut Box<dyn AntiCheat>>, player: Option<EntityId>) -> Self {
        let mut guard = Self { anticheat, granted: None };
        if let (Some(anticheat), Some(player)) = (guard.anticheat.as_mut(), player) {
            if !anticheat.is_exempt(player) {
                anticheat.exempt(player);
                guard.granted = Some(player);
            }
        }
        guard
    }
}

impl Drop for ExemptionGuard<'_> {
    fn drop(&mut self) {
        if let (Some(anticheat), Some(player)) = (self.anticheat.as_mut(), self.granted) {
            anticheat.unexempt(player);
        }
    }
}

/// The player to blame for a hit dealt by `damager`.
///
/// Arrows resolve to whoever shot them and lit TNT to whoever lit it. Anything
/// else that is not a player counts as a mob.
pub fn responsible_player(world: &dyn WorldRuntime, damager: EntityId) -> Option<EntityId> {
    let as_player = |entity: Option<EntityId>| {
        entity.filter(|e| world.entity_kind(*e) == Some(EntityKind::Player))
    };

    match world.entity_kind(damager)? {
        EntityKind::Player => Some(damager),
        EntityKind::Projectile { shooter } => as_player(shooter),
        EntityKind::PrimedTnt { source } => as_player(source),
        _ => None,
    }
}

/// Decides what happens to hits on managed horses
pub struct DamageListener {
    anticheat: Option<Box<dyn AntiCheat>>,
}

impl DamageListener {
    pub fn new(anticheat: Option<Box<dyn AntiCheat>>) -> Self {
        Self { anticheat }
    }

    pub fn has_anticheat(&self) -> bool {
        self.anticheat.is_some()
    }

    /// Apply the owner's protection rules to a hit. Events already cancelled
    /// and hits on entities this plugin does not manage are left untouched.
    pub fn on_entity_damage(
        &mut self,
        event: &mut DamageEvent,
        world: &mut dyn WorldRuntime,
        config: &HorsesConfig,
        stables: &Stables,
        ownership: &OwnershipRegistry,
    ) {
        if event.is_cancelled() {
            return;
        }
        let mount = event.target;
        if !matches!(world.entity_kind(mount), Some(EntityKind::Mount(_))) {
            return;
        }
        let Some(horse) = stables.resolve(ownership, mount) else {
            return;
        };

        let owner_name = horse.owner();
        let owner = world.online_player(owner_name);
        let perm = config.perm_config(&*world, owner);

        if perm.invincible_horses || perm.protected_damage_causes.contains(&event.cause) {
            debug!("'{}' of {} is protected from {:?}", horse.name(), owner_name, event.cause);
            event.set_cancelled(true);
            return;
        }

        if let Some(damager) = event.damager() {
            match responsible_player(&*world, damager) {
                Some(player) => {
                    let is_owner = world.player_name(player).as_deref() == Some(owner_name);
                    if perm.protect_from_owner && is_owner {
                        event.set_cancelled(true);
                    } else if perm.protect_from_players {
                        world.send_message(player, &Message::CantHurtOthersHorses.text());
                        event.set_cancelled(true);
                    }
                }
                None => {
                    if perm.protect_from_mobs {
                        event.set_cancelled(true);
                    }
                }
            }
            if event.is_cancelled() {
                debug!("Blocked {} hitting '{}' of {}", damager, horse.name(), owner_name);
                return;
            }
        }

        if !(perm.only_hurt_horse_if_owner_can_be_hurt || perm.transfer_damage_to_rider) {
            return;
        }
        let Some(owner) = owner else {
            return;
        };

        let proxy_damage = if perm.transfer_damage_to_rider {
            let mount_max = world.max_health(mount);
            if mount_max > 0.0 {
                event.damage / mount_max * world.max_health(owner)
            } else {
                0.0
            }
        } else {
            0.0
        };

        // Would the same hit be allowed on the owner?
        let mut probe = event.redirected(owner, proxy_damage);
        let exempt = event
            .damager()
            .filter(|d| world.entity_kind(*d) == Some(EntityKind::Player));
        {
            let _guard = ExemptionGuard::acquire(self.anticheat.as_mut(), exempt);
            world.call_damage_event(&mut probe);
        }

        let riding = world.passengers(mount).contains(&owner);
        if !probe.is_cancelled() && perm.transfer_damage_to_rider && riding {
            debug!("Moved {:.2} damage from '{}' onto {}", probe.damage, horse.name(), owner_name);
            event.set_cancelled(true);
            world.damage(owner, probe.damage);
        } else {
            event.set_cancelled(probe.is_cancelled());
        }
    }
}

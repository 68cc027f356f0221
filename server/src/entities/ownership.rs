//! Live entity to managed horse lookup.
//!
//! Every mount the plugin spawns is recorded here until it is despawned. This
//! is the only way a notification about a world entity is traced back to a
//! stabled horse.

use std::collections::HashMap;

use horses_shared::EntityId;

use super::HorseKey;

/// Address of a horse inside the stables
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MountRef {
    pub owner: String,
    pub key: HorseKey,
}

#[derive(Debug, Default)]
pub struct OwnershipRegistry {
    bound: HashMap<EntityId, MountRef>,
}

impl OwnershipRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `entity` is the body of a managed horse
    pub fn bind(&mut self, entity: EntityId, mount: MountRef) {
        self.bound.insert(entity, mount);
    }

    pub fn unbind(&mut self, entity: EntityId) -> Option<MountRef> {
        self.bound.remove(&entity)
    }

    /// The managed horse an entity belongs to. `None` for untracked entities.
    pub fn resolve(&self, entity: EntityId) -> Option<&MountRef> {
        self.bound.get(&entity)
    }

    pub fn len(&self) -> usize {
        self.bound.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_resolve_unbind() {
        let mut registry = OwnershipRegistry::new();
        let mount = MountRef { owner: "Steve".into(), key: HorseKey(3) };

        registry.bind(EntityId(9), mount.clone());
        assert_eq!(registry.resolve(EntityId(9)), Some(&mount));
        assert_eq!(registry.resolve(EntityId(10)), None);

        assert_eq!(registry.unbind(EntityId(9)), Some(mount));
        assert!(registry.is_empty());
    }
}

//! Plugin configuration.
//!
//! Loaded from a TOML file. Every field has a default, so a partial file (or
//! no file at all) is a valid configuration.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use horses_shared::{DamageCause, EntityId, HorseType};

use crate::world::WorldRuntime;

/// Permission nodes selecting a permission group are this prefix plus the group name
pub const PERMISSION_NODE_PREFIX: &str = "horses.config.";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

// =============================================================================
// Horse Types
// =============================================================================

/// Base stats handed to freshly created horses of a type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HorseTypeConfig {
    /// Health a new horse starts with. Also the fallback for stored horses with none.
    pub horse_hp: f64,
    pub horse_max_hp: f64,
    pub speed: f64,
    pub jump_strength: f64,
}

impl Default for HorseTypeConfig {
    fn default() -> Self {
        Self {
            horse_hp: 20.0,
            horse_max_hp: 30.0,
            speed: 0.225,
            jump_strength: 0.7,
        }
    }
}

// =============================================================================
// Permission Configs
// =============================================================================

/// Rules that apply to the horses of one player, picked by their permissions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HorsesPermissionConfig {
    /// Nothing can hurt the horse
    pub invincible_horses: bool,
    /// Damage causes that never hurt the horse
    pub protected_damage_causes: HashSet<DamageCause>,
    pub protect_from_owner: bool,
    pub protect_from_players: bool,
    pub protect_from_mobs: bool,
    /// Horse only takes damage its owner could take right now
    pub only_hurt_horse_if_owner_can_be_hurt: bool,
    /// Riding owner absorbs hits instead of the horse, scaled by max health
    pub transfer_damage_to_rider: bool,
    /// Dead horses keep saddle, armour and chest contents
    pub keep_equipment_on_death: bool,
    pub bypass_spawn_protection: bool,
    pub max_stable_size: usize,
    /// Seconds after a death before the horse can be summoned again
    pub death_cooldown_secs: u64,
    /// Types this player may buy. Empty allows all.
    pub allowed_types: Vec<HorseType>,
}

impl Default for HorsesPermissionConfig {
    fn default() -> Self {
        Self {
            invincible_horses: false,
            protected_damage_causes: HashSet::new(),
            protect_from_owner: false,
            protect_from_players: true,
            protect_from_mobs: false,
            only_hurt_horse_if_owner_can_be_hurt: true,
            transfer_damage_to_rider: false,
            keep_equipment_on_death: false,
            bypass_spawn_protection: true,
            max_stable_size: 10,
            death_cooldown_secs: 0,
            allowed_types: Vec::new(),
        }
    }
}

impl HorsesPermissionConfig {
    pub fn allows_type(&self, horse_type: HorseType) -> bool {
        self.allowed_types.is_empty() || self.allowed_types.contains(&horse_type)
    }
}

/// A permission config granted through `horses.config.<name>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionGroup {
    pub name: String,
    #[serde(flatten)]
    pub config: HorsesPermissionConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionsConfig {
    pub default: HorsesPermissionConfig,
    /// Checked in order, first match wins
    pub groups: Vec<PermissionGroup>,
}

// =============================================================================
// Root Config
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HorsesConfig {
    /// Stored horses with a jump strength of zero or less jump at 0.7 instead
    pub fix_zero_jump_strength: bool,
    pub default_type: HorseTypeConfig,
    /// Per-type overrides keyed by type name ("DarkBrown", "dark_brown", ...)
    pub types: HashMap<String, HorseTypeConfig>,
    pub permissions: PermissionsConfig,
}

impl Default for HorsesConfig {
    fn default() -> Self {
        Self {
            fix_zero_jump_strength: true,
            default_type: HorseTypeConfig::default(),
            types: HashMap::new(),
            permissions: PermissionsConfig::default(),
        }
    }
}

impl HorsesConfig {
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        let config: HorsesConfig = toml::from_str(source)?;
        for key in config.types.keys() {
            if HorseType::from_name(key).is_none() {
                warn!("Ignoring config for unknown horse type '{}'", key);
            }
        }
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml(&source)?;
        info!(
            "Loaded config from {:?} ({} permission groups)",
            path.as_ref(),
            config.permissions.groups.len()
        );
        Ok(config)
    }

    /// Load a config file, falling back to defaults if it is missing or broken
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path.as_ref()) {
            Ok(config) => config,
            Err(e) => {
                warn!("Using default config, {:?} unusable: {}", path.as_ref(), e);
                Self::default()
            }
        }
    }

    /// Base stats for a horse type
    pub fn type_config(&self, horse_type: HorseType) -> &HorseTypeConfig {
        self.types
            .iter()
            .find(|(key, _)| HorseType::from_name(key) == Some(horse_type))
            .map(|(_, config)| config)
            .unwrap_or(&self.default_type)
    }

    /// Rules for a player's horses. Offline owners get the default rules.
    pub fn perm_config(
        &self,
        world: &dyn WorldRuntime,
        player: Option<EntityId>,
    ) -> &HorsesPermissionConfig {
        let Some(player) = player else {
            return &self.permissions.default;
        };

        self.permissions
            .groups
            .iter()
            .find(|group| {
                world.has_permission(player, &format!("{}{}", PERMISSION_NODE_PREFIX, group.name))
            })
            .map(|group| &group.config)
            .unwrap_or(&self.permissions.default)
    }
}

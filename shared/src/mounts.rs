//! Mount types shared between the plugin layers.

use serde::{Deserialize, Serialize};

// =============================================================================
// Host Entity Variants
// =============================================================================

/// The host entity variant a mount spawns as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MountVariant {
    Horse,
    Donkey,
    Mule,
    ZombieHorse,
    SkeletonHorse,
    Llama,
}

/// Coat colour of a regular horse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HorseColor {
    White,
    Creamy,
    Chestnut,
    Brown,
    Black,
    Gray,
    DarkBrown,
}

/// Coat colour of a llama
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LlamaColor {
    Creamy,
    White,
    Brown,
    Gray,
}

/// Variant-specific appearance applied when a mount is spawned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MountStyle {
    Horse(HorseColor),
    Llama(LlamaColor),
}

// =============================================================================
// Horse Types
// =============================================================================

/// The kind of mount a player owns. Fixed when the horse is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum HorseType {
    White = 0,
    Creamy = 1,
    Chestnut = 2,
    Brown = 3,
    Black = 4,
    Gray = 5,
    DarkBrown = 6,
    Donkey = 7,
    Mule = 8,
    Undead = 9,
    Skeleton = 10,
    LlamaCreamy = 11,
    LlamaWhite = 12,
    LlamaBrown = 13,
    LlamaGray = 14,
}

impl HorseType {
    pub const ALL: [HorseType; 15] = [
        Self::White,
        Self::Creamy,
        Self::Chestnut,
        Self::Brown,
        Self::Black,
        Self::Gray,
        Self::DarkBrown,
        Self::Donkey,
        Self::Mule,
        Self::Undead,
        Self::Skeleton,
        Self::LlamaCreamy,
        Self::LlamaWhite,
        Self::LlamaBrown,
        Self::LlamaGray,
    ];

    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::White => "White",
            Self::Creamy => "Creamy",
            Self::Chestnut => "Chestnut",
            Self::Brown => "Brown",
            Self::Black => "Black",
            Self::Gray => "Gray",
            Self::DarkBrown => "Dark Brown",
            Self::Donkey => "Donkey",
            Self::Mule => "Mule",
            Self::Undead => "Undead",
            Self::Skeleton => "Skeleton",
            Self::LlamaCreamy => "Creamy Llama",
            Self::LlamaWhite => "White Llama",
            Self::LlamaBrown => "Brown Llama",
            Self::LlamaGray => "Gray Llama",
        }
    }

    /// Parse a type typed by a player. Case, spaces and underscores are ignored,
    /// so "dark_brown", "DarkBrown" and "Dark Brown" all match.
    pub fn from_name(name: &str) -> Option<Self> {
        let wanted = squash(name);
        Self::ALL.iter().copied().find(|t| {
            squash(t.name()) == wanted || squash(&format!("{:?}", t)) == wanted
        })
    }

    /// Entity variant the host spawns for this type
    pub fn variant(&self) -> MountVariant {
        match self {
            Self::Donkey => MountVariant::Donkey,
            Self::Mule => MountVariant::Mule,
            Self::Undead => MountVariant::ZombieHorse,
            Self::Skeleton => MountVariant::SkeletonHorse,
            Self::LlamaCreamy | Self::LlamaWhite | Self::LlamaBrown | Self::LlamaGray => {
                MountVariant::Llama
            }
            _ => MountVariant::Horse,
        }
    }

    /// Appearance to apply on spawn, if the variant has one
    pub fn style(&self) -> Option<MountStyle> {
        let style = match self {
            Self::White => MountStyle::Horse(HorseColor::White),
            Self::Creamy => MountStyle::Horse(HorseColor::Creamy),
            Self::Chestnut => MountStyle::Horse(HorseColor::Chestnut),
            Self::Brown => MountStyle::Horse(HorseColor::Brown),
            Self::Black => MountStyle::Horse(HorseColor::Black),
            Self::Gray => MountStyle::Horse(HorseColor::Gray),
            Self::DarkBrown => MountStyle::Horse(HorseColor::DarkBrown),
            Self::LlamaCreamy => MountStyle::Llama(LlamaColor::Creamy),
            Self::LlamaWhite => MountStyle::Llama(LlamaColor::White),
            Self::LlamaBrown => MountStyle::Llama(LlamaColor::Brown),
            Self::LlamaGray => MountStyle::Llama(LlamaColor::Gray),
            Self::Donkey | Self::Mule | Self::Undead | Self::Skeleton => return None,
        };
        Some(style)
    }

    /// Recover the type of a mount already living in the world
    pub fn from_parts(variant: MountVariant, style: Option<MountStyle>) -> Option<Self> {
        let horse_type = match (variant, style) {
            (MountVariant::Donkey, _) => Self::Donkey,
            (MountVariant::Mule, _) => Self::Mule,
            (MountVariant::ZombieHorse, _) => Self::Undead,
            (MountVariant::SkeletonHorse, _) => Self::Skeleton,
            (MountVariant::Horse, Some(MountStyle::Horse(color))) => match color {
                HorseColor::White => Self::White,
                HorseColor::Creamy => Self::Creamy,
                HorseColor::Chestnut => Self::Chestnut,
                HorseColor::Brown => Self::Brown,
                HorseColor::Black => Self::Black,
                HorseColor::Gray => Self::Gray,
                HorseColor::DarkBrown => Self::DarkBrown,
            },
            (MountVariant::Llama, Some(MountStyle::Llama(color))) => match color {
                LlamaColor::Creamy => Self::LlamaCreamy,
                LlamaColor::White => Self::LlamaWhite,
                LlamaColor::Brown => Self::LlamaBrown,
                LlamaColor::Gray => Self::LlamaGray,
            },
            _ => return None,
        };
        Some(horse_type)
    }

    /// Donkeys and mules can carry a chest
    pub fn is_chest_capable(&self) -> bool {
        matches!(self, Self::Donkey | Self::Mule)
    }

    /// Whether saddle and armour live in dedicated equipment slots
    pub fn has_equipment_slots(&self) -> bool {
        self.variant() == MountVariant::Horse
    }
}

fn squash(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_is_lenient() {
        assert_eq!(HorseType::from_name("dark_brown"), Some(HorseType::DarkBrown));
        assert_eq!(HorseType::from_name("Dark Brown"), Some(HorseType::DarkBrown));
        assert_eq!(HorseType::from_name("LLAMAGRAY"), Some(HorseType::LlamaGray));
        assert_eq!(HorseType::from_name("gray llama"), Some(HorseType::LlamaGray));
        assert_eq!(HorseType::from_name("unicorn"), None);
    }

    #[test]
    fn test_u8_round_trip_covers_every_type() {
        for t in HorseType::ALL {
            assert_eq!(HorseType::from_u8(t.as_u8()), Some(t));
        }
        assert_eq!(HorseType::from_u8(200), None);
    }

    #[test]
    fn test_only_donkeys_and_mules_carry_chests() {
        let chested: Vec<_> = HorseType::ALL.iter().filter(|t| t.is_chest_capable()).collect();
        assert_eq!(chested, vec![&HorseType::Donkey, &HorseType::Mule]);
        assert_eq!(HorseType::Mule.variant(), MountVariant::Mule);
        assert!(HorseType::Mule.style().is_none());
    }

    #[test]
    fn test_from_parts_inverts_variant_and_style() {
        for t in HorseType::ALL {
            assert_eq!(HorseType::from_parts(t.variant(), t.style()), Some(t));
        }
        assert_eq!(HorseType::from_parts(MountVariant::Horse, None), None);
    }
}

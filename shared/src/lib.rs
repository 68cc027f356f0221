pub mod mounts;
pub mod entities;
pub mod items;
pub mod damage;

pub use mounts::*;
pub use entities::*;
pub use items::*;
pub use damage::*;

/// Id carried by a horse that has never been persisted
pub const UNASSIGNED_HORSE_ID: i32 = -1;

/// Jump strength applied to horses stored with none
pub const FIXED_JUMP_STRENGTH: f64 = 0.7;

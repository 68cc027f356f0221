//! Handlers for notifications the host world delivers.

pub mod damage;

pub use damage::DamageListener;

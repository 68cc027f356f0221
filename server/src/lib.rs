//! Player-owned horses for a multiplayer game server.
//!
//! Players keep a stable of horses whose stats and inventory persist while
//! the horse is away, and whose bodies in the world are protected according
//! to per-player rules.

pub mod commands;
pub mod config;
pub mod entities;
pub mod listeners;
pub mod messages;
pub mod persistence;
pub mod plugin;
pub mod world;

pub use config::HorsesConfig;
pub use plugin::HorsesPlugin;

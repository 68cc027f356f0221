//! Chat command system for `/horse` commands.

use horses_shared::{EntityId, HorseType, ItemStack, ARMOR_SLOT, SADDLE_SLOT};

use crate::entities::{LiveBinding, StableError};
use crate::messages::Message;
use crate::plugin::{now_millis, HorsesPlugin};
use crate::world::WorldRuntime;

/// Result of executing a command
#[derive(Debug, Clone, PartialEq)]
pub struct CommandResult {
    /// Whether the command was successful
    pub success: bool,
    /// Message to display to the user
    pub message: String,
}

impl CommandResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

impl From<StableError> for CommandResult {
    fn from(e: StableError) -> Self {
        Self::error(e.to_string())
    }
}

/// Parse and execute a chat command
/// Returns None if it's not a horse command
pub fn parse_and_execute(
    content: &str,
    player: EntityId,
    plugin: &mut HorsesPlugin,
    world: &mut dyn WorldRuntime,
) -> Option<CommandResult> {
    let rest = content.strip_prefix('/')?;
    let parts: Vec<&str> = rest.split_whitespace().collect();
    let (command, parts) = parts.split_first()?;
    if !matches!(command.to_lowercase().as_str(), "horse" | "horses" | "h") {
        return None;
    }

    let Some(owner) = world.player_name(player) else {
        return Some(CommandResult::error("Only players can own horses"));
    };
    let Some((sub, args)) = parts.split_first() else {
        return Some(cmd_help());
    };

    Some(match sub.to_lowercase().as_str() {
        "help" => cmd_help(),
        "list" => cmd_list(&owner, player, plugin, world),
        "summon" | "s" => cmd_summon(&owner, player, args, plugin, world),
        "dismiss" | "d" => cmd_dismiss(&owner, plugin, world),
        "buy" => cmd_buy(&owner, args, plugin, world),
        "rename" => cmd_rename(&owner, args, plugin, world),
        "delete" => cmd_delete(&owner, args, plugin, world),
        "info" => cmd_info(&owner, args, plugin, world),
        "heal" => cmd_heal(&owner, args, plugin, world),
        "claim" => cmd_claim(&owner, player, args, plugin, world),
        _ => CommandResult::error(format!("Unknown command: /horse {}. Type /horse help for commands.", sub)),
    })
}

fn cmd_help() -> CommandResult {
    let mut help = String::from("Horse commands:\n");
    help.push_str("  /horse list - List your horses\n");
    help.push_str("  /horse summon <name> - Bring a horse to you\n");
    help.push_str("  /horse dismiss - Send your horse back to the stable\n");
    help.push_str("  /horse buy <name> <type> - Buy a new horse\n");
    help.push_str("  /horse rename <name> <new name> - Rename a horse\n");
    help.push_str("  /horse delete <name> - Release a horse for good\n");
    help.push_str("  /horse info <name> - Show a horse's stats\n");
    help.push_str("  /horse heal <name> <amount> - Heal a horse\n");
    help.push_str("  /horse claim <name> - Claim the mount you are riding\n");

    let types: Vec<&str> = HorseType::ALL.iter().map(|t| t.name()).collect();
    help.push_str(&format!("Types: {}", types.join(", ")));

    CommandResult::success(help)
}

fn cmd_list(owner: &str, player: EntityId, plugin: &mut HorsesPlugin, world: &mut dyn WorldRuntime) -> CommandResult {
    let max = plugin.config().perm_config(&*world, Some(player)).max_stable_size;
    let Some(stable) = plugin.stable(owner).filter(|s| !s.is_empty()) else {
        return CommandResult::success("You don't own any horses. Buy one with /horse buy <name> <type>");
    };

    let mut msg = format!("Your horses ({}/{}):\n", stable.len(), max);
    for horse in stable.horses() {
        let out = if stable.active_key() == Some(horse.key()) { " [out]" } else { "" };
        msg.push_str(&format!("  {} ({}){}\n", horse.name(), horse.horse_type().name(), out));
    }
    CommandResult::success(msg.trim_end())
}

fn cmd_summon(
    owner: &str,
    player: EntityId,
    args: &[&str],
    plugin: &mut HorsesPlugin,
    world: &mut dyn WorldRuntime,
) -> CommandResult {
    let Some(name) = args.first() else {
        return CommandResult::error("Usage: /horse summon <name>");
    };
    let cooldown = plugin.config().perm_config(&*world, Some(player)).death_cooldown_secs;

    let (stable, mut ctx) = plugin.stable_context(owner, world);
    let Some(horse) = stable.find(name) else {
        return StableError::UnknownHorse(name.to_string()).into();
    };
    let key = horse.key();
    let display = horse.name().to_string();

    let wait = horse.cooldown_remaining(cooldown, now_millis());
    if wait > 0 {
        return CommandResult::error(format!("{} ({}s)", Message::HorseOnCooldown.text(), wait));
    }

    if stable.spawn_horse(key, player, &mut ctx) {
        CommandResult::success(format!("{} has arrived", display))
    } else {
        CommandResult::error(Message::SummonFailed.text())
    }
}

fn cmd_dismiss(owner: &str, plugin: &mut HorsesPlugin, world: &mut dyn WorldRuntime) -> CommandResult {
    let (stable, mut ctx) = plugin.stable_context(owner, world);
    let Some(name) = stable.active().map(|h| h.name().to_string()) else {
        return CommandResult::error(Message::NoActiveHorse.text());
    };
    stable.dismiss(&mut ctx);
    CommandResult::success(format!("{} went back to the stable", name))
}

fn cmd_buy(owner: &str, args: &[&str], plugin: &mut HorsesPlugin, world: &mut dyn WorldRuntime) -> CommandResult {
    let Some((type_arg, name_parts)) = args.split_last().filter(|(_, name)| !name.is_empty()) else {
        return CommandResult::error("Usage: /horse buy <name> <type>");
    };
    let Some(horse_type) = HorseType::from_name(type_arg) else {
        return CommandResult::error(format!("Unknown horse type: {}", type_arg));
    };

    let (stable, mut ctx) = plugin.stable_context(owner, world);
    match stable.create_horse(&name_parts.join(" "), horse_type, &mut ctx) {
        Ok(key) => {
            let name = stable.get(key).map(|h| h.name().to_string()).unwrap_or_default();
            CommandResult::success(format!("You bought a {} horse named {}", horse_type.name(), name))
        }
        Err(e) => e.into(),
    }
}

fn cmd_rename(owner: &str, args: &[&str], plugin: &mut HorsesPlugin, world: &mut dyn WorldRuntime) -> CommandResult {
    if args.len() < 2 {
        return CommandResult::error("Usage: /horse rename <name> <new name>");
    }
    let (stable, ctx) = plugin.stable_context(owner, world);
    let Some(key) = stable.find_key(args[0]) else {
        return StableError::UnknownHorse(args[0].to_string()).into();
    };

    match stable.rename_horse(key, &args[1..].join(" "), ctx.world, ctx.database) {
        Ok(()) => {
            let name = stable.get(key).map(|h| h.name().to_string()).unwrap_or_default();
            CommandResult::success(format!("{} is now called {}", args[0], name))
        }
        Err(e) => e.into(),
    }
}

fn cmd_delete(owner: &str, args: &[&str], plugin: &mut HorsesPlugin, world: &mut dyn WorldRuntime) -> CommandResult {
    let Some(name) = args.first() else {
        return CommandResult::error("Usage: /horse delete <name>");
    };
    let (stable, mut ctx) = plugin.stable_context(owner, world);
    let Some(key) = stable.find_key(name) else {
        return StableError::UnknownHorse(name.to_string()).into();
    };

    if stable.delete_horse(key, &mut ctx) {
        CommandResult::success(format!("{} has been released", name))
    } else {
        CommandResult::error(format!("{} could not be released, try again later", name))
    }
}

fn cmd_info(owner: &str, args: &[&str], plugin: &mut HorsesPlugin, world: &mut dyn WorldRuntime) -> CommandResult {
    let Some(name) = args.first() else {
        return CommandResult::error("Usage: /horse info <name>");
    };
    let (stable, ctx) = plugin.stable_context(owner, world);
    let Some(key) = stable.find_key(name) else {
        return StableError::UnknownHorse(name.to_string()).into();
    };
    let Some(horse) = stable.get_mut(key) else {
        return StableError::UnknownHorse(name.to_string()).into();
    };

    let world = &*ctx.world;
    let mut msg = format!("{} ({})\n", horse.name(), horse.horse_type().name());
    msg.push_str(&format!("  Health: {:.1}/{:.1}\n", horse.health(world), horse.max_health(world)));
    msg.push_str(&format!("  Speed: {:.3}\n", horse.speed(world)));
    msg.push_str(&format!("  Jump strength: {:.3}", horse.jump_strength(world)));
    if horse.horse_type().has_equipment_slots() {
        let describe = |item: Option<ItemStack>| item.map(|i| i.material).unwrap_or_else(|| "none".to_string());
        let saddle = describe(horse.item(SADDLE_SLOT as i32, world));
        let armour = describe(horse.item(ARMOR_SLOT as i32, world));
        msg.push_str(&format!("\n  Saddle: {}, armour: {}", saddle, armour));
    }
    if horse.horse_type().is_chest_capable() {
        let chest = if horse.has_chest(world) { "yes" } else { "no" };
        msg.push_str(&format!("\n  Chest: {}", chest));
    }
    if let LiveBinding::Bound(_) = horse.binding() {
        msg.push_str("\n  Out in the world");
    }
    CommandResult::success(msg)
}

fn cmd_heal(owner: &str, args: &[&str], plugin: &mut HorsesPlugin, world: &mut dyn WorldRuntime) -> CommandResult {
    if args.len() < 2 {
        return CommandResult::error("Usage: /horse heal <name> <amount>");
    }
    let amount: f64 = match args[1].parse() {
        Ok(a) if a > 0.0 && f64::is_finite(a) => a,
        _ => return CommandResult::error("Invalid amount"),
    };

    let (stable, ctx) = plugin.stable_context(owner, world);
    let Some(key) = stable.find_key(args[0]) else {
        return StableError::UnknownHorse(args[0].to_string()).into();
    };
    let Some(horse) = stable.get_mut(key) else {
        return StableError::UnknownHorse(args[0].to_string()).into();
    };

    if horse.heal_estimate(amount, &*ctx.world) <= 0.0 {
        return CommandResult::error(format!("{} is already at full health", horse.name()));
    }
    let applied = horse.add_health(amount, &mut *ctx.world);
    horse.save_changes(&*ctx.world, ctx.database);

    let health = horse.health(&*ctx.world);
    let max = horse.max_health(&*ctx.world);
    let mut msg = format!("Healed {} by {:.1}. Now {:.1}/{:.1}", horse.name(), applied, health, max);
    if applied < amount {
        msg.push_str(&format!(" ({:.1} wasted)", amount - applied));
    }
    CommandResult::success(msg)
}

fn cmd_claim(
    owner: &str,
    player: EntityId,
    args: &[&str],
    plugin: &mut HorsesPlugin,
    world: &mut dyn WorldRuntime,
) -> CommandResult {
    if args.is_empty() {
        return CommandResult::error("Usage: /horse claim <name>");
    }
    let Some(mount) = world.vehicle(player) else {
        return CommandResult::error("Ride the mount you want to claim first");
    };

    let (stable, mut ctx) = plugin.stable_context(owner, world);
    match stable.adopt_horse(&args.join(" "), mount, &mut ctx) {
        Ok(key) => {
            let name = stable.get(key).map(|h| h.name().to_string()).unwrap_or_default();
            CommandResult::success(format!("{} is now yours. Summon it with /horse summon {}", name, name))
        }
        Err(e) => e.into(),
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::config::HorsesConfig;
    use crate::persistence::MemoryDatabase;
    use crate::world::SimWorld;
    use horses_shared::{HorseColor, Location, MountStyle, MountVariant};

    struct Fixture {
        world: SimWorld,
        database: Rc<MemoryDatabase>,
        plugin: HorsesPlugin,
        steve: EntityId,
    }

    impl Fixture {
        fn new() -> Self {
            let mut world = SimWorld::new();
            let steve = world.add_player("Steve", Location::new("world", 0.0, 64.0, 0.0));
            let database = Rc::new(MemoryDatabase::new());
            let plugin = HorsesPlugin::new(HorsesConfig::default(), Box::new(database.clone()), None);
            Self { world, database, plugin, steve }
        }

        fn run(&mut self, line: &str) -> CommandResult {
            parse_and_execute(line, self.steve, &mut self.plugin, &mut self.world)
                .expect("should be a horse command")
        }
    }

    #[test]
    fn test_non_horse_input_is_ignored() {
        let mut fx = Fixture::new();
        let steve = fx.steve;
        assert!(parse_and_execute("hello", steve, &mut fx.plugin, &mut fx.world).is_none());
        assert!(parse_and_execute("/tp 0 0 0", steve, &mut fx.plugin, &mut fx.world).is_none());
        assert!(fx.run("/horse").message.contains("/horse summon"));
        assert!(!fx.run("/horse gallop").success);
    }

    #[test]
    fn test_buy_list_and_summon() {
        let mut fx = Fixture::new();

        let result = fx.run("/horse buy Black Beauty black");
        assert!(result.success, "{}", result.message);
        assert!(result.message.contains("Black_Beauty"));
        assert!(!fx.run("/horse buy Nope unicorn").success);

        assert!(fx.run("/horse summon black_beauty").success);
        assert_eq!(fx.world.mount_count(), 1);

        let list = fx.run("/horse list");
        assert!(list.message.contains("(1/10)"));
        assert!(list.message.contains("Black_Beauty (Black) [out]"));

        assert!(fx.run("/horse dismiss").success);
        assert_eq!(fx.world.mount_count(), 0);
        assert_eq!(fx.run("/horse dismiss").message, Message::NoActiveHorse.text());
    }

    #[test]
    fn test_summon_respects_death_cooldown() {
        let mut fx = Fixture::new();
        fx.plugin.set_config({
            let mut config = HorsesConfig::default();
            config.permissions.default.death_cooldown_secs = 600;
            config
        });
        fx.run("/horse buy Seabiscuit brown");
        assert!(fx.run("/horse summon Seabiscuit").success);

        let horse = fx.plugin.stable("Steve").unwrap().active().unwrap().binding();
        let LiveBinding::Bound(entity) = horse else {
            panic!("horse should be out");
        };
        fx.world.kill(entity);
        fx.plugin.on_entity_death(entity, &mut fx.world);

        let result = fx.run("/horse summon Seabiscuit");
        assert!(!result.success);
        assert!(result.message.starts_with(&Message::HorseOnCooldown.text()));
        assert_eq!(fx.world.mount_count(), 0);
    }

    #[test]
    fn test_summon_failure_is_reported() {
        let mut fx = Fixture::new();
        fx.run("/horse buy Seabiscuit brown");
        fx.world.set_refuse_spawns(true);

        assert_eq!(fx.run("/horse summon Seabiscuit").message, Message::SummonFailed.text());
        assert!(!fx.run("/horse summon Nobody").success);
    }

    #[test]
    fn test_rename_info_delete() {
        let mut fx = Fixture::new();
        fx.run("/horse buy Pack donkey");

        assert!(fx.run("/horse rename Pack Old Faithful").success);
        let info = fx.run("/horse info old_faithful");
        assert!(info.success);
        assert!(info.message.starts_with("Old_Faithful (Donkey)"));
        assert!(info.message.contains("Chest: no"));

        let id = fx.plugin.stable("Steve").unwrap().horses()[0].id();
        assert!(fx.run("/horse delete Old_Faithful").success);
        assert!(fx.database.get(id).is_none());
        assert!(!fx.run("/horse info Old_Faithful").success);
    }

    #[test]
    fn test_heal_reports_waste() {
        let mut fx = Fixture::new();
        fx.run("/horse buy Trigger white");

        // Default type: 20 of 30 health
        let result = fx.run("/horse heal Trigger 15");
        assert!(result.success);
        assert!(result.message.contains("by 10.0"));
        assert!(result.message.contains("(5.0 wasted)"));

        assert!(!fx.run("/horse heal Trigger 5").success);
        assert!(!fx.run("/horse heal Trigger lots").success);
        assert_eq!(fx.database.stable("Steve")[0].health, 30.0);
    }

    #[test]
    fn test_claim_ridden_mount() {
        let mut fx = Fixture::new();
        assert!(!fx.run("/horse claim Wildfire").success);

        let steve = fx.steve;
        let wild = fx.world.add_wild_mount(
            MountVariant::Horse,
            Some(MountStyle::Horse(HorseColor::Chestnut)),
            Location::new("world", 3.0, 64.0, 3.0),
        );
        fx.world.ride(steve, wild);

        let result = fx.run("/horse claim Wildfire");
        assert!(result.success, "{}", result.message);
        assert!(!fx.world.contains(wild));
        assert!(fx.run("/horse list").message.contains("Wildfire (Chestnut)"));
        assert!(fx.run("/horse info Wildfire").message.contains("Saddle: none, armour: none"));
    }
}

//! PostgreSQL database operations.

use sqlx::{PgPool, postgres::PgPoolOptions, Row};
use serde::{Deserialize, Serialize};
use log::warn;

use horses_shared::{HorseType, ItemStack};

use super::HorseRecord;

/// Inventory slot data for persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventorySlotData {
    pub slot: i16,
    pub material: String,
    pub amount: i32,
}

/// Flatten a sparse inventory into the rows that need storing
pub fn inventory_to_data(inventory: &[Option<ItemStack>]) -> Vec<InventorySlotData> {
    inventory
        .iter()
        .enumerate()
        .filter_map(|(slot, item)| {
            item.as_ref().map(|stack| InventorySlotData {
                slot: slot as i16,
                material: stack.material.clone(),
                amount: stack.amount as i32,
            })
        })
        .collect()
}

/// Rebuild a sparse inventory from stored rows
pub fn data_to_inventory(data: &[InventorySlotData]) -> Vec<Option<ItemStack>> {
    let size = data
        .iter()
        .filter(|d| d.slot >= 0)
        .map(|d| d.slot as usize + 1)
        .max()
        .unwrap_or(0);

    let mut inventory: Vec<Option<ItemStack>> = vec![None; size];
    for item in data {
        if item.slot < 0 || item.amount <= 0 {
            continue;
        }
        inventory[item.slot as usize] = ItemStack::with_amount(item.material.clone(), item.amount as u32).into_slot();
    }
    inventory
}

/// Horse type stored in the `horse_type` column. Out-of-range values are unknown.
fn horse_type_from_column(value: i16) -> Option<HorseType> {
    u8::try_from(value).ok().and_then(HorseType::from_u8)
}

/// Database connection wrapper
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to the database
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(url)
            .await?;

        Ok(Self { pool })
    }

    /// Create the tables if this is a fresh database
    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS horses (
                id INTEGER PRIMARY KEY,
                owner TEXT NOT NULL,
                name TEXT NOT NULL,
                horse_type SMALLINT NOT NULL,
                max_health DOUBLE PRECISION NOT NULL,
                health DOUBLE PRECISION NOT NULL,
                speed DOUBLE PRECISION NOT NULL,
                jump_strength DOUBLE PRECISION NOT NULL,
                has_chest BOOLEAN NOT NULL DEFAULT FALSE,
                last_death BIGINT NOT NULL DEFAULT 0
            )"
        )
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS horses_owner_idx ON horses (owner)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS horse_inventory (
                horse_id INTEGER NOT NULL REFERENCES horses (id) ON DELETE CASCADE,
                slot SMALLINT NOT NULL,
                material TEXT NOT NULL,
                amount INTEGER NOT NULL,
                PRIMARY KEY (horse_id, slot)
            )"
        )
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Highest id in use, 0 for an empty table
    pub async fn max_horse_id(&self) -> Result<i32, sqlx::Error> {
        sqlx::query_scalar("SELECT COALESCE(MAX(id), 0) FROM horses")
            .fetch_one(&self.pool)
            .await
    }

    // =========================================================================
    // Horse Operations
    // =========================================================================

    /// Load every horse of an owner
    pub async fn load_stable(&self, owner: &str) -> Result<Vec<HorseRecord>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT id, owner, name, horse_type, max_health, health, speed,
                    jump_strength, has_chest, last_death
             FROM horses WHERE owner = $1
             ORDER BY id"
        )
            .bind(owner)
            .fetch_all(&self.pool)
            .await?;

        let mut records = Vec::with_capacity(rows.len());
        for r in rows {
            let id: i32 = r.get("id");
            let type_val: i16 = r.get("horse_type");
            let horse_type = match horse_type_from_column(type_val) {
                Some(t) => t,
                None => {
                    warn!("Horse {} has unknown type {}, skipping", id, type_val);
                    continue;
                }
            };

            let inventory = self.load_inventory(id).await?;

            records.push(HorseRecord {
                id,
                owner: r.get("owner"),
                name: r.get("name"),
                horse_type,
                max_health: r.get("max_health"),
                health: r.get("health"),
                speed: r.get("speed"),
                jump_strength: r.get("jump_strength"),
                has_chest: r.get("has_chest"),
                last_death: r.get("last_death"),
                inventory,
            });
        }

        Ok(records)
    }

    async fn load_inventory(&self, horse_id: i32) -> Result<Vec<Option<ItemStack>>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT slot, material, amount FROM horse_inventory WHERE horse_id = $1 ORDER BY slot"
        )
            .bind(horse_id)
            .fetch_all(&self.pool)
            .await?;

        let data: Vec<InventorySlotData> = rows
            .iter()
            .map(|r| InventorySlotData {
                slot: r.get("slot"),
                material: r.get("material"),
                amount: r.get("amount"),
            })
            .collect();

        Ok(data_to_inventory(&data))
    }

    /// Insert or update a horse and replace its inventory
    pub async fn save_horse(&self, record: &HorseRecord) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO horses (id, owner, name, horse_type, max_health, health, speed,
                                 jump_strength, has_chest, last_death)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                max_health = EXCLUDED.max_health,
                health = EXCLUDED.health,
                speed = EXCLUDED.speed,
                jump_strength = EXCLUDED.jump_strength,
                has_chest = EXCLUDED.has_chest,
                last_death = EXCLUDED.last_death"
        )
            .bind(record.id)
            .bind(&record.owner)
            .bind(&record.name)
            .bind(record.horse_type.as_u8() as i16)
            .bind(record.max_health)
            .bind(record.health)
            .bind(record.speed)
            .bind(record.jump_strength)
            .bind(record.has_chest)
            .bind(record.last_death)
            .execute(&mut *tx)
            .await?;

        // Clear existing inventory
        sqlx::query("DELETE FROM horse_inventory WHERE horse_id = $1")
            .bind(record.id)
            .execute(&mut *tx)
            .await?;

        for item in inventory_to_data(&record.inventory) {
            sqlx::query(
                "INSERT INTO horse_inventory (horse_id, slot, material, amount) VALUES ($1, $2, $3, $4)"
            )
                .bind(record.id)
                .bind(item.slot)
                .bind(&item.material)
                .bind(item.amount)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await
    }

    /// Delete a horse (cascade deletes its inventory)
    pub async fn delete_horse(&self, id: i32) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM horses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

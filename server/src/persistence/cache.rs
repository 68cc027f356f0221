//! Redis cache operations for hot horse snapshots.

use redis::{AsyncCommands, aio::ConnectionManager};

use super::{HorseRecord, PersistenceError};

/// Cache key prefix
const HORSE_STATE_PREFIX: &str = "horse:state:";

/// TTL for cached data (1 hour)
const CACHE_TTL_SECONDS: u64 = 3600;

/// Redis cache wrapper
#[derive(Clone)]
pub struct Cache {
    conn: ConnectionManager,
}

impl Cache {
    /// Connect to Redis
    pub async fn connect(url: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }

    /// Save a horse snapshot to cache
    pub async fn save_horse_state(&self, record: &HorseRecord) -> Result<(), PersistenceError> {
        let key = format!("{}{}", HORSE_STATE_PREFIX, record.id);
        let json = serde_json::to_string(record)?;

        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(&key, json, CACHE_TTL_SECONDS).await?;

        Ok(())
    }

    /// Load a horse snapshot from cache
    pub async fn load_horse_state(&self, id: i32) -> Result<Option<HorseRecord>, PersistenceError> {
        let key = format!("{}{}", HORSE_STATE_PREFIX, id);

        let mut conn = self.conn.clone();
        let json: Option<String> = conn.get(&key).await?;

        Ok(json.and_then(|j| serde_json::from_str(&j).ok()))
    }

    /// Delete a horse snapshot from cache
    pub async fn delete_horse_state(&self, id: i32) -> Result<(), PersistenceError> {
        let key = format!("{}{}", HORSE_STATE_PREFIX, id);

        let mut conn = self.conn.clone();
        conn.del::<_, ()>(&key).await?;

        Ok(())
    }
}

//! Persistence layer for stabled horses.
//!
//! The plugin talks to storage through [`HorseDatabase`], which is synchronous
//! and never blocks the simulation thread. [`PersistenceHandle`] satisfies it
//! by handing ids out locally and queueing the actual writes to a background
//! task; [`MemoryDatabase`] keeps everything in process.

mod database;
mod cache;

pub use database::{Database, InventorySlotData};
pub use cache::Cache;

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};

use log::{info, error, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use horses_shared::{HorseType, ItemStack, UNASSIGNED_HORSE_ID};

/// Persistence errors
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("cache error: {0}")]
    Cache(#[from] redis::RedisError),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("persistence task is not running")]
    ChannelClosed,
}

/// Snapshot of a horse as it is stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorseRecord {
    pub id: i32,
    pub owner: String,
    /// Name as the player typed it, before normalization
    pub name: String,
    pub horse_type: HorseType,
    pub max_health: f64,
    pub health: f64,
    pub speed: f64,
    pub jump_strength: f64,
    pub has_chest: bool,
    /// Milliseconds since the epoch, 0 if the horse never died
    pub last_death: i64,
    pub inventory: Vec<Option<ItemStack>>,
}

/// Storage collaborator used by the plugin
pub trait HorseDatabase {
    /// Persist a snapshot. Returns the id it is stored under, allocating one
    /// when the record has never been saved.
    fn save_horse(&self, record: &HorseRecord) -> i32;

    /// Permanently remove a horse. Returns whether the removal was accepted.
    fn delete_horse(&self, owner: &str, id: i32) -> bool;
}

impl<T: HorseDatabase + ?Sized> HorseDatabase for Rc<T> {
    fn save_horse(&self, record: &HorseRecord) -> i32 {
        (**self).save_horse(record)
    }

    fn delete_horse(&self, owner: &str, id: i32) -> bool {
        (**self).delete_horse(owner, id)
    }
}

// =============================================================================
// In-memory storage
// =============================================================================

/// Keeps every record in process. Used when no database is reachable.
#[derive(Debug)]
pub struct MemoryDatabase {
    records: RefCell<HashMap<i32, HorseRecord>>,
    next_id: Cell<i32>,
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self {
            records: RefCell::new(HashMap::new()),
            next_id: Cell::new(1),
        }
    }
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: i32) -> Option<HorseRecord> {
        self.records.borrow().get(&id).cloned()
    }

    /// All records of one owner, oldest first
    pub fn stable(&self, owner: &str) -> Vec<HorseRecord> {
        let mut records: Vec<HorseRecord> = self
            .records
            .borrow()
            .values()
            .filter(|r| r.owner == owner)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.id);
        records
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }
}

impl HorseDatabase for MemoryDatabase {
    fn save_horse(&self, record: &HorseRecord) -> i32 {
        let id = if record.id == UNASSIGNED_HORSE_ID {
            let id = self.next_id.get();
            self.next_id.set(id + 1);
            id
        } else {
            record.id
        };

        let mut stored = record.clone();
        stored.id = id;
        self.records.borrow_mut().insert(id, stored);
        id
    }

    fn delete_horse(&self, owner: &str, id: i32) -> bool {
        let mut records = self.records.borrow_mut();
        match records.get(&id) {
            Some(record) if record.owner == owner => {
                records.remove(&id);
                true
            }
            // Never saved, nothing to remove
            None if id == UNASSIGNED_HORSE_ID => true,
            _ => false,
        }
    }
}

// =============================================================================
// Background persistence
// =============================================================================

/// Commands sent to the persistence background task
#[derive(Debug)]
pub enum PersistenceCommand {
    /// Save a horse to both cache and database
    SaveHorse { record: HorseRecord },
    /// Remove a horse from cache and database
    DeleteHorse { id: i32 },
    /// Load every horse of an owner (response sent via oneshot channel)
    LoadStable {
        owner: String,
        response: tokio::sync::oneshot::Sender<Vec<HorseRecord>>,
    },
    /// Shutdown the persistence task
    Shutdown,
}

/// Handle for sending commands to the persistence task.
///
/// The queue is unbounded: a save handed to the handle is never dropped, only
/// delayed until the task gets to it.
#[derive(Clone)]
pub struct PersistenceHandle {
    sender: mpsc::UnboundedSender<PersistenceCommand>,
    next_id: Arc<AtomicI32>,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl PersistenceHandle {
    fn new(sender: mpsc::UnboundedSender<PersistenceCommand>, next_id: i32, task: JoinHandle<()>) -> Self {
        Self {
            sender,
            next_id: Arc::new(AtomicI32::new(next_id)),
            task: Arc::new(Mutex::new(Some(task))),
        }
    }

    /// Load a stable (async - call on player join, not per tick)
    pub async fn load_stable(&self, owner: &str) -> Result<Vec<HorseRecord>, PersistenceError> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.sender
            .send(PersistenceCommand::LoadStable {
                owner: owner.to_string(),
                response: tx,
            })
            .map_err(|_| PersistenceError::ChannelClosed)?;
        rx.await.map_err(|_| PersistenceError::ChannelClosed)
    }

    /// Shutdown the persistence task and wait until every write queued before
    /// this call has been handled.
    pub async fn shutdown(&self) {
        let _ = self.sender.send(PersistenceCommand::Shutdown);
        let task = match self.task.lock() {
            Ok(mut task) => task.take(),
            Err(_) => None,
        };
        if let Some(task) = task {
            if let Err(e) = task.await {
                error!("Persistence task failed: {}", e);
            }
        }
    }
}

impl HorseDatabase for PersistenceHandle {
    fn save_horse(&self, record: &HorseRecord) -> i32 {
        let id = if record.id == UNASSIGNED_HORSE_ID {
            self.next_id.fetch_add(1, Ordering::SeqCst)
        } else {
            record.id
        };

        let mut record = record.clone();
        record.id = id;
        // Fire and forget - the game loop never waits on I/O
        if self.sender.send(PersistenceCommand::SaveHorse { record }).is_err() {
            error!("Persistence task is gone, horse {} was not saved", id);
        }
        id
    }

    fn delete_horse(&self, _owner: &str, id: i32) -> bool {
        if id == UNASSIGNED_HORSE_ID {
            return true;
        }
        match self.sender.send(PersistenceCommand::DeleteHorse { id }) {
            Ok(()) => true,
            Err(_) => {
                warn!("Could not queue deletion of horse {}: persistence task is gone", id);
                false
            }
        }
    }
}

/// Initialize the persistence system and spawn the background task.
/// Returns a handle for sending commands.
pub async fn init(database_url: &str, redis_url: &str) -> Result<PersistenceHandle, PersistenceError> {
    // Connect to PostgreSQL
    let db = Database::connect(database_url).await?;
    db.ensure_schema().await?;
    info!("Connected to PostgreSQL");

    // Connect to Redis
    let cache = Cache::connect(redis_url).await?;
    info!("Connected to Redis");

    // Ids are handed out here so saves can return them without waiting
    let next_id = db.max_horse_id().await? + 1;

    let (tx, rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(persistence_task(db, cache, rx));
    info!("Persistence background task started (next horse id {})", next_id);

    Ok(PersistenceHandle::new(tx, next_id, task))
}

/// Background task that handles all persistence operations
async fn persistence_task(db: Database, cache: Cache, mut rx: mpsc::UnboundedReceiver<PersistenceCommand>) {
    info!("Persistence task running");

    while let Some(cmd) = rx.recv().await {
        match cmd {
            PersistenceCommand::SaveHorse { record } => {
                // Save to Redis cache first (fast)
                if let Err(e) = cache.save_horse_state(&record).await {
                    warn!("Failed to save horse {} to cache: {}", record.id, e);
                }

                // Also save to database (permanent storage)
                if let Err(e) = db.save_horse(&record).await {
                    error!("Failed to save horse {} to database: {}", record.id, e);
                }
            }

            PersistenceCommand::DeleteHorse { id } => {
                if let Err(e) = cache.delete_horse_state(id).await {
                    warn!("Failed to delete horse {} from cache: {}", id, e);
                }
                if let Err(e) = db.delete_horse(id).await {
                    error!("Failed to delete horse {} from database: {}", id, e);
                }
            }

            PersistenceCommand::LoadStable { owner, response } => {
                let records = match db.load_stable(&owner).await {
                    Ok(records) => overlay_cached(&cache, records).await,
                    Err(e) => {
                        error!("Failed to load stable of {}: {}", owner, e);
                        Vec::new()
                    }
                };
                info!("Loaded {} horses for {}", records.len(), owner);
                let _ = response.send(records);
            }

            PersistenceCommand::Shutdown => {
                info!("Persistence task shutting down");
                break;
            }
        }
    }

    info!("Persistence task stopped");
}

/// The cache is written before the database, so a cached snapshot is never older
async fn overlay_cached(cache: &Cache, records: Vec<HorseRecord>) -> Vec<HorseRecord> {
    let cached = futures::future::join_all(records.iter().map(|r| cache.load_horse_state(r.id))).await;

    records
        .into_iter()
        .zip(cached)
        .map(|(stored, cached)| match cached {
            Ok(Some(fresh)) if fresh.owner == stored.owner => fresh,
            _ => stored,
        })
        .collect()
}

use crate::error::AppError;
use crate::value::Attributes;
use crate::{debug, info};
use redb::{Database, ReadableTable, TableDefinition};
use std::path::{Path, PathBuf};
use std::{env, fs};

/// Rows of every model, keyed by `(table_name, id)`.
const RECORDS: TableDefinition<(&str, u64), &[u8]> = TableDefinition::new("records");
/// Last id handed out per table.
const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

pub const DB_PATH_ENV: &str = "INHERITS_DB_PATH";
pub const DB_CACHE_ENV: &str = "INHERITS_DB_CACHE_MB";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub db_path: PathBuf,
    pub cache_size_mb: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig { db_path: PathBuf::from("inherits.redb"), cache_size_mb: 64 }
    }
}

impl StoreConfig {
    /// Defaults overridden by `INHERITS_DB_PATH` and `INHERITS_DB_CACHE_MB`.
    pub fn from_env() -> Result<Self, AppError> {
        let mut config = StoreConfig::default();
        if let Ok(path) = env::var(DB_PATH_ENV) {
            config.db_path = PathBuf::from(path);
        }
        if let Ok(raw) = env::var(DB_CACHE_ENV) {
            config.cache_size_mb = raw
                .trim()
                .parse()
                .map_err(|e| AppError::Custom(format!("{DB_CACHE_ENV}={raw} is not a size in MB: {e}")))?;
        }
        Ok(config)
    }

    /// Randomly named database under the system temp dir.
    pub fn temp(name: &str) -> Self {
        let db_path = env::temp_dir()
            .join("inherits")
            .join(format!("{}_{}.redb", name, rand::random::<u64>()));
        StoreConfig { db_path, ..StoreConfig::default() }
    }
}

/// Row store on top of a single redb database.
///
/// Every `insert`/`update` commits its own write transaction.
pub struct Store {
    db: Database,
    path: PathBuf,
}

impl Store {
    pub fn open(config: &StoreConfig) -> Result<Self, AppError> {
        if let Some(dir) = config.db_path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }
        let existed = config.db_path.exists();
        let db = Database::builder()
            .set_cache_size(config.cache_size_mb * 1024 * 1024)
            .create(&config.db_path)?;
        let tx = db.begin_write()?;
        {
            tx.open_table(RECORDS)?;
            tx.open_table(SEQUENCES)?;
        }
        tx.commit()?;
        if existed {
            info!("Opened existing db at {:?} with cache size {} MB", config.db_path, config.cache_size_mb);
        } else {
            info!("Created db at {:?} with cache size {} MB", config.db_path, config.cache_size_mb);
        }
        Ok(Store { db, path: config.db_path.clone() })
    }

    pub fn temp(name: &str) -> Result<Self, AppError> {
        Self::open(&StoreConfig::temp(name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes a new row and returns its id (ids start at 1 per table).
    pub fn insert(&self, table: &str, attrs: &Attributes) -> Result<u64, AppError> {
        let bytes = bincode::serialize(attrs)?;
        let tx = self.db.begin_write()?;
        let id = {
            let mut sequences = tx.open_table(SEQUENCES)?;
            let next = sequences.get(table)?.map(|guard| guard.value()).unwrap_or(0) + 1;
            sequences.insert(table, next)?;
            let mut records = tx.open_table(RECORDS)?;
            records.insert((table, next), bytes.as_slice())?;
            next
        };
        tx.commit()?;
        debug!("Inserted {table} #{id}");
        Ok(id)
    }

    pub fn update(&self, table: &str, id: u64, attrs: &Attributes) -> Result<(), AppError> {
        let bytes = bincode::serialize(attrs)?;
        let tx = self.db.begin_write()?;
        {
            let mut records = tx.open_table(RECORDS)?;
            if records.get((table, id))?.is_none() {
                return Err(AppError::NotFound(format!("{table} #{id}")));
            }
            records.insert((table, id), bytes.as_slice())?;
        }
        tx.commit()?;
        debug!("Updated {table} #{id}");
        Ok(())
    }

    pub fn get(&self, table: &str, id: u64) -> Result<Option<Attributes>, AppError> {
        let tx = self.db.begin_read()?;
        let records = tx.open_table(RECORDS)?;
        let row = match records.get((table, id))? {
            Some(guard) => Some(bincode::deserialize::<Attributes>(guard.value())?),
            None => None,
        };
        Ok(row)
    }

    /// All rows of `table` in id order.
    pub fn scan(&self, table: &str) -> Result<Vec<(u64, Attributes)>, AppError> {
        let tx = self.db.begin_read()?;
        let records = tx.open_table(RECORDS)?;
        let mut rows = Vec::new();
        for entry in records.range((table, 0u64)..=(table, u64::MAX))? {
            let (key, value) = entry?;
            let (_, id) = key.value();
            rows.push((id, bincode::deserialize::<Attributes>(value.value())?));
        }
        Ok(rows)
    }

    pub fn ids(&self, table: &str) -> Result<Vec<u64>, AppError> {
        Ok(self.scan(table)?.into_iter().map(|(id, _)| id).collect())
    }

    pub fn count(&self, table: &str) -> Result<usize, AppError> {
        Ok(self.scan(table)?.len())
    }
}

//! Sled-backed persistence for accounts, plots, and the item catalog.
//! The store exposes the document-shaped contract the rest of the core
//! relies on: load-by-key, find-all, and upsert-by-key. Records are
//! bincode-encoded and schema-versioned; the canonical world content
//! (plots and catalog) is seeded exactly once per data directory.

use std::path::{Path, PathBuf};

use argon2::Argon2;
use log::warn;
use password_hash::{PasswordHasher, PasswordVerifier};
use sled::IVec;

use crate::world::errors::StoreError;
use crate::world::types::{
    AccountRecord, ItemRecord, PlotRecord, ACCOUNT_SCHEMA_VERSION, ITEM_SCHEMA_VERSION,
    PLOT_SCHEMA_VERSION,
};

const TREE_ACCOUNTS: &str = "plaza_accounts";
const TREE_PLOTS: &str = "plaza_plots";
const TREE_ITEMS: &str = "plaza_items";
const TREE_META: &str = "plaza_meta";

const SEED_MARKER_KEY: &[u8] = b"seed:world";

/// Helper builder so tests can easily create throwaway stores with custom
/// paths and skip world seeding.
pub struct WorldStoreBuilder {
    path: PathBuf,
    ensure_seed: bool,
}

impl WorldStoreBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ensure_seed: true,
        }
    }

    /// Opt out of seeding the canonical world during initialization.
    pub fn without_seed(mut self) -> Self {
        self.ensure_seed = false;
        self
    }

    pub fn open(self) -> Result<WorldStore, StoreError> {
        WorldStore::open_with_options(self.path, self.ensure_seed)
    }
}

/// Sled-backed store for the world's durable records.
pub struct WorldStore {
    _db: sled::Db,
    accounts: sled::Tree,
    plots: sled::Tree,
    items: sled::Tree,
    meta: sled::Tree,
}

impl WorldStore {
    /// Open (or create) the store rooted at `path`, seeding the canonical
    /// plots and catalog when the data directory is fresh.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Self::open_with_options(path, true)
    }

    fn open_with_options<P: AsRef<Path>>(path: P, seed: bool) -> Result<Self, StoreError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        let accounts = db.open_tree(TREE_ACCOUNTS)?;
        let plots = db.open_tree(TREE_PLOTS)?;
        let items = db.open_tree(TREE_ITEMS)?;
        let meta = db.open_tree(TREE_META)?;
        let store = Self {
            _db: db,
            accounts,
            plots,
            items,
            meta,
        };

        if seed {
            store.seed_world_if_needed()?;
        }

        Ok(store)
    }

    fn account_key(username: &str) -> Vec<u8> {
        format!("account:{}", username.to_ascii_lowercase()).into_bytes()
    }

    fn plot_key(id: &str) -> Vec<u8> {
        format!("plot:{}", id).into_bytes()
    }

    fn item_key(id: &str) -> Vec<u8> {
        format!("item:{}", id).into_bytes()
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
        Ok(bincode::serialize(value)?)
    }

    fn deserialize<T: serde::de::DeserializeOwned>(bytes: IVec) -> Result<T, StoreError> {
        Ok(bincode::deserialize::<T>(&bytes)?)
    }

    /// Insert or update an account record.
    pub fn put_account(&self, mut account: AccountRecord) -> Result<(), StoreError> {
        account.schema_version = ACCOUNT_SCHEMA_VERSION;
        account.touch();
        let key = Self::account_key(&account.username);
        let bytes = Self::serialize(&account)?;
        self.accounts.insert(key, bytes)?;
        self.accounts.flush()?;
        Ok(())
    }

    /// Fetch an account record by username.
    pub fn get_account(&self, username: &str) -> Result<AccountRecord, StoreError> {
        let key = Self::account_key(username);
        let Some(bytes) = self.accounts.get(&key)? else {
            return Err(StoreError::NotFound(format!("account: {}", username)));
        };
        let record: AccountRecord = Self::deserialize(bytes)?;
        if record.schema_version != ACCOUNT_SCHEMA_VERSION {
            return Err(StoreError::SchemaMismatch {
                entity: "account",
                expected: ACCOUNT_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    pub fn account_exists(&self, username: &str) -> Result<bool, StoreError> {
        Ok(self.accounts.contains_key(Self::account_key(username))?)
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Insert or update a plot record.
    pub fn put_plot(&self, mut plot: PlotRecord) -> Result<(), StoreError> {
        plot.schema_version = PLOT_SCHEMA_VERSION;
        plot.touch();
        let key = Self::plot_key(&plot.id);
        let bytes = Self::serialize(&plot)?;
        self.plots.insert(key, bytes)?;
        self.plots.flush()?;
        Ok(())
    }

    /// Fetch a plot record by id.
    pub fn get_plot(&self, id: &str) -> Result<PlotRecord, StoreError> {
        let key = Self::plot_key(id);
        let Some(bytes) = self.plots.get(&key)? else {
            return Err(StoreError::NotFound(format!("plot: {}", id)));
        };
        let record: PlotRecord = Self::deserialize(bytes)?;
        if record.schema_version != PLOT_SCHEMA_VERSION {
            return Err(StoreError::SchemaMismatch {
                entity: "plot",
                expected: PLOT_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    /// All plots, ordered by id.
    pub fn all_plots(&self) -> Result<Vec<PlotRecord>, StoreError> {
        let mut plots = Vec::new();
        for entry in self.plots.scan_prefix(b"plot:") {
            let (_, bytes) = entry?;
            plots.push(Self::deserialize::<PlotRecord>(bytes)?);
        }
        plots.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(plots)
    }

    pub fn plot_count(&self) -> usize {
        self.plots.len()
    }

    /// Insert or update a catalog item.
    pub fn put_item(&self, mut item: ItemRecord) -> Result<(), StoreError> {
        item.schema_version = ITEM_SCHEMA_VERSION;
        let key = Self::item_key(&item.id);
        let bytes = Self::serialize(&item)?;
        self.items.insert(key, bytes)?;
        self.items.flush()?;
        Ok(())
    }

    /// Fetch a catalog item by id.
    pub fn get_item(&self, id: &str) -> Result<ItemRecord, StoreError> {
        let key = Self::item_key(id);
        let Some(bytes) = self.items.get(&key)? else {
            return Err(StoreError::NotFound(format!("item: {}", id)));
        };
        let record: ItemRecord = Self::deserialize(bytes)?;
        if record.schema_version != ITEM_SCHEMA_VERSION {
            return Err(StoreError::SchemaMismatch {
                entity: "item",
                expected: ITEM_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    /// All catalog items, ordered by id.
    pub fn all_items(&self) -> Result<Vec<ItemRecord>, StoreError> {
        let mut items = Vec::new();
        for entry in self.items.scan_prefix(b"item:") {
            let (_, bytes) = entry?;
            items.push(Self::deserialize::<ItemRecord>(bytes)?);
        }
        items.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(items)
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn is_seeded(&self) -> Result<bool, StoreError> {
        Ok(self.meta.contains_key(SEED_MARKER_KEY)?)
    }

    /// Insert the canonical plots and catalog once per data directory.
    /// Returns the number of records written, zero on every later open.
    pub fn seed_world_if_needed(&self) -> Result<usize, StoreError> {
        if self.is_seeded()? {
            return Ok(0);
        }
        let mut inserted = 0usize;
        for plot in canonical_plots() {
            self.put_plot(plot)?;
            inserted += 1;
        }
        for item in canonical_catalog() {
            self.put_item(item)?;
            inserted += 1;
        }
        self.meta.insert(SEED_MARKER_KEY, b"1")?;
        self.meta.flush()?;
        Ok(inserted)
    }
}

/// The six purchasable plots of the housing district. Each sits on the
/// district's street grid; the position doubles as the interior's door.
pub fn canonical_plots() -> Vec<PlotRecord> {
    vec![
        PlotRecord::new("plot1", 90.0, 140.0, 500),
        PlotRecord::new("plot2", 250.0, 140.0, 500),
        PlotRecord::new("plot3", 410.0, 140.0, 750),
        PlotRecord::new("plot4", 90.0, 360.0, 750),
        PlotRecord::new("plot5", 250.0, 360.0, 900),
        PlotRecord::new("plot6", 410.0, 360.0, 1200),
    ]
}

/// The shop catalog. Damage feeds combat, range gates how far away an
/// attack still lands.
pub fn canonical_catalog() -> Vec<ItemRecord> {
    vec![
        ItemRecord::new("sword", "Sword", 250, "A dependable blade.", 20, 60.0),
        ItemRecord::new("dagger", "Dagger", 100, "Quick, short reach.", 10, 40.0),
        ItemRecord::new("axe", "Axe", 400, "Slow and heavy-handed.", 35, 50.0),
        ItemRecord::new("bow", "Bow", 600, "Strikes from a distance.", 15, 220.0),
    ]
}

/// Hashes a password into a PHC string for storage.
pub fn hash_password(password: &str) -> Result<String, StoreError> {
    let salt = password_hash::SaltString::generate(&mut rand::thread_rng());
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| StoreError::Credential(format!("password hash failure: {e}")))?;
    Ok(hash.to_string())
}

/// Verifies a password against a stored PHC string. Returns plain
/// accept/reject; a malformed stored hash rejects and logs.
pub fn verify_password(stored: &str, password: &str) -> bool {
    let parsed = match password_hash::PasswordHash::new(stored) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Stored password hash is malformed: {e}");
            return false;
        }
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

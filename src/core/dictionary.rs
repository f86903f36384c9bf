//! Phrase-replacement dictionaries.
//!
//! Two scopes: one table per guild and one global table applied after it.
//! Rules are literal substring replacements with no regex semantics, applied
//! in insertion order, one pass per rule. The output of one rule is not
//! re-scanned against that same rule, and applying the tables twice is not
//! guaranteed to be a fixed point across distinct rules; that single-pass
//! behavior is deliberate.
//!
//! Tables are read on every utterance and written rarely, from command
//! handlers. Reads take a short `parking_lot` lock and clone the (small)
//! table; writes mutate a scratch copy, persist it, and only then swap it
//! in, so a failed write leaves both memory and disk unchanged.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::platform::GuildId;
use crate::storage::{JsonStore, StoreResult};

/// Store key of the global table.
const GLOBAL_KEY: &str = "global_dict";

/// An ordered list of literal `(source, replacement)` pairs.
///
/// Order matters twice: it is the application order and the display order.
pub type DictionaryTable = Vec<(String, String)>;

fn guild_key(guild: GuildId) -> String {
    format!("guild_dicts/{guild}")
}

/// Guild-scoped and global replacement tables with JSON persistence.
pub struct DictionaryStore {
    global: RwLock<DictionaryTable>,
    guilds: RwLock<HashMap<GuildId, DictionaryTable>>,
    store: Arc<JsonStore>,
}

impl DictionaryStore {
    /// Load the global table from the store. Guild tables load lazily on
    /// first touch.
    pub fn load(store: Arc<JsonStore>) -> StoreResult<Self> {
        let global = store.load(GLOBAL_KEY)?;
        Ok(Self {
            global: RwLock::new(global),
            guilds: RwLock::new(HashMap::new()),
            store,
        })
    }

    /// Apply the guild table, then the global table, to `text`.
    ///
    /// Every rule replaces all non-overlapping occurrences of its source
    /// phrase in the current text. Empty tables are the identity.
    pub fn apply(&self, guild: GuildId, text: &str) -> String {
        let mut text = text.to_string();
        for (from, to) in self.guild_table(guild) {
            text = text.replace(&from, &to);
        }
        for (from, to) in self.global.read().clone() {
            text = text.replace(&from, &to);
        }
        text
    }

    /// Add or update a rule in a guild's table.
    ///
    /// Updating an existing source phrase keeps its position in the table.
    pub fn add_word(&self, guild: GuildId, source: &str, replacement: &str) -> StoreResult<()> {
        self.ensure_guild_loaded(guild)?;
        let mut guilds = self.guilds.write();
        let table = guilds.entry(guild).or_default();
        let mut updated = table.clone();
        upsert(&mut updated, source, replacement);
        self.store.save(&guild_key(guild), &updated)?;
        *table = updated;
        Ok(())
    }

    /// Remove a rule from a guild's table. Returns whether it existed.
    pub fn remove_word(&self, guild: GuildId, source: &str) -> StoreResult<bool> {
        self.ensure_guild_loaded(guild)?;
        let mut guilds = self.guilds.write();
        let table = guilds.entry(guild).or_default();
        let mut updated = table.clone();
        let before = updated.len();
        updated.retain(|(from, _)| from != source);
        if updated.len() == before {
            return Ok(false);
        }
        self.store.save(&guild_key(guild), &updated)?;
        *table = updated;
        Ok(true)
    }

    /// Snapshot of a guild's table, in display order.
    pub fn words(&self, guild: GuildId) -> DictionaryTable {
        self.guild_table(guild)
    }

    /// Add or update a rule in the global table.
    pub fn add_global_word(&self, source: &str, replacement: &str) -> StoreResult<()> {
        let mut global = self.global.write();
        let mut updated = global.clone();
        upsert(&mut updated, source, replacement);
        self.store.save(GLOBAL_KEY, &updated)?;
        *global = updated;
        Ok(())
    }

    /// Remove a rule from the global table. Returns whether it existed.
    pub fn remove_global_word(&self, source: &str) -> StoreResult<bool> {
        let mut global = self.global.write();
        let mut updated = global.clone();
        let before = updated.len();
        updated.retain(|(from, _)| from != source);
        if updated.len() == before {
            return Ok(false);
        }
        self.store.save(GLOBAL_KEY, &updated)?;
        *global = updated;
        Ok(true)
    }

    /// Snapshot of the global table, in display order.
    pub fn global_words(&self) -> DictionaryTable {
        self.global.read().clone()
    }

    /// Drop a guild's table from memory and disk. Called when the guild
    /// itself goes away.
    pub fn remove_guild(&self, guild: GuildId) -> StoreResult<()> {
        self.guilds.write().remove(&guild);
        self.store.remove(&guild_key(guild))?;
        debug!(guild = %guild, "removed guild dictionary");
        Ok(())
    }

    fn guild_table(&self, guild: GuildId) -> DictionaryTable {
        if let Some(table) = self.guilds.read().get(&guild) {
            return table.clone();
        }
        // First touch: pull the table off disk and cache it. Load errors
        // degrade to an empty table so the speech path stays infallible.
        let loaded: DictionaryTable = self.store.load(&guild_key(guild)).unwrap_or_default();
        self.guilds
            .write()
            .entry(guild)
            .or_insert(loaded)
            .clone()
    }

    fn ensure_guild_loaded(&self, guild: GuildId) -> StoreResult<()> {
        if !self.guilds.read().contains_key(&guild) {
            let loaded: DictionaryTable = self.store.load(&guild_key(guild))?;
            self.guilds.write().entry(guild).or_insert(loaded);
        }
        Ok(())
    }
}

fn upsert(table: &mut DictionaryTable, source: &str, replacement: &str) {
    match table.iter_mut().find(|(from, _)| from == source) {
        Some(entry) => entry.1 = replacement.to_string(),
        None => table.push((source.to_string(), replacement.to_string())),
    }
}

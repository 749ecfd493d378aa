// JSON file storage for macros and quotes. Both datasets are tiny and
// change rarely, so the whole file is rewritten on every mutation.

use crate::core::macros::{MacroDefinition, MacroError, MacroStore};
use crate::core::quotes::{Quote, QuoteError, QuoteStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;

// ============================================================================
// MACRO STORE
// ============================================================================

pub struct JsonMacroStore {
    path: PathBuf,
    cache: RwLock<HashMap<u64, HashMap<String, MacroDefinition>>>,
}

impl JsonMacroStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cache = if path.exists() {
            let file = std::fs::File::open(&path).expect("Failed to open macro store");
            let map: HashMap<u64, HashMap<String, MacroDefinition>> =
                serde_json::from_reader(file).unwrap_or_default();
            RwLock::new(map)
        } else {
            RwLock::new(HashMap::new())
        };

        Self { path, cache }
    }

    async fn persist(&self) -> Result<(), MacroError> {
        let cache = self.cache.read().await;
        let file = std::fs::File::create(&self.path)
            .map_err(|e| MacroError::Storage(e.to_string()))?;
        serde_json::to_writer_pretty(file, &*cache)
            .map_err(|e| MacroError::Storage(e.to_string()))
    }
}

#[async_trait]
impl MacroStore for JsonMacroStore {
    async fn get(
        &self,
        guild_id: u64,
        name: &str,
    ) -> Result<Option<MacroDefinition>, MacroError> {
        let cache = self.cache.read().await;
        Ok(cache
            .get(&guild_id)
            .and_then(|macros| macros.get(name))
            .cloned())
    }

    async fn insert(
        &self,
        guild_id: u64,
        definition: MacroDefinition,
    ) -> Result<bool, MacroError> {
        {
            let mut cache = self.cache.write().await;
            let macros = cache.entry(guild_id).or_default();
            if macros.contains_key(&definition.name) {
                return Ok(false);
            }
            macros.insert(definition.name.clone(), definition);
        }
        self.persist().await?;
        Ok(true)
    }

    async fn remove(&self, guild_id: u64, name: &str) -> Result<bool, MacroError> {
        let existed = {
            let mut cache = self.cache.write().await;
            cache
                .get_mut(&guild_id)
                .map_or(false, |macros| macros.remove(name).is_some())
        };
        if existed {
            self.persist().await?;
        }
        Ok(existed)
    }

    async fn names(&self, guild_id: u64) -> Result<Vec<String>, MacroError> {
        let cache = self.cache.read().await;
        Ok(cache
            .get(&guild_id)
            .map(|macros| macros.keys().cloned().collect())
            .unwrap_or_default())
    }
}

// ============================================================================
// QUOTE STORE
// ============================================================================

pub struct JsonQuoteStore {
    path: PathBuf,
    cache: RwLock<Vec<Quote>>,
}

impl JsonQuoteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cache = if path.exists() {
            let file = std::fs::File::open(&path).expect("Failed to open quote store");
            let quotes: Vec<Quote> = serde_json::from_reader(file).unwrap_or_default();
            RwLock::new(quotes)
        } else {
            RwLock::new(Vec::new())
        };

        Self { path, cache }
    }

    async fn persist(&self) -> Result<(), QuoteError> {
        let cache = self.cache.read().await;
        let file = std::fs::File::create(&self.path)
            .map_err(|e| QuoteError::Storage(e.to_string()))?;
        serde_json::to_writer_pretty(file, &*cache)
            .map_err(|e| QuoteError::Storage(e.to_string()))
    }
}

#[async_trait]
impl QuoteStore for JsonQuoteStore {
    async fn all(&self) -> Result<Vec<Quote>, QuoteError> {
        let cache = self.cache.read().await;
        Ok(cache.clone())
    }

    async fn add(&self, quote: Quote) -> Result<(), QuoteError> {
        {
            let mut cache = self.cache.write().await;
            cache.push(quote);
        }
        self.persist().await
    }
}

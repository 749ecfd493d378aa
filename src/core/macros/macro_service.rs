// Per-guild text macros: short prefixed commands members register
// themselves (`!somemacro` plays back stored text or an attachment).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Names that collide with built-in prefix commands.
const RESERVED_NAMES: &[&str] = &["m", "now", "time", "help"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MacroDefinition {
    pub name: String,
    pub content: Option<String>,
    pub attachment_url: Option<String>,
}

#[derive(Debug, Error)]
pub enum MacroError {
    #[error("'{0}' is a reserved command name")]
    Reserved(String),

    #[error("A macro named '{0}' already exists")]
    AlreadyExists(String),

    #[error("No macro named '{0}' exists")]
    NotFound(String),

    #[error("A macro needs text content or an attachment")]
    Empty,

    #[error("Storage error: {0}")]
    Storage(String),
}

#[async_trait]
pub trait MacroStore: Send + Sync {
    async fn get(&self, guild_id: u64, name: &str)
        -> Result<Option<MacroDefinition>, MacroError>;

    /// Inserts a macro. Returns false when the name is already taken.
    async fn insert(&self, guild_id: u64, definition: MacroDefinition)
        -> Result<bool, MacroError>;

    /// Removes a macro. Returns false when no such macro exists.
    async fn remove(&self, guild_id: u64, name: &str) -> Result<bool, MacroError>;

    async fn names(&self, guild_id: u64) -> Result<Vec<String>, MacroError>;
}

/// Lowercases and strips the command prefix so `!Frag`, `frag` and
/// `Frag ` all mean the same macro.
pub fn normalize_name(raw: &str) -> String {
    raw.trim().trim_start_matches('!').to_lowercase()
}

pub struct MacroService<S: MacroStore> {
    store: Arc<S>,
}

impl<S: MacroStore> MacroService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn register(
        &self,
        guild_id: u64,
        name: &str,
        content: Option<String>,
        attachment_url: Option<String>,
    ) -> Result<MacroDefinition, MacroError> {
        let name = normalize_name(name);
        if name.is_empty() {
            return Err(MacroError::Empty);
        }
        if RESERVED_NAMES.contains(&name.as_str()) {
            return Err(MacroError::Reserved(name));
        }

        let content = content.filter(|c| !c.trim().is_empty());
        if content.is_none() && attachment_url.is_none() {
            return Err(MacroError::Empty);
        }

        let definition = MacroDefinition {
            name: name.clone(),
            content,
            attachment_url,
        };
        if !self.store.insert(guild_id, definition.clone()).await? {
            return Err(MacroError::AlreadyExists(name));
        }
        Ok(definition)
    }

    pub async fn remove(&self, guild_id: u64, name: &str) -> Result<(), MacroError> {
        let name = normalize_name(name);
        if self.store.remove(guild_id, &name).await? {
            Ok(())
        } else {
            Err(MacroError::NotFound(name))
        }
    }

    pub async fn lookup(
        &self,
        guild_id: u64,
        name: &str,
    ) -> Result<Option<MacroDefinition>, MacroError> {
        let name = normalize_name(name);
        if name.is_empty() || RESERVED_NAMES.contains(&name.as_str()) {
            return Ok(None);
        }
        self.store.get(guild_id, &name).await
    }

    pub async fn list(&self, guild_id: u64) -> Result<Vec<String>, MacroError> {
        let mut names = self.store.names(guild_id).await?;
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct MemoryMacroStore {
        macros: Mutex<HashMap<(u64, String), MacroDefinition>>,
    }

    #[async_trait]
    impl MacroStore for MemoryMacroStore {
        async fn get(
            &self,
            guild_id: u64,
            name: &str,
        ) -> Result<Option<MacroDefinition>, MacroError> {
            Ok(self
                .macros
                .lock()
                .await
                .get(&(guild_id, name.to_string()))
                .cloned())
        }

        async fn insert(
            &self,
            guild_id: u64,
            definition: MacroDefinition,
        ) -> Result<bool, MacroError> {
            let mut macros = self.macros.lock().await;
            let key = (guild_id, definition.name.clone());
            if macros.contains_key(&key) {
                return Ok(false);
            }
            macros.insert(key, definition);
            Ok(true)
        }

        async fn remove(&self, guild_id: u64, name: &str) -> Result<bool, MacroError> {
            Ok(self
                .macros
                .lock()
                .await
                .remove(&(guild_id, name.to_string()))
                .is_some())
        }

        async fn names(&self, guild_id: u64) -> Result<Vec<String>, MacroError> {
            Ok(self
                .macros
                .lock()
                .await
                .keys()
                .filter(|(g, _)| *g == guild_id)
                .map(|(_, name)| name.clone())
                .collect())
        }
    }

    fn service() -> MacroService<MemoryMacroStore> {
        MacroService::new(Arc::new(MemoryMacroStore::default()))
    }

    #[tokio::test]
    async fn registered_macros_can_be_looked_up() {
        let svc = service();
        svc.register(1, "Frag", Some("farm your frags".into()), None)
            .await
            .unwrap();

        let found = svc.lookup(1, "!FRAG").await.unwrap().unwrap();
        assert_eq!(found.content.as_deref(), Some("farm your frags"));

        // Macros are per guild.
        assert!(svc.lookup(2, "frag").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reserved_names_are_rejected() {
        let svc = service();
        let err = svc
            .register(1, "time", Some("nope".into()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, MacroError::Reserved(_)));
    }

    #[tokio::test]
    async fn duplicate_names_are_rejected() {
        let svc = service();
        svc.register(1, "frag", Some("v1".into()), None)
            .await
            .unwrap();
        let err = svc
            .register(1, "FRAG", Some("v2".into()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, MacroError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn empty_macros_are_rejected() {
        let svc = service();
        let err = svc.register(1, "frag", Some("   ".into()), None).await;
        assert!(matches!(err, Err(MacroError::Empty)));

        // An attachment alone is enough.
        svc.register(1, "frag", None, Some("https://cdn.example/frag.png".into()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn removal_requires_an_existing_macro() {
        let svc = service();
        assert!(matches!(
            svc.remove(1, "ghost").await,
            Err(MacroError::NotFound(_))
        ));

        svc.register(1, "frag", Some("x".into()), None)
            .await
            .unwrap();
        svc.remove(1, "frag").await.unwrap();
        assert!(svc.list(1).await.unwrap().is_empty());
    }
}

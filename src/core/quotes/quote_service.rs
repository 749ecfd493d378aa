// Guild quote board. Quotes are immortalized with `/addquote` and
// replayed at random with `/quote`.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Quote {
    pub message: String,
    pub user: String,
    pub year: i32,
}

#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("Quotes cannot be empty")]
    Empty,

    #[error("No quotes have been saved yet")]
    NoQuotes,

    #[error("Storage error: {0}")]
    Storage(String),
}

#[async_trait]
pub trait QuoteStore: Send + Sync {
    async fn all(&self) -> Result<Vec<Quote>, QuoteError>;
    async fn add(&self, quote: Quote) -> Result<(), QuoteError>;
}

pub struct QuoteService<S: QuoteStore> {
    store: Arc<S>,
}

impl<S: QuoteStore> QuoteService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn add_quote(
        &self,
        message: &str,
        user: &str,
        now: DateTime<Utc>,
    ) -> Result<Quote, QuoteError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(QuoteError::Empty);
        }
        let quote = Quote {
            message: message.to_string(),
            user: user.to_string(),
            year: now.year(),
        };
        self.store.add(quote.clone()).await?;
        Ok(quote)
    }

    pub async fn random(&self) -> Result<Quote, QuoteError> {
        let quotes = self.store.all().await?;
        quotes
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or(QuoteError::NoQuotes)
    }
}

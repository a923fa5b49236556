//! In-memory asset and wallet registries.
//!
//! These are the canonical tables the driving application owns and injects
//! into the engine; the domain entities themselves hold no global state.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::domain::asset::Asset;
use crate::domain::error::MoneybinError;
use crate::domain::wallet::Wallet;

/// Assets keyed by code. Entities are created lazily on first pricing, since
/// an [`Asset`] cannot exist without a positive price; display names may be
/// registered up front.
#[derive(Debug, Default)]
pub struct AssetRegistry {
    assets: HashMap<String, Asset>,
    names: HashMap<String, String>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a display name used when the asset is first observed.
    pub fn register_name(&mut self, code: &str, name: &str) {
        self.names.insert(code.to_string(), name.to_string());
    }

    /// Create or update the entity for a newly observed price.
    pub fn observe_price(
        &mut self,
        code: &str,
        price: f64,
        at: DateTime<Utc>,
    ) -> Result<(), MoneybinError> {
        match self.assets.get_mut(code) {
            Some(asset) => asset.update_price_at(price, at),
            None => {
                let name = self.names.get(code).cloned();
                let asset = Asset::new(code, name.as_deref().unwrap_or(code), price, at)?;
                self.assets.insert(code.to_string(), asset);
                Ok(())
            }
        }
    }

    pub fn get(&self, code: &str) -> Option<&Asset> {
        self.assets.get(code)
    }

    pub fn get_mut(&mut self, code: &str) -> Option<&mut Asset> {
        self.assets.get_mut(code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.assets.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Codes in sorted order, for deterministic reporting.
    pub fn codes(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = self.assets.keys().map(String::as_str).collect();
        codes.sort_unstable();
        codes
    }
}

/// Wallets keyed by id.
#[derive(Debug, Default)]
pub struct WalletRegistry {
    wallets: HashMap<u32, Wallet>,
}

impl WalletRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, wallet: Wallet) {
        self.wallets.insert(wallet.id, wallet);
    }

    pub fn get(&self, id: u32) -> Option<&Wallet> {
        self.wallets.get(&id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Wallet> {
        self.wallets.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.wallets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
    }

    /// Wallet ids in sorted order, for deterministic reporting.
    pub fn ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.wallets.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = &Wallet> {
        self.wallets.values()
    }

    /// Transfer an asset quantity between two registered wallets. Either both
    /// sides see the full movement or neither sees anything.
    pub fn transfer(
        &mut self,
        from_id: u32,
        to_id: u32,
        asset: &str,
        quantity: f64,
    ) -> Result<(), MoneybinError> {
        if from_id == to_id {
            return Err(MoneybinError::InvalidInput {
                reason: format!("transfer within wallet {}", from_id),
            });
        }
        if !self.wallets.contains_key(&to_id) {
            return Err(MoneybinError::WalletNotFound { wallet_id: to_id });
        }

        // Detach the source so both sides can be borrowed mutably; it goes
        // back whatever happens below.
        let mut source = match self.wallets.remove(&from_id) {
            Some(wallet) => wallet,
            None => return Err(MoneybinError::WalletNotFound { wallet_id: from_id }),
        };
        let result = match self.wallets.get_mut(&to_id) {
            Some(destination) => source.transfer(asset, quantity, destination),
            None => Err(MoneybinError::WalletNotFound { wallet_id: to_id }),
        };
        self.wallets.insert(from_id, source);
        result
    }
}

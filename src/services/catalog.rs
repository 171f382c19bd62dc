//! Fixed set of tracked assets.
//!
//! The catalog is a value handed to the acquisition client, the handlers and
//! the statistics engine, so none of them branch on specific coins.

use serde::{Serialize, Serializer};

use crate::error::AppError;

/// CoinGecko coin ids tracked by this service
pub const TRACKED_ASSETS: [&str; 3] = ["bitcoin", "matic-network", "ethereum"];

/// Identifier of a catalog asset. Only the catalog hands these out.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(&'static str);

impl AssetId {
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

impl Serialize for AssetId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Catalog {
    assets: Vec<AssetId>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::tracked()
    }
}

impl Catalog {
    pub fn tracked() -> Self {
        Self {
            assets: TRACKED_ASSETS.into_iter().map(AssetId).collect(),
        }
    }

    pub fn assets(&self) -> &[AssetId] {
        &self.assets
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Comma separated ids, as CoinGecko expects them in `ids=`
    pub fn joined_ids(&self) -> String {
        self.assets
            .iter()
            .map(AssetId::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Map a raw identifier onto a catalog asset, rejecting anything else
    pub fn resolve(&self, raw: &str) -> Result<AssetId, AppError> {
        self.assets
            .iter()
            .find(|asset| asset.as_str() == raw)
            .cloned()
            .ok_or_else(|| AppError::InvalidAsset(raw.to_string()))
    }
}

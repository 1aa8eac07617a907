//! Market prices
//!
//! The analyzer only sees the `PriceOracle` trait. Price retrieval itself is
//! external: prices arrive as a JSON sheet keyed by material name, either
//! `{"Name": {"buy": 1.0, "sell": 2.0}}` or `{"Name": 2.0}` (sell only).

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::catalog::FormulaCatalog;
use crate::error::{CatalogError, PriceError};
use crate::models::MaterialId;

/// Source of current unit sell prices
pub trait PriceOracle {
    /// Unit sell price, `None` when the market has no usable price
    fn price_of(&self, material: MaterialId) -> Option<f64>;
}

impl<O: PriceOracle + ?Sized> PriceOracle for &O {
    fn price_of(&self, material: MaterialId) -> Option<f64> {
        (**self).price_of(material)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceInfo {
    pub buy: Option<f64>,
    pub sell: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PriceEntry {
    Full {
        #[serde(default)]
        buy: Option<f64>,
        #[serde(default)]
        sell: Option<f64>,
    },
    Sell(f64),
}

impl From<PriceEntry> for PriceInfo {
    fn from(entry: PriceEntry) -> Self {
        match entry {
            PriceEntry::Full { buy, sell } => PriceInfo { buy, sell },
            PriceEntry::Sell(sell) => PriceInfo {
                buy: None,
                sell: Some(sell),
            },
        }
    }
}

/// A zero, negative or non-finite quote means nobody is trading
fn usable(price: Option<f64>) -> Option<f64> {
    price.filter(|p| p.is_finite() && *p > 0.0)
}

/// Static price sheet keyed by material id
#[derive(Debug, Clone, Default)]
pub struct PriceTable {
    prices: BTreeMap<MaterialId, PriceInfo>,
}

impl PriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a price sheet, resolving names through the catalog
    pub fn from_json(json: &str, catalog: &FormulaCatalog) -> Result<Self, PriceError> {
        let sheet: BTreeMap<String, PriceEntry> = serde_json::from_str(json)?;
        let mut table = PriceTable::new();

        for (name, entry) in sheet {
            match catalog.material_id(&name) {
                Ok(Some(material)) => {
                    table.prices.insert(material, entry.into());
                }
                Ok(None) => warn!(material = %name, "price for unknown material ignored"),
                Err(e) => warn!(material = %name, error = %e, "price lookup failed"),
            }
        }

        debug!(prices = table.prices.len(), "loaded price sheet");
        Ok(table)
    }

    pub fn from_file(path: &Path, catalog: &FormulaCatalog) -> Result<Self, PriceError> {
        let json = std::fs::read_to_string(path).map_err(|source| PriceError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json, catalog)
    }

    pub fn set_sell(&mut self, material: MaterialId, sell: f64) {
        self.prices.entry(material).or_insert(PriceInfo { buy: None, sell: None }).sell = Some(sell);
    }

    pub fn get(&self, material: MaterialId) -> Option<&PriceInfo> {
        self.prices.get(&material)
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Material names of the catalog with no usable sell price
    pub fn missing(&self, catalog: &FormulaCatalog) -> Result<Vec<String>, CatalogError> {
        let mut missing = Vec::new();
        for name in catalog.all_material_names()? {
            let priced = catalog
                .material_id(&name)?
                .and_then(|id| self.price_of(id))
                .is_some();
            if !priced {
                missing.push(name);
            }
        }
        Ok(missing)
    }
}

impl FromIterator<(MaterialId, f64)> for PriceTable {
    fn from_iter<I: IntoIterator<Item = (MaterialId, f64)>>(iter: I) -> Self {
        let mut table = PriceTable::new();
        for (material, sell) in iter {
            table.set_sell(material, sell);
        }
        table
    }
}

impl PriceOracle for PriceTable {
    fn price_of(&self, material: MaterialId) -> Option<f64> {
        usable(self.get(material).and_then(|p| p.sell))
    }
}

/// Memoizes another oracle, at most one lookup per material
pub struct CachedOracle<O> {
    inner: O,
    cache: Mutex<HashMap<MaterialId, Option<f64>>>,
}

impl<O: PriceOracle> CachedOracle<O> {
    pub fn new(inner: O) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Fill the cache ahead of an analysis
    pub fn prewarm(&self, materials: impl IntoIterator<Item = MaterialId>) {
        for material in materials {
            self.price_of(material);
        }
    }

    pub fn cached(&self) -> usize {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl<O: PriceOracle> PriceOracle for CachedOracle<O> {
    fn price_of(&self, material: MaterialId) -> Option<f64> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        *cache
            .entry(material)
            .or_insert_with(|| usable(self.inner.price_of(material)))
    }
}

//! Site inventory: the sites a player holds and the materials they yield

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::InventoryError;
use crate::models::{MaterialId, SiteComposition};
use crate::ores::{BATCH_SIZE, OreTable};

/// Point-in-time holdings: material -> absolute quantity
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Inventory {
    holdings: BTreeMap<MaterialId, f64>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Quantity held, 0 when the material is not held at all
    pub fn get(&self, material: MaterialId) -> f64 {
        self.holdings.get(&material).copied().unwrap_or(0.0)
    }

    pub fn holds(&self, material: MaterialId) -> bool {
        self.get(material) > 0.0
    }

    pub fn add(&mut self, material: MaterialId, quantity: f64) {
        *self.holdings.entry(material).or_default() += quantity;
    }

    pub fn materials(&self) -> impl Iterator<Item = MaterialId> + '_ {
        self.holdings.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MaterialId, f64)> + '_ {
        self.holdings.iter().map(|(m, q)| (*m, *q))
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.holdings.len()
    }
}

impl FromIterator<(MaterialId, f64)> for Inventory {
    fn from_iter<I: IntoIterator<Item = (MaterialId, f64)>>(iter: I) -> Self {
        let mut inventory = Inventory::new();
        for (material, quantity) in iter {
            inventory.add(material, quantity);
        }
        inventory
    }
}

/// The sites currently held, in the order they were added
pub struct SiteInventory {
    sites: Vec<SiteComposition>,
    ores: OreTable,
    /// Ore units one site produces per extraction
    site_yield: f64,
}

impl SiteInventory {
    pub fn new(ores: OreTable, site_yield: f64) -> Self {
        Self {
            sites: Vec::new(),
            ores,
            site_yield,
        }
    }

    /// Add a site unless one with the same name is already held
    pub fn add_site(&mut self, site: SiteComposition) -> bool {
        if self.sites.iter().any(|s| s.name == site.name) {
            warn!(site = %site.name, "site already held, skipped");
            return false;
        }
        debug!(site = %site.name, ores = site.ores.len(), "added site");
        self.sites.push(site);
        true
    }

    /// Add several sites, returning how many were actually added
    pub fn add_sites(&mut self, sites: impl IntoIterator<Item = SiteComposition>) -> usize {
        let mut added = 0;
        for site in sites {
            if self.add_site(site) {
                added += 1;
            }
        }
        added
    }

    pub fn remove_site(&mut self, index: usize) -> Result<SiteComposition, InventoryError> {
        if index >= self.sites.len() {
            return Err(InventoryError::IndexOutOfRange {
                index,
                len: self.sites.len(),
            });
        }
        Ok(self.sites.remove(index))
    }

    pub fn list(&self) -> &[SiteComposition] {
        &self.sites
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Scanned ore names across all sites, sorted
    pub fn unique_materials(&self) -> BTreeSet<String> {
        self.sites
            .iter()
            .flat_map(|site| site.ores.iter().map(|ore| ore.name.clone()))
            .collect()
    }

    /// Rebuild holdings from every held site
    pub fn snapshot(&self) -> Inventory {
        let batches_per_site = self.site_yield / BATCH_SIZE;
        let mut inventory = Inventory::new();

        for site in &self.sites {
            for share in &site.ores {
                for y in self.ores.yields(&share.ore) {
                    inventory.add(y.material, share.fraction * batches_per_site * y.units_per_batch);
                }
            }
        }
        inventory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OreShare;
    use crate::ores::OreYield;

    const X: MaterialId = MaterialId(1);
    const Z: MaterialId = MaterialId(3);

    fn ore_table() -> OreTable {
        OreTable::from_entries([
            (
                "Xite".to_string(),
                vec![OreYield {
                    material: X,
                    name: "X".into(),
                    units_per_batch: 50.0,
                }],
            ),
            (
                "Zite".to_string(),
                vec![
                    OreYield {
                        material: X,
                        name: "X".into(),
                        units_per_batch: 10.0,
                    },
                    OreYield {
                        material: Z,
                        name: "Z".into(),
                        units_per_batch: 20.0,
                    },
                ],
            ),
        ])
    }

    fn site(name: &str, ores: &[(&str, f64)]) -> SiteComposition {
        SiteComposition {
            name: name.to_string(),
            ores: ores
                .iter()
                .map(|(ore, fraction)| OreShare {
                    name: format!("Glossy {}", ore),
                    ore: ore.to_string(),
                    fraction: *fraction,
                    ore_type_id: 0,
                    system_id: 0,
                    planet_id: 0,
                    site_id: 0,
                })
                .collect(),
        }
    }

    #[test]
    fn test_snapshot_scales_by_site_yield() {
        let mut sites = SiteInventory::new(ore_table(), 1000.0);
        sites.add_site(site("A", &[("Xite", 0.5), ("Zite", 0.25)]));

        let inventory = sites.snapshot();
        // 0.5 * 10 batches * 50 + 0.25 * 10 * 10
        assert_eq!(inventory.get(X), 275.0);
        assert_eq!(inventory.get(Z), 50.0);
        assert_eq!(inventory.get(MaterialId(99)), 0.0);
    }

    #[test]
    fn test_snapshot_recomputed_after_mutation() {
        let mut sites = SiteInventory::new(ore_table(), 1000.0);
        sites.add_sites([site("A", &[("Xite", 0.5)]), site("B", &[("Xite", 0.5)])]);

        let before = sites.snapshot();
        assert_eq!(before.get(X), 500.0);

        sites.remove_site(0).unwrap();
        assert_eq!(sites.snapshot().get(X), 250.0);
        // Earlier snapshot is unaffected
        assert_eq!(before.get(X), 500.0);
    }

    #[test]
    fn test_duplicate_site_names_skipped() {
        let mut sites = SiteInventory::new(ore_table(), 1000.0);
        let added = sites.add_sites([site("A", &[("Xite", 0.5)]), site("A", &[("Xite", 0.5)])]);
        assert_eq!(added, 1);
        assert_eq!(sites.list().len(), 1);
        assert_eq!(sites.snapshot().get(X), 250.0);
    }

    #[test]
    fn test_remove_out_of_range() {
        let mut sites = SiteInventory::new(ore_table(), 1000.0);
        sites.add_site(site("A", &[("Xite", 0.5)]));
        assert_eq!(
            sites.remove_site(1),
            Err(InventoryError::IndexOutOfRange { index: 1, len: 1 })
        );
    }

    #[test]
    fn test_unique_materials_sorted() {
        let mut sites = SiteInventory::new(ore_table(), 1000.0);
        sites.add_sites([
            site("A", &[("Zite", 0.5), ("Xite", 0.1)]),
            site("B", &[("Xite", 0.5)]),
        ]);
        let names: Vec<_> = sites.unique_materials().into_iter().collect();
        assert_eq!(names, ["Glossy Xite", "Glossy Zite"]);
    }

    #[test]
    fn test_unknown_ore_contributes_nothing() {
        let mut sites = SiteInventory::new(ore_table(), 1000.0);
        sites.add_site(site("A", &[("Veldspar", 1.0)]));
        assert!(sites.snapshot().is_empty());
    }
}

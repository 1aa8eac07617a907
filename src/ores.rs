//! Ore lookup table: scanned ore names to reaction materials

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;
use tracing::debug;

use crate::catalog::FormulaCatalog;
use crate::error::CatalogError;
use crate::models::MaterialId;

/// Ore units per reprocessing batch
pub const BATCH_SIZE: f64 = 100.0;

#[derive(Debug, Deserialize)]
struct OreMappingsFile {
    #[serde(rename = "R4_Ubiquitous")]
    r4: BTreeMap<String, BTreeMap<String, f64>>,
    #[serde(rename = "R8_Common")]
    r8: BTreeMap<String, BTreeMap<String, f64>>,
    #[serde(rename = "R16_Uncommon")]
    r16: BTreeMap<String, BTreeMap<String, f64>>,
    #[serde(rename = "R32_Rare")]
    r32: BTreeMap<String, BTreeMap<String, f64>>,
    #[serde(rename = "R64_Exceptional")]
    r64: BTreeMap<String, BTreeMap<String, f64>>,
}

/// Known ore variant prefixes, stripped to get the base ore name
const ORE_PREFIXES: &[&str] = &[
    "Bountiful ",
    "Brilliant ",
    "Copious ",
    "Dazzling ",
    "Flawless ",
    "Gilded ",
    "Glossy ",
    "Immaculate ",
    "Lavish ",
    "Lustrous ",
    "Opulent ",
    "Pellucid ",
    "Platelet ",
    "Plentiful ",
    "Prismatic ",
    "Radiant ",
    "Replete ",
    "Resplendent ",
    "Shimmering ",
    "Sparkling ",
    "Stable ",
    "Twinkling ",
];

#[derive(Debug, Clone, PartialEq)]
pub struct OreYield {
    pub material: MaterialId,
    pub name: String,
    /// Units of material per `BATCH_SIZE` ore units
    pub units_per_batch: f64,
}

#[derive(Debug, Clone, Default)]
pub struct OreTable {
    ores: BTreeMap<String, Vec<OreYield>>,
}

impl OreTable {
    /// Load the bundled table, keeping only materials the catalog knows about
    pub fn bundled(catalog: &FormulaCatalog) -> Result<Self, CatalogError> {
        Self::from_json(include_str!("../data/ore_mappings.json"), catalog)
    }

    pub fn from_json(json: &str, catalog: &FormulaCatalog) -> Result<Self, CatalogError> {
        let file: OreMappingsFile = serde_json::from_str(json)?;

        let mut ores = BTreeMap::new();
        for tier in [file.r4, file.r8, file.r16, file.r32, file.r64] {
            for (ore_name, materials) in tier {
                let mut yields = Vec::new();
                for (name, units) in materials {
                    // Plain minerals are not reaction inputs
                    if let Some(material) = catalog.material_id(&name)? {
                        yields.push(OreYield {
                            material,
                            name,
                            units_per_batch: units,
                        });
                    }
                }
                ores.insert(ore_name, yields);
            }
        }

        debug!(ores = ores.len(), "loaded ore table");
        Ok(Self { ores })
    }

    /// Build a table directly from `(ore, yields)` pairs
    pub fn from_entries(entries: impl IntoIterator<Item = (String, Vec<OreYield>)>) -> Self {
        Self {
            ores: entries.into_iter().collect(),
        }
    }

    /// Strip a variant prefix from an ore name to get the base ore
    pub fn base_ore_name(ore_name: &str) -> &str {
        ORE_PREFIXES
            .iter()
            .find_map(|prefix| ore_name.strip_prefix(prefix))
            .unwrap_or(ore_name)
    }

    /// Base ore for a scanned name, if the table knows it
    pub fn recognize<'a>(&self, ore_name: &'a str) -> Option<&'a str> {
        let base = Self::base_ore_name(ore_name);
        self.ores.contains_key(base).then_some(base)
    }

    pub fn yields(&self, base_ore: &str) -> &[OreYield] {
        self.ores.get(base_ore).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Materials obtainable from any of the given scanned ore names
    pub fn ores_to_materials<S: AsRef<str>>(&self, ore_names: &[S]) -> BTreeSet<MaterialId> {
        ore_names
            .iter()
            .flat_map(|name| self.yields(Self::base_ore_name(name.as_ref())))
            .map(|y| y.material)
            .collect()
    }
}

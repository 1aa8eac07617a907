//! Formula catalog: the read-only knowledge base of reactions
//!
//! Formulas are loaded once into an in-memory SQLite store. Every query
//! returns formulas in load order so rankings and displays are reproducible.

use std::path::Path;

use rusqlite::Connection;
use tracing::debug;

use crate::db;
use crate::error::CatalogError;
use crate::models::{Formula, MaterialId, MaterialQuantity};

pub struct FormulaCatalog {
    conn: Connection,
}

impl FormulaCatalog {
    /// Load the reaction formulas bundled with the binary
    pub fn bundled() -> Result<Self, CatalogError> {
        Self::from_json(include_str!("../data/reactions.json"))
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let formulas: Vec<Formula> = serde_json::from_str(json)?;
        Self::from_formulas(formulas)
    }

    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn from_formulas(formulas: Vec<Formula>) -> Result<Self, CatalogError> {
        let conn = Connection::open_in_memory()?;
        db::init_schema(&conn)?;
        let catalog = Self { conn };

        for formula in &formulas {
            validate_quantities(formula)?;
            if db::get_formula(&catalog.conn, formula.id)?.is_some() {
                return Err(CatalogError::DuplicateFormula(formula.id));
            }
            catalog.register_material(&formula.output)?;
            for input in &formula.inputs {
                catalog.register_material(input)?;
            }
            db::insert_formula(&catalog.conn, formula)?;
        }

        debug!(formulas = formulas.len(), "loaded formula catalog");
        Ok(catalog)
    }

    fn register_material(&self, item: &MaterialQuantity) -> Result<(), CatalogError> {
        match db::material_id(&self.conn, &item.name)? {
            Some(existing) if existing != item.material => Err(CatalogError::ConflictingId {
                name: item.name.clone(),
                first: existing,
                second: item.material,
            }),
            Some(_) => Ok(()),
            None => match db::material_name(&self.conn, item.material)? {
                Some(first) => Err(CatalogError::ConflictingName {
                    material: item.material,
                    first,
                    second: item.name.clone(),
                }),
                None => Ok(db::insert_material(&self.conn, item.material, &item.name)?),
            },
        }
    }

    pub fn all_formulas(&self) -> Result<Vec<Formula>, CatalogError> {
        Ok(db::list_formulas(&self.conn)?)
    }

    pub fn formulas_producing(&self, material: MaterialId) -> Result<Vec<Formula>, CatalogError> {
        Ok(db::get_producers(&self.conn, material)?)
    }

    pub fn formula(&self, formula_id: u32) -> Result<Option<Formula>, CatalogError> {
        Ok(db::get_formula(&self.conn, formula_id)?)
    }

    pub fn material_id(&self, name: &str) -> Result<Option<MaterialId>, CatalogError> {
        Ok(db::material_id(&self.conn, name)?)
    }

    pub fn material_name(&self, material: MaterialId) -> Result<Option<String>, CatalogError> {
        Ok(db::material_name(&self.conn, material)?)
    }

    /// Every material a price sheet should cover, sorted by name
    pub fn all_material_names(&self) -> Result<Vec<String>, CatalogError> {
        Ok(db::list_material_names(&self.conn)?)
    }
}

/// Outputs must be positive and inputs non-negative, all finite
fn validate_quantities(formula: &Formula) -> Result<(), CatalogError> {
    let invalid = |reason: String| CatalogError::Invalid {
        formula: formula.name.clone(),
        reason,
    };

    let output = formula.output.quantity;
    if !(output.is_finite() && output > 0.0) {
        return Err(invalid(format!("output quantity {} must be positive", output)));
    }
    for input in &formula.inputs {
        if !(input.quantity.is_finite() && input.quantity >= 0.0) {
            return Err(invalid(format!(
                "input {} quantity {} must be non-negative",
                input.name, input.quantity
            )));
        }
    }
    Ok(())
}

//! Error types

use thiserror::Error;

use crate::models::MaterialId;

/// Survey text that cannot be turned into site compositions
#[derive(Debug, Error)]
pub enum SurveyError {
    #[error("Malformed survey at line {line} ({text:?}): {reason}")]
    Malformed {
        line: usize,
        text: String,
        reason: String,
    },

    #[error("Failed to read survey {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Non-fatal issues found while parsing a survey
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SurveyWarning {
    #[error("Unknown ore {name:?} at line {line}, skipped")]
    UnknownOre { line: usize, name: String },
}

#[derive(Debug, Error, PartialEq)]
pub enum InventoryError {
    #[error("Site index {index} out of range ({len} sites held)")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Why a single formula could not be evaluated
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ResolveError {
    #[error("No market price for {name} ({material})")]
    PriceUnavailable { material: MaterialId, name: String },

    #[error("No source for {name} ({material}): not held, not priced, no usable reaction")]
    UnresolvableInput { material: MaterialId, name: String },
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to parse catalog: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Catalog store error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to read catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Material {name:?} has conflicting ids {first} and {second}")]
    ConflictingId {
        name: String,
        first: MaterialId,
        second: MaterialId,
    },

    #[error("Material id {material} is named both {first:?} and {second:?}")]
    ConflictingName {
        material: MaterialId,
        first: String,
        second: String,
    },

    #[error("Formula id {0} appears more than once")]
    DuplicateFormula(u32),

    #[error("Invalid formula {formula:?}: {reason}")]
    Invalid { formula: String, reason: String },
}

#[derive(Debug, Error)]
pub enum PriceError {
    #[error("Failed to read price sheet {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse price sheet: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

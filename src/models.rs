//! Data models for surveys, reaction formulas and profit trees

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable material identifier (the in-game type id)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaterialId(pub u32);

impl fmt::Display for MaterialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialQuantity {
    #[serde(rename = "id")]
    pub material: MaterialId,
    pub name: String,
    pub quantity: f64,
}

/// One ore line of a survey block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OreShare {
    /// Name as scanned, variant prefix included
    pub name: String,
    /// Base ore used for the yield lookup
    pub ore: String,
    /// Share of the site's total yield, 0.0 - 1.0
    pub fraction: f64,
    pub ore_type_id: u32,
    pub system_id: u32,
    pub planet_id: u32,
    pub site_id: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteComposition {
    pub name: String,
    pub ores: Vec<OreShare>,
}

/// A conversion recipe: N inputs -> 1 output, fixed per-run quantities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Formula {
    #[serde(rename = "formula_id")]
    pub id: u32,
    #[serde(rename = "formula_name")]
    pub name: String,
    pub output: MaterialQuantity,
    pub inputs: Vec<MaterialQuantity>,
}

/// How a quantity of material was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceType {
    FromHoldings,
    Purchased,
    ProducedByReaction,
    FinalOutput,
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SourceType::FromHoldings => "HOLD",
            SourceType::Purchased => "BUY",
            SourceType::ProducedByReaction => "REACT",
            SourceType::FinalOutput => "OUTPUT",
        };
        f.write_str(label)
    }
}

/// A node in a sourcing tree. Each node owns its children outright.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcingNode {
    pub source: SourceType,
    pub material: MaterialId,
    pub name: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub total_price: f64,
    /// Part of a holdings leaf that has to be bought because holdings run short
    #[serde(default, skip_serializing_if = "is_zero")]
    pub shortfall: f64,
    /// Formula that produces this node (reaction and output nodes only)
    pub formula: Option<String>,
    pub children: Vec<SourcingNode>,
}

fn is_zero(v: &f64) -> bool {
    *v == 0.0
}

impl SourcingNode {
    pub fn leaf(source: SourceType, material: MaterialId, name: &str, quantity: f64, unit_price: f64) -> Self {
        Self {
            source,
            material,
            name: name.to_string(),
            quantity,
            unit_price,
            total_price: unit_price * quantity,
            shortfall: 0.0,
            formula: None,
            children: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// True if any leaf below (or at) this node is sourced from holdings
    pub fn uses_holdings(&self) -> bool {
        if self.is_leaf() {
            return self.source == SourceType::FromHoldings;
        }
        self.children.iter().any(SourcingNode::uses_holdings)
    }

    /// Visit every node depth-first, parents before children
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a SourcingNode, usize)) {
        self.walk_at(0, visit);
    }

    fn walk_at<'a>(&'a self, depth: usize, visit: &mut impl FnMut(&'a SourcingNode, usize)) {
        visit(self, depth);
        for child in &self.children {
            child.walk_at(depth + 1, visit);
        }
    }
}

/// One evaluated top-level formula
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionProfit {
    pub formula_id: u32,
    pub formula_name: String,
    pub output_id: MaterialId,
    pub output_name: String,
    pub output_quantity: f64,
    pub output_unit_price: f64,
    pub output_value: f64,
    /// Total opportunity cost of all inputs
    pub input_cost: f64,
    pub profit: f64,
    /// Profit as a percentage of output value
    pub margin: f64,
    pub uses_user_materials: bool,
    pub tree: SourcingNode,
}

impl ReactionProfit {
    pub fn margin_of(profit: f64, value: f64) -> f64 {
        if value > 0.0 { profit / value * 100.0 } else { 0.0 }
    }
}

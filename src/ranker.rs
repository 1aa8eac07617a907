//! Result ranking and filtering

use std::cmp::Ordering;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::models::ReactionProfit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    OutputName,
    OutputQuantity,
    InputCost,
    OutputValue,
    Profit,
    Margin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[serde(alias = "asc")]
    #[value(alias = "asc")]
    Ascending,
    #[serde(alias = "desc")]
    #[value(alias = "desc")]
    Descending,
}

type Comparator = fn(&ReactionProfit, &ReactionProfit) -> Ordering;

fn comparator(key: SortKey) -> Comparator {
    match key {
        SortKey::OutputName => |a, b| a.output_name.cmp(&b.output_name),
        SortKey::OutputQuantity => |a, b| a.output_quantity.total_cmp(&b.output_quantity),
        SortKey::InputCost => |a, b| a.input_cost.total_cmp(&b.input_cost),
        SortKey::OutputValue => |a, b| a.output_value.total_cmp(&b.output_value),
        SortKey::Profit => |a, b| a.profit.total_cmp(&b.profit),
        SortKey::Margin => |a, b| a.margin.total_cmp(&b.margin),
    }
}

/// Sort by one field. Stable: ties keep their incoming (catalog) order.
pub fn rank(profits: &[ReactionProfit], key: SortKey, direction: Direction) -> Vec<ReactionProfit> {
    let compare = comparator(key);
    let mut ranked = profits.to_vec();
    match direction {
        Direction::Ascending => ranked.sort_by(compare),
        Direction::Descending => ranked.sort_by(|a, b| compare(b, a)),
    }
    ranked
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RankFilter {
    /// Drop rows with profit <= 0
    pub profitable_only: bool,
    /// Drop rows that use nothing from holdings
    pub holdings_only: bool,
    pub limit: Option<usize>,
}

impl RankFilter {
    pub fn apply(&self, profits: Vec<ReactionProfit>) -> Vec<ReactionProfit> {
        profits
            .into_iter()
            .filter(|p| !self.profitable_only || p.profit > 0.0)
            .filter(|p| !self.holdings_only || p.uses_user_materials)
            .take(self.limit.unwrap_or(usize::MAX))
            .collect()
    }
}

//! Reaction profit calculator logic
//!
//! Every catalog formula is evaluated as a top-level candidate. Each input is
//! resolved to its cheapest source: holdings (priced at what they would sell
//! for), a market purchase, or a nested reaction. Formula ids already on the
//! current path are skipped, so cycles in the formula graph terminate.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use tracing::{debug, info};

use crate::catalog::FormulaCatalog;
use crate::config::AnalysisConfig;
use crate::error::{CatalogError, ResolveError};
use crate::inventory::Inventory;
use crate::models::{Formula, MaterialId, MaterialQuantity, ReactionProfit, SourceType, SourcingNode};
use crate::prices::PriceOracle;

/// A formula left out of the results, and why
#[derive(Debug, Clone, PartialEq)]
pub struct Exclusion {
    pub formula_id: u32,
    pub formula_name: String,
    pub reason: ResolveError,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisReport {
    /// One row per evaluated formula, in catalog order
    pub profits: Vec<ReactionProfit>,
    pub excluded: Vec<Exclusion>,
}

pub struct Analyzer<'a, P: PriceOracle> {
    formulas: Vec<Formula>,
    producers: HashMap<MaterialId, Vec<Formula>>,
    inventory: &'a Inventory,
    prices: &'a P,
    runs: f64,
    max_depth: usize,
}

impl<'a, P: PriceOracle> Analyzer<'a, P> {
    pub fn new(
        catalog: &FormulaCatalog,
        inventory: &'a Inventory,
        prices: &'a P,
        config: &AnalysisConfig,
    ) -> Result<Self, CatalogError> {
        let formulas = catalog.all_formulas()?;

        let mut producers = HashMap::new();
        for formula in &formulas {
            let output = formula.output.material;
            if !producers.contains_key(&output) {
                producers.insert(output, catalog.formulas_producing(output)?);
            }
        }

        Ok(Self {
            formulas,
            producers,
            inventory,
            prices,
            runs: config.runs,
            max_depth: config.max_depth,
        })
    }

    /// Evaluate every formula. Unresolvable formulas are excluded, never fatal.
    pub fn run(&self) -> AnalysisReport {
        let mut report = AnalysisReport::default();

        for formula in &self.formulas {
            match self.evaluate_top_level(formula) {
                Ok(profit) => report.profits.push(profit),
                Err(reason) => {
                    debug!(formula = %formula.name, %reason, "formula excluded");
                    report.excluded.push(Exclusion {
                        formula_id: formula.id,
                        formula_name: formula.name.clone(),
                        reason,
                    });
                }
            }
        }

        info!(
            evaluated = report.profits.len(),
            excluded = report.excluded.len(),
            "analysis complete"
        );
        report
    }

    pub fn evaluate_top_level(&self, formula: &Formula) -> Result<ReactionProfit, ResolveError> {
        let output = &formula.output;
        let unit_price = self
            .prices
            .price_of(output.material)
            .ok_or_else(|| price_unavailable(output))?;

        let quantity = output.quantity * self.runs;
        let visited = BTreeSet::from([formula.id]);
        let children = self.resolve_inputs(formula, quantity, &visited, 1)?;

        let input_cost: f64 = children.iter().map(|c| c.total_price).sum();
        let output_value = unit_price * quantity;
        let profit = output_value - input_cost;

        let tree = SourcingNode {
            source: SourceType::FinalOutput,
            material: output.material,
            name: output.name.clone(),
            quantity,
            unit_price,
            total_price: output_value,
            shortfall: 0.0,
            formula: Some(formula.name.clone()),
            children,
        };

        Ok(ReactionProfit {
            formula_id: formula.id,
            formula_name: formula.name.clone(),
            output_id: output.material,
            output_name: output.name.clone(),
            output_quantity: quantity,
            output_unit_price: unit_price,
            output_value,
            input_cost,
            profit,
            margin: ReactionProfit::margin_of(profit, output_value),
            uses_user_materials: tree.uses_holdings(),
            tree,
        })
    }

    /// Resolve every input of `formula` for `output_quantity` units of output
    fn resolve_inputs(
        &self,
        formula: &Formula,
        output_quantity: f64,
        visited: &BTreeSet<u32>,
        depth: usize,
    ) -> Result<Vec<SourcingNode>, ResolveError> {
        let scale = output_quantity / formula.output.quantity;
        formula
            .inputs
            .iter()
            .map(|input| self.resolve_material(input, input.quantity * scale, visited, depth))
            .collect()
    }

    /// Cheapest way to obtain `required` units. Ties prefer holdings, then a
    /// reaction, then a purchase.
    pub fn resolve_material(
        &self,
        item: &MaterialQuantity,
        required: f64,
        visited: &BTreeSet<u32>,
        depth: usize,
    ) -> Result<SourcingNode, ResolveError> {
        let price = self.prices.price_of(item.material);
        let held = self.inventory.get(item.material);
        let mut best: Option<SourcingNode> = None;
        let mut failure: Option<ResolveError> = None;

        if let Some(price) = price.filter(|_| held > 0.0) {
            let mut node = SourcingNode::leaf(SourceType::FromHoldings, item.material, &item.name, required, price);
            node.shortfall = (required - held).max(0.0);
            best = Some(node);
        }

        if depth < self.max_depth {
            for formula in self.producers_of(item.material) {
                if visited.contains(&formula.id) {
                    continue;
                }
                let mut path = visited.clone();
                path.insert(formula.id);

                match self.resolve_inputs(formula, required, &path, depth + 1) {
                    Ok(children) => {
                        let total_price: f64 = children.iter().map(|c| c.total_price).sum();
                        let candidate = SourcingNode {
                            source: SourceType::ProducedByReaction,
                            material: item.material,
                            name: item.name.clone(),
                            quantity: required,
                            unit_price: if required > 0.0 { total_price / required } else { 0.0 },
                            total_price,
                            shortfall: 0.0,
                            formula: Some(formula.name.clone()),
                            children,
                        };
                        keep_cheaper(&mut best, candidate);
                    }
                    Err(e) => {
                        failure.get_or_insert(e);
                    }
                }
            }
        }

        if let Some(price) = price {
            let candidate = SourcingNode::leaf(SourceType::Purchased, item.material, &item.name, required, price);
            keep_cheaper(&mut best, candidate);
        }

        best.ok_or_else(|| {
            failure.unwrap_or_else(|| {
                if self.producers_of(item.material).is_empty() {
                    price_unavailable(item)
                } else {
                    ResolveError::UnresolvableInput {
                        material: item.material,
                        name: item.name.clone(),
                    }
                }
            })
        })
    }

    fn producers_of(&self, material: MaterialId) -> &[Formula] {
        self.producers.get(&material).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Replace `best` only when strictly cheaper, so earlier candidates win ties
fn keep_cheaper(best: &mut Option<SourcingNode>, candidate: SourcingNode) {
    let cheaper = match best {
        Some(current) => candidate.total_price < current.total_price,
        None => true,
    };
    if cheaper {
        *best = Some(candidate);
    }
}

fn price_unavailable(item: &MaterialQuantity) -> ResolveError {
    ResolveError::PriceUnavailable {
        material: item.material,
        name: item.name.clone(),
    }
}

/// Evaluate every formula in the catalog against one inventory snapshot
pub fn analyze<P: PriceOracle>(
    catalog: &FormulaCatalog,
    inventory: &Inventory,
    prices: &P,
    config: &AnalysisConfig,
) -> Result<AnalysisReport, CatalogError> {
    Ok(Analyzer::new(catalog, inventory, prices, config)?.run())
}

/// Format a sourcing tree as a readable string
pub fn format_sourcing_tree(node: &SourcingNode, indent: usize) -> String {
    let mut output = String::new();
    let prefix = "  ".repeat(indent);

    let via = match &node.formula {
        Some(name) if node.source == SourceType::ProducedByReaction => format!(" via {}", name),
        _ => String::new(),
    };
    let short = if node.shortfall > 0.0 {
        format!(" (buy {:.0} short)", node.shortfall)
    } else {
        String::new()
    };

    output.push_str(&format!(
        "{}[{}] {:.0}x {} @ {:.2} = {:.2}{}{}\n",
        prefix, node.source, node.quantity, node.name, node.unit_price, node.total_price, via, short
    ));

    for child in &node.children {
        output.push_str(&format_sourcing_tree(child, indent + 1));
    }

    output
}

/// Summary of where one formula's inputs come from
#[derive(Debug)]
pub struct ChainSummary {
    pub formula_name: String,
    pub output_name: String,
    pub output_quantity: f64,
    pub holdings_used: Vec<(String, f64)>,
    pub purchases: Vec<(String, f64, f64)>,
    pub reactions: Vec<(String, f64)>,
    pub profit: f64,
    pub margin: f64,
}

/// Aggregate a profit tree into holdings used, purchases and reactions run
pub fn summarize_chain(profit: &ReactionProfit) -> ChainSummary {
    let mut holdings: BTreeMap<String, f64> = BTreeMap::new();
    let mut purchases: BTreeMap<String, (f64, f64)> = BTreeMap::new();
    let mut reactions: BTreeMap<String, f64> = BTreeMap::new();

    profit.tree.walk(&mut |node, _depth| match node.source {
        SourceType::FromHoldings => {
            *holdings.entry(node.name.clone()).or_default() += node.quantity - node.shortfall;
            if node.shortfall > 0.0 {
                let entry = purchases.entry(node.name.clone()).or_default();
                entry.0 += node.shortfall;
                entry.1 += node.shortfall * node.unit_price;
            }
        }
        SourceType::Purchased => {
            let entry = purchases.entry(node.name.clone()).or_default();
            entry.0 += node.quantity;
            entry.1 += node.total_price;
        }
        SourceType::ProducedByReaction | SourceType::FinalOutput => {
            if let Some(name) = &node.formula {
                *reactions.entry(name.clone()).or_default() += node.quantity;
            }
        }
    });

    ChainSummary {
        formula_name: profit.formula_name.clone(),
        output_name: profit.output_name.clone(),
        output_quantity: profit.output_quantity,
        holdings_used: holdings.into_iter().collect(),
        purchases: purchases.into_iter().map(|(n, (q, c))| (n, q, c)).collect(),
        reactions: reactions.into_iter().collect(),
        profit: profit.profit,
        margin: profit.margin,
    }
}

impl fmt::Display for ChainSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== {} ===", self.formula_name)?;
        writeln!(f, "Output: {:.0}x {}", self.output_quantity, self.output_name)?;

        if !self.holdings_used.is_empty() {
            writeln!(f, "From holdings:")?;
            for (name, quantity) in &self.holdings_used {
                writeln!(f, "  {:.0}x {}", quantity, name)?;
            }
        }

        if !self.purchases.is_empty() {
            writeln!(f, "Buy:")?;
            for (name, quantity, cost) in &self.purchases {
                writeln!(f, "  {:.0}x {} ({:.2} ISK)", quantity, name, cost)?;
            }
        }

        writeln!(f, "Reactions:")?;
        for (name, quantity) in &self.reactions {
            writeln!(f, "  {} -> {:.0} units", name, quantity)?;
        }

        writeln!(f, "Profit: {:.2} ISK ({:.1}%)", self.profit, self.margin)
    }
}

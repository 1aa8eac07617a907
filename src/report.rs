//! Plain-text rendering of sites and analysis results

use crate::calculator::{Exclusion, format_sourcing_tree, summarize_chain};
use crate::models::{ReactionProfit, SiteComposition};

/// Format ranked profits as a table
pub fn format_profit_table(profits: &[ReactionProfit]) -> String {
    if profits.is_empty() {
        return "No reactions to show.\n".to_string();
    }

    let mut output = format!(
        "{:<4} {:<26} {:>8} {:>16} {:>16} {:>16} {:>8} {:>4}\n",
        "#", "Output", "Qty", "Input Cost", "Value", "Profit", "Margin", "Mine"
    );
    output.push_str(&"-".repeat(105));
    output.push('\n');

    for (rank, p) in profits.iter().enumerate() {
        output.push_str(&format!(
            "{:<4} {:<26} {:>8.0} {:>16.2} {:>16.2} {:>16.2} {:>7.1}% {:>4}\n",
            rank + 1,
            truncate(&p.output_name, 26),
            p.output_quantity,
            p.input_cost,
            p.output_value,
            p.profit,
            p.margin,
            if p.uses_user_materials { "yes" } else { "" },
        ));
    }

    output
}

/// One row's sourcing tree followed by its chain summary
pub fn format_chain(profit: &ReactionProfit) -> String {
    format!("{}\n{}", format_sourcing_tree(&profit.tree, 0), summarize_chain(profit))
}

pub fn format_exclusions(excluded: &[Exclusion]) -> String {
    let mut output = String::new();
    for e in excluded {
        output.push_str(&format!("  {}: {}\n", e.formula_name, e.reason));
    }
    output
}

/// Numbered site list, matching the indices `remove` takes
pub fn format_sites(sites: &[SiteComposition]) -> String {
    if sites.is_empty() {
        return "No sites held.\n".to_string();
    }

    let mut output = String::new();
    for (index, site) in sites.iter().enumerate() {
        output.push_str(&format!("[{}] {}\n", index, site.name));
        for ore in &site.ores {
            output.push_str(&format!("      {:<28} {:>6.2}%\n", ore.name, ore.fraction * 100.0));
        }
    }
    output
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

//! Moon Reaction Calculator
//!
//! Ranks moon material reactions by profit from survey scans and a price sheet.

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::{debug, info, warn};

use moon_reactions::calculator::analyze;
use moon_reactions::catalog::FormulaCatalog;
use moon_reactions::config::{AnalysisConfig, Overrides};
use moon_reactions::inventory::SiteInventory;
use moon_reactions::logging;
use moon_reactions::models::SiteComposition;
use moon_reactions::ores::OreTable;
use moon_reactions::prices::{CachedOracle, PriceTable};
use moon_reactions::ranker::{Direction, RankFilter, SortKey, rank};
use moon_reactions::report;
use moon_reactions::session::Session;
use moon_reactions::survey;

#[derive(Parser)]
#[command(name = "moon-reactions", version)]
#[command(about = "Rank moon material reactions by profit from survey scans")]
struct Cli {
    /// Reaction catalog JSON to use instead of the bundled one
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// More log output (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SurveyArgs {
    /// Survey text file (repeatable)
    #[arg(short, long = "survey")]
    surveys: Vec<PathBuf>,

    /// Directory searched recursively for *.txt survey files
    #[arg(long)]
    survey_dir: Option<PathBuf>,
}

#[derive(Args)]
struct AnalysisArgs {
    /// Price sheet JSON: {"Material": sell} or {"Material": {"buy": .., "sell": ..}}
    #[arg(short, long)]
    prices: PathBuf,

    /// JSON config file with analysis defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Ore units one site yields per extraction
    #[arg(long, env = "MOON_SITE_YIELD")]
    site_yield: Option<f64>,

    /// Top-level runs of each reaction
    #[arg(long, env = "MOON_RUNS")]
    runs: Option<f64>,

    /// Maximum reaction chain depth
    #[arg(long)]
    max_depth: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse survey text and show the sites found
    Parse {
        /// Survey file, or '-' for stdin
        file: PathBuf,

        /// Print JSON instead of a site list
        #[arg(long)]
        json: bool,
    },

    /// Rank every reaction against the held sites
    Analyze {
        #[command(flatten)]
        surveys: SurveyArgs,

        #[command(flatten)]
        analysis: AnalysisArgs,

        /// Field to rank by
        #[arg(long, value_enum)]
        sort: Option<SortKey>,

        /// Rank ascending instead of descending
        #[arg(long)]
        asc: bool,

        /// Only show reactions with positive profit
        #[arg(long)]
        profitable: bool,

        /// Only show reactions that use held materials
        #[arg(long)]
        mine: bool,

        /// Show at most this many rows
        #[arg(short, long)]
        limit: Option<usize>,

        /// Show the sourcing tree and summary of each row
        #[arg(long)]
        tree: bool,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,

        /// List excluded reactions and why
        #[arg(long)]
        show_excluded: bool,
    },

    /// List unique ores across the given surveys
    Materials {
        #[command(flatten)]
        surveys: SurveyArgs,

        /// Also list the reaction materials those ores reprocess into
        #[arg(long)]
        yields: bool,
    },

    /// List all reaction formulas in catalog order
    Formulas,

    /// List every material a price sheet should cover
    Items {
        /// Only list materials this price sheet is missing
        #[arg(long)]
        missing_from: Option<PathBuf>,
    },

    /// Interactive session: add and remove sites, analyze on demand
    Session {
        #[command(flatten)]
        analysis: AnalysisArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let catalog = match &cli.catalog {
        Some(path) => FormulaCatalog::from_file(path)?,
        None => FormulaCatalog::bundled()?,
    };
    let ores = OreTable::bundled(&catalog)?;

    match cli.command {
        Commands::Parse { file, json } => {
            let text = if file == Path::new("-") {
                let mut text = String::new();
                io::stdin().read_to_string(&mut text)?;
                text
            } else {
                std::fs::read_to_string(&file).with_context(|| format!("Failed to read {}", file.display()))?
            };

            let parsed = survey::parse_survey(&text, &ores)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&parsed.sites)?);
            } else {
                print!("{}", report::format_sites(&parsed.sites));
            }
        }

        Commands::Analyze {
            surveys,
            analysis,
            sort,
            asc,
            profitable,
            mine,
            limit,
            tree,
            json,
            show_excluded,
        } => {
            let direction = asc.then_some(Direction::Ascending);
            let config = load_config(&analysis, sort, direction)?;
            let prices = CachedOracle::new(load_prices(&analysis.prices, &catalog)?);

            let mut sites = SiteInventory::new(ores.clone(), config.site_yield);
            let added = sites.add_sites(load_sites(&surveys, &ores)?);
            if added == 0 {
                warn!("no sites loaded, every input will be bought");
            }
            info!(sites = added, "loaded sites");

            let inventory = sites.snapshot();
            info!(materials = inventory.len(), "holdings snapshot");
            for (material, quantity) in inventory.iter() {
                debug!(%material, quantity, "held");
            }
            prices.prewarm(inventory.materials());
            let analysis = analyze(&catalog, &inventory, &prices, &config)?;

            let ranked = rank(&analysis.profits, config.sort, config.direction);
            let filter = RankFilter {
                profitable_only: profitable,
                holdings_only: mine,
                limit,
            };
            let shown = filter.apply(ranked);

            if json {
                println!("{}", serde_json::to_string_pretty(&shown)?);
            } else {
                print!("{}", report::format_profit_table(&shown));
                if tree {
                    for profit in &shown {
                        print!("\n{}", report::format_chain(profit));
                    }
                }
                if !analysis.excluded.is_empty() {
                    println!("\n{} reaction(s) excluded", analysis.excluded.len());
                    if show_excluded {
                        print!("{}", report::format_exclusions(&analysis.excluded));
                    }
                }
            }
        }

        Commands::Materials { surveys, yields } => {
            let mut sites = SiteInventory::new(ores.clone(), AnalysisConfig::default().site_yield);
            sites.add_sites(load_sites(&surveys, &ores)?);
            let names: Vec<String> = sites.unique_materials().into_iter().collect();
            for name in &names {
                println!("{}", name);
            }

            if yields {
                println!("\nReaction materials:");
                for material in ores.ores_to_materials(&names) {
                    let name = catalog.material_name(material)?.unwrap_or_else(|| material.to_string());
                    println!("  {}", name);
                }
            }
        }

        Commands::Formulas => {
            for formula in catalog.all_formulas()? {
                let inputs: Vec<String> = formula
                    .inputs
                    .iter()
                    .map(|i| format!("{:.0} {}", i.quantity, i.name))
                    .collect();
                println!(
                    "{:<6} {:<40} {} -> {:.0} {}",
                    formula.id,
                    formula.name,
                    inputs.join(" + "),
                    formula.output.quantity,
                    formula.output.name
                );
            }
        }

        Commands::Items { missing_from } => {
            let names = match missing_from {
                Some(path) => PriceTable::from_file(&path, &catalog)?.missing(&catalog)?,
                None => catalog.all_material_names()?,
            };
            for name in names {
                println!("{}", name);
            }
        }

        Commands::Session { analysis } => {
            let config = load_config(&analysis, None, None)?;
            let prices = CachedOracle::new(load_prices(&analysis.prices, &catalog)?);

            println!("Moon reaction session. Type 'help' for commands.");
            let mut session = Session::new(&catalog, &ores, &prices, config);
            session.run(io::stdin().lock(), io::stdout())?;
        }
    }

    Ok(())
}

fn load_config(args: &AnalysisArgs, sort: Option<SortKey>, direction: Option<Direction>) -> Result<AnalysisConfig> {
    let overrides = Overrides {
        site_yield: args.site_yield,
        runs: args.runs,
        max_depth: args.max_depth,
        sort,
        direction,
    };
    Ok(AnalysisConfig::load(args.config.as_deref(), overrides)?)
}

fn load_prices(path: &Path, catalog: &FormulaCatalog) -> Result<PriceTable> {
    let table = PriceTable::from_file(path, catalog)?;
    if table.is_empty() {
        warn!(path = %path.display(), "price sheet has no known materials, every reaction will be excluded");
    }
    Ok(table)
}

/// Parse every survey file named on the command line or found in the directory
fn load_sites(args: &SurveyArgs, ores: &OreTable) -> Result<Vec<SiteComposition>> {
    let mut files = args.surveys.clone();
    if let Some(dir) = &args.survey_dir {
        files.extend(survey::find_survey_files(dir));
    }

    let mut sites = Vec::new();
    for file in &files {
        info!(file = %file.display(), "reading survey");
        sites.extend(survey::parse_survey_file(file, ores)?.sites);
    }
    Ok(sites)
}

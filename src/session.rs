//! Interactive session
//!
//! Holds a site inventory for the lifetime of the process. Sites come from
//! survey files (`add`) or pasted text (`paste` ... `end`).

use std::io::{BufRead, Write};
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use clap::ValueEnum;

use crate::calculator::analyze;
use crate::catalog::FormulaCatalog;
use crate::config::AnalysisConfig;
use crate::inventory::SiteInventory;
use crate::models::ReactionProfit;
use crate::ores::OreTable;
use crate::prices::PriceOracle;
use crate::ranker::{Direction, SortKey, rank};
use crate::report;
use crate::survey::{ParsedSurvey, parse_survey, parse_survey_file};

const HELP: &str = "\
Commands:
  add <file>              add the sites in a survey file
  paste                   paste survey text, finish with a line containing only 'end'
  remove <index>          remove a site by its list index
  list                    list held sites
  materials               list unique ores across held sites
  analyze [key] [asc|desc]
                          rank reactions (keys: output-name, output-quantity,
                          input-cost, output-value, profit, margin)
  tree <rank>             show the sourcing tree of a row from the last analysis
  help                    show this help
  quit                    leave the session
";

pub enum Reply {
    Text(String),
    Quit,
}

pub struct Session<'a, P: PriceOracle> {
    catalog: &'a FormulaCatalog,
    ores: &'a OreTable,
    prices: &'a P,
    config: AnalysisConfig,
    sites: SiteInventory,
    last: Vec<ReactionProfit>,
}

impl<'a, P: PriceOracle> Session<'a, P> {
    pub fn new(catalog: &'a FormulaCatalog, ores: &'a OreTable, prices: &'a P, config: AnalysisConfig) -> Self {
        let sites = SiteInventory::new(ores.clone(), config.site_yield);
        Self {
            catalog,
            ores,
            prices,
            config,
            sites,
            last: Vec::new(),
        }
    }

    pub fn sites(&self) -> &SiteInventory {
        &self.sites
    }

    /// Read commands until `quit` or end of input
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut out: W) -> Result<()> {
        let mut lines = input.lines();

        write!(out, "> ")?;
        out.flush()?;
        while let Some(line) = lines.next() {
            let line = line?;
            let reply = if line.trim() == "paste" {
                let mut text = String::new();
                for pasted in lines.by_ref() {
                    let pasted = pasted?;
                    if pasted.trim() == "end" {
                        break;
                    }
                    text.push_str(&pasted);
                    text.push('\n');
                }
                self.add_text(&text)
            } else {
                self.execute(&line)
            };

            match reply {
                Ok(Reply::Text(text)) => write!(out, "{}", text)?,
                Ok(Reply::Quit) => return Ok(()),
                Err(e) => writeln!(out, "error: {:#}", e)?,
            }
            write!(out, "> ")?;
            out.flush()?;
        }
        Ok(())
    }

    /// Run a single command line
    pub fn execute(&mut self, line: &str) -> Result<Reply> {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Ok(Reply::Text(String::new()));
        };
        let rest: Vec<&str> = words.collect();

        match command {
            "add" => {
                let path = rest.join(" ");
                if path.is_empty() {
                    bail!("usage: add <file>");
                }
                let parsed = parse_survey_file(Path::new(&path), self.ores)?;
                Ok(Reply::Text(self.add_parsed(parsed)))
            }
            "remove" => {
                let index: usize = rest
                    .first()
                    .ok_or_else(|| anyhow!("usage: remove <index>"))?
                    .parse()
                    .context("index must be a number")?;
                let site = self.sites.remove_site(index)?;
                Ok(Reply::Text(format!("Removed {}\n", site.name)))
            }
            "list" => Ok(Reply::Text(report::format_sites(self.sites.list()))),
            "materials" => {
                let mut text = String::new();
                for name in self.sites.unique_materials() {
                    text.push_str(&name);
                    text.push('\n');
                }
                Ok(Reply::Text(text))
            }
            "analyze" => self.analyze(&rest),
            "tree" => {
                let row: usize = rest
                    .first()
                    .ok_or_else(|| anyhow!("usage: tree <rank>"))?
                    .parse()
                    .context("rank must be a number")?;
                let profit = row
                    .checked_sub(1)
                    .and_then(|i| self.last.get(i))
                    .ok_or_else(|| anyhow!("no row {} in the last analysis", row))?;
                Ok(Reply::Text(report::format_chain(profit)))
            }
            "help" => Ok(Reply::Text(HELP.to_string())),
            "quit" | "exit" => Ok(Reply::Quit),
            other => bail!("unknown command '{}', try 'help'", other),
        }
    }

    /// Parse pasted survey text and add its sites
    pub fn add_text(&mut self, text: &str) -> Result<Reply> {
        let parsed = parse_survey(text, self.ores)?;
        Ok(Reply::Text(self.add_parsed(parsed)))
    }

    fn add_parsed(&mut self, parsed: ParsedSurvey) -> String {
        let mut text = String::new();
        for warning in &parsed.warnings {
            text.push_str(&format!("warning: {}\n", warning));
        }
        let offered = parsed.sites.len();
        let added = self.sites.add_sites(parsed.sites);
        text.push_str(&format!("Added {} of {} site(s)\n", added, offered));
        text
    }

    fn analyze(&mut self, args: &[&str]) -> Result<Reply> {
        let mut key = self.config.sort;
        let mut direction = self.config.direction;
        for arg in args {
            if let Ok(d) = Direction::from_str(arg, true) {
                direction = d;
            } else {
                key = SortKey::from_str(arg, true).map_err(|e| anyhow!("bad sort key: {}", e))?;
            }
        }

        if self.sites.is_empty() {
            bail!("no sites held, add some first");
        }

        let inventory = self.sites.snapshot();
        let analysis = analyze(self.catalog, &inventory, self.prices, &self.config)?;
        self.last = rank(&analysis.profits, key, direction);

        let mut text = report::format_profit_table(&self.last);
        if !analysis.excluded.is_empty() {
            text.push_str(&format!("{} reaction(s) excluded\n", analysis.excluded.len()));
        }
        Ok(Reply::Text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MaterialId;
    use crate::prices::PriceTable;

    const SURVEY: &str = "Site A\n    Sylvite 0.5 45491 1 2 3\n    Coesite 0.5 45493 1 2 3\n";

    fn fixtures() -> (FormulaCatalog, OreTable, PriceTable) {
        let catalog = FormulaCatalog::bundled().unwrap();
        let ores = OreTable::bundled(&catalog).unwrap();
        let prices: PriceTable = catalog
            .all_material_names()
            .unwrap()
            .iter()
            .map(|name| (catalog.material_id(name).unwrap().unwrap(), 1000.0))
            .collect();
        (catalog, ores, prices)
    }

    fn text(reply: Reply) -> String {
        match reply {
            Reply::Text(text) => text,
            Reply::Quit => panic!("unexpected quit"),
        }
    }

    #[test]
    fn test_add_list_remove() {
        let (catalog, ores, prices) = fixtures();
        let mut session = Session::new(&catalog, &ores, &prices, AnalysisConfig::default());

        assert!(text(session.add_text(SURVEY).unwrap()).contains("Added 1 of 1"));
        assert!(text(session.add_text(SURVEY).unwrap()).contains("Added 0 of 1"));
        assert!(text(session.execute("list").unwrap()).starts_with("[0] Site A"));

        assert!(session.execute("remove 3").is_err());
        assert!(text(session.execute("remove 0").unwrap()).contains("Removed Site A"));
        assert!(session.sites().is_empty());
    }

    #[test]
    fn test_analyze_then_tree() {
        let (catalog, ores, prices) = fixtures();
        let mut session = Session::new(&catalog, &ores, &prices, AnalysisConfig::default());

        assert!(session.execute("analyze").is_err());
        session.add_text(SURVEY).unwrap();

        let table = text(session.execute("analyze profit asc").unwrap());
        assert!(table.contains("Margin"));
        assert_eq!(session.last.len(), 30);
        assert!(session.last.windows(2).all(|w| w[0].profit <= w[1].profit));

        let tree = text(session.execute("tree 1").unwrap());
        assert!(tree.contains("[OUTPUT]"));
        assert!(session.execute("tree 99").is_err());
        assert!(session.execute("analyze sideways").is_err());
    }

    #[test]
    fn test_run_loop_with_paste() {
        let (catalog, ores, prices) = fixtures();
        let mut session = Session::new(&catalog, &ores, &prices, AnalysisConfig::default());

        let input = format!("paste\n{}end\nmaterials\nbogus\nquit\nlist\n", SURVEY);
        let mut out = Vec::new();
        session.run(input.as_bytes(), &mut out).unwrap();

        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("Added 1 of 1 site(s)"));
        assert!(out.contains("Coesite\nSylvite\n"));
        assert!(out.contains("error: unknown command 'bogus'"));
        // Nothing after quit runs
        assert!(!out.contains("[0] Site A"));
        assert!(session.sites().snapshot().holds(MaterialId(16635)));
    }
}

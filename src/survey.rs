//! Survey scan parsing
//!
//! Turns pasted survey text into site compositions. A paste holds one or
//! more blocks: a site header line followed by indented ore lines of the form
//! `<ore name> <fraction> <ore type id> <system id> <planet id> <site id>`.
//! The in-game column header line is ignored wherever it appears, so several
//! pastes can simply be concatenated.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{SurveyError, SurveyWarning};
use crate::models::{OreShare, SiteComposition};
use crate::ores::OreTable;

/// Ore lines are indented at least this many columns (tab = 4)
const ORE_LINE_INDENT: usize = 4;

/// Slack for rounding in the scanner's printed fractions
const FRACTION_TOLERANCE: f64 = 1e-6;

static COLUMN_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^moon\s+(?:moon\s+)?product\s+quantity\b").expect("valid regex")
});

// Ore name may contain spaces; the last five fields are numeric
static ORE_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>\S.*?)\s+(?P<fraction>\S+)\s+(?P<ore>\S+)\s+(?P<system>\S+)\s+(?P<planet>\S+)\s+(?P<site>\S+)$")
        .expect("valid regex")
});

/// Sites parsed from one paste, plus any non-fatal warnings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedSurvey {
    pub sites: Vec<SiteComposition>,
    pub warnings: Vec<SurveyWarning>,
}

struct Block {
    header_line: usize,
    header: String,
    ores: Vec<OreShare>,
    first_unknown: Option<(usize, String)>,
}

impl Block {
    fn finish(self) -> Result<SiteComposition, SurveyError> {
        if self.ores.is_empty() {
            return Err(match self.first_unknown {
                Some((line, text)) => SurveyError::Malformed {
                    line,
                    text,
                    reason: format!("site '{}' has no recognized ores", self.header),
                },
                None => SurveyError::Malformed {
                    line: self.header_line,
                    text: self.header.clone(),
                    reason: format!("site '{}' has no ore lines", self.header),
                },
            });
        }
        Ok(SiteComposition {
            name: self.header,
            ores: self.ores,
        })
    }
}

/// Parse survey text into site compositions
pub fn parse_survey(input: &str, ores: &OreTable) -> Result<ParsedSurvey, SurveyError> {
    let mut parsed = ParsedSurvey::default();
    let mut current: Option<Block> = None;

    for (index, raw) in input.lines().enumerate() {
        let line_no = index + 1;
        let trimmed = raw.trim();

        if trimmed.is_empty() || COLUMN_HEADER_RE.is_match(trimmed) {
            continue;
        }

        if indent_width(raw) >= ORE_LINE_INDENT {
            let Some(block) = current.as_mut() else {
                return Err(malformed(line_no, raw, "ore line found before any site name"));
            };

            let share = parse_ore_line(line_no, raw, trimmed)?;
            match ores.recognize(&share.name) {
                Some(base) => {
                    let ore = base.to_string();
                    merge_share(&mut block.ores, OreShare { ore, ..share });

                    let total: f64 = block.ores.iter().map(|s| s.fraction).sum();
                    if total > 1.0 + FRACTION_TOLERANCE {
                        return Err(malformed(
                            line_no,
                            raw,
                            format!("ore fractions of '{}' add up to {:.4}, more than 1.0", block.header, total),
                        ));
                    }
                }
                None => {
                    warn!(line = line_no, ore = %share.name, "unknown ore in survey");
                    parsed.warnings.push(SurveyWarning::UnknownOre {
                        line: line_no,
                        name: share.name,
                    });
                    block.first_unknown.get_or_insert((line_no, raw.to_string()));
                }
            }
        } else {
            if let Some(block) = current.take() {
                parsed.sites.push(block.finish()?);
            }
            current = Some(Block {
                header_line: line_no,
                header: trimmed.to_string(),
                ores: Vec::new(),
                first_unknown: None,
            });
        }
    }

    if let Some(block) = current {
        parsed.sites.push(block.finish()?);
    }

    debug!(
        sites = parsed.sites.len(),
        warnings = parsed.warnings.len(),
        "parsed survey"
    );
    Ok(parsed)
}

fn indent_width(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

fn malformed(line: usize, text: &str, reason: impl Into<String>) -> SurveyError {
    SurveyError::Malformed {
        line,
        text: text.to_string(),
        reason: reason.into(),
    }
}

fn parse_ore_line(line_no: usize, raw: &str, trimmed: &str) -> Result<OreShare, SurveyError> {
    let cap = ORE_LINE_RE.captures(trimmed).ok_or_else(|| {
        malformed(
            line_no,
            raw,
            "expected an ore name followed by five numeric fields",
        )
    })?;

    let fraction = cap["fraction"]
        .parse::<f64>()
        .map_err(|e| malformed(line_no, raw, format!("invalid fraction: {}", e)))?;
    if !(0.0..=1.0).contains(&fraction) {
        return Err(malformed(
            line_no,
            raw,
            format!("fraction {} outside 0.0-1.0", fraction),
        ));
    }

    let id = |field: &str| {
        cap[field]
            .parse::<u32>()
            .map_err(|e| malformed(line_no, raw, format!("invalid {} id: {}", field, e)))
    };

    Ok(OreShare {
        name: cap["name"].to_string(),
        ore: String::new(),
        fraction,
        ore_type_id: id("ore")?,
        system_id: id("system")?,
        planet_id: id("planet")?,
        site_id: id("site")?,
    })
}

/// A repeated ore within one site is folded into its first entry
fn merge_share(shares: &mut Vec<OreShare>, share: OreShare) {
    match shares.iter_mut().find(|s| s.name == share.name) {
        Some(existing) => existing.fraction += share.fraction,
        None => shares.push(share),
    }
}

/// Read and parse a single survey file
pub fn parse_survey_file(path: &Path, ores: &OreTable) -> Result<ParsedSurvey, SurveyError> {
    let content = fs::read_to_string(path).map_err(|source| SurveyError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_survey(&content, ores)
}

/// Find all survey text files (`*.txt`) under a directory, sorted by path
pub fn find_survey_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "txt"))
        .collect();
    files.sort();
    files
}

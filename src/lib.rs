//! Moon reaction profit calculator
//!
//! Parses moon survey scans into holdings, then ranks every known reaction
//! by profit, including the chain of sub-reactions feeding each one.

pub mod calculator;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod inventory;
pub mod logging;
pub mod models;
pub mod ores;
pub mod prices;
pub mod ranker;
pub mod report;
pub mod session;
pub mod survey;

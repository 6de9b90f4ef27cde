//! Command-line interface parsing for Free Library Hub
//!
//! This module handles parsing of CLI arguments using clap and rendering of
//! result listings as JSON.

use std::time::Duration;

use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use thiserror::Error;

use crate::aggregator::{MAX_LIMIT, MIN_LIMIT};
use crate::config::Config;
use crate::data::{NormalizedBook, Source};

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// The limit is not a whole number in the accepted range
    #[error("Invalid limit: '{0}'. Expected a number from 1 to 100")]
    InvalidLimit(String),
}

/// Free Library Hub - browse free books from several open catalogs
#[derive(Parser, Debug)]
#[command(name = "freelib")]
#[command(about = "Free books from Project Gutenberg, Open Library and the Internet Archive")]
#[command(version)]
pub struct Cli {
    /// Deadline for each provider request, in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 10_000, global = true)]
    pub timeout_ms: u64,

    /// User-Agent sent to providers
    #[arg(long, value_name = "AGENT", global = true)]
    pub user_agent: Option<String>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Operations available from the command line
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Popular books from every provider
    Trending,

    /// Search Gutenberg and Open Library
    Search {
        /// Text to search for
        query: String,
        /// Maximum number of results (1-100)
        #[arg(long, default_value_t = 30, value_parser = parse_limit_arg)]
        limit: usize,
    },

    /// Books in a category
    ///
    /// Examples:
    ///   freelib category science
    ///   freelib category "Science Fiction" --limit 10
    Category {
        /// Category label, e.g. "Science"
        name: String,
        /// Maximum number of results (1-100)
        #[arg(long, default_value_t = 20, value_parser = parse_limit_arg)]
        limit: usize,
    },

    /// Books from a single provider
    ///
    /// Valid providers: gutenberg, openlibrary, archive
    Source {
        /// Provider name
        provider: Source,
        /// Search text (Open Library) or local filter (Gutenberg)
        query: Option<String>,
        /// Maximum number of results (1-100)
        #[arg(long, default_value_t = 20, value_parser = parse_limit_arg)]
        limit: usize,
    },

    /// List the browseable categories
    Categories,
}

/// Parses a `--limit` argument, rejecting values outside 1-100
///
/// # Returns
/// * `Ok(usize)` if the string is a whole number in range
/// * `Err(CliError::InvalidLimit)` otherwise
pub fn parse_limit_arg(s: &str) -> Result<usize, CliError> {
    match s.trim().parse::<usize>() {
        Ok(limit) if (MIN_LIMIT..=MAX_LIMIT).contains(&limit) => Ok(limit),
        _ => Err(CliError::InvalidLimit(s.to_string())),
    }
}

impl Cli {
    /// Builds the runtime configuration from the parsed flags
    pub fn config(&self) -> Config {
        let config = Config::default().with_timeout(Duration::from_millis(self.timeout_ms));
        match &self.user_agent {
            Some(agent) => config.with_user_agent(agent.clone()),
            None => config,
        }
    }

    /// Maximum log level selected by `-v` flags
    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            _ => tracing::Level::DEBUG,
        }
    }
}

/// JSON envelope for a list of books
#[derive(Debug, Serialize)]
pub struct BookListing<'a> {
    pub success: bool,
    pub books: &'a [NormalizedBook],
    pub total: usize,
}

impl<'a> BookListing<'a> {
    pub fn new(books: &'a [NormalizedBook]) -> Self {
        Self {
            success: true,
            books,
            total: books.len(),
        }
    }

    /// Serializes the listing, optionally indented
    pub fn to_json(&self, pretty: bool) -> Result<String, serde_json::Error> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}

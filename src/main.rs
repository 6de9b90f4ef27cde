//! Free Library Hub - browse free books from several open catalogs
//!
//! A command-line front end over the aggregator that prints book listings as
//! JSON.

use clap::Parser;

use freelib::aggregator::BROWSE_CATEGORIES;
use freelib::cli::{BookListing, Cli, Command};
use freelib::Aggregator;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level())
        .with_writer(std::io::stderr)
        .init();

    let aggregator = Aggregator::new(&cli.config())?;

    let books = match &cli.command {
        Command::Categories => {
            for category in BROWSE_CATEGORIES {
                println!("{}", category);
            }
            return Ok(());
        }
        Command::Trending => aggregator.trending().await?,
        Command::Search { query, limit } => aggregator.search(query, *limit).await?,
        Command::Category { name, limit } => aggregator.by_category(name, *limit).await?,
        Command::Source {
            provider,
            query,
            limit,
        } => {
            aggregator
                .fetch_source(*provider, query.as_deref().unwrap_or_default(), *limit)
                .await?
        }
    };

    tracing::info!(total = books.len(), "Fetched books");
    println!("{}", BookListing::new(&books).to_json(cli.pretty)?);

    Ok(())
}

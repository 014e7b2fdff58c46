//! OpenAPI from traffic - Command-line tool for inferring OpenAPI documentation.
//!
//! Reads recorded HTTP request/response records, infers routes, parameters and
//! JSON schemas from them, and writes a multi-file OpenAPI 3.0 document tree.
//!
//! # Usage
//!
//! ```bash
//! openapi-from-traffic [OPTIONS] <INPUT>
//! ```
//!
//! # Examples
//!
//! Write the document tree to `.build/`:
//! ```bash
//! openapi-from-traffic traffic.jsonl --title "Posts API" --server-url https://api.example.com
//! ```
//!
//! Bundle, lint and render it with the Node.js toolchain:
//! ```bash
//! openapi-from-traffic traffic.jsonl --bundle --tools-dir ./node_modules/.bin
//! ```
//!
//! Enable verbose logging:
//! ```bash
//! openapi-from-traffic traffic.jsonl -v
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use openapi_from_traffic::cli;

fn main() -> Result<()> {
    // Options may come from a .env file through their environment variables
    dotenvy::dotenv().ok();

    // We need to parse args twice: once to get verbose flag, then again after logger init
    let args_for_verbose = cli::CliArgs::parse();

    let log_level = if args_for_verbose.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("OpenAPI from traffic starting...");

    // Now validate the parsed arguments
    let args = cli::parse_args_from_parsed(args_for_verbose)?;

    cli::run(args)?;

    info!("OpenAPI document generation completed successfully");

    Ok(())
}

//! openapi-from-handlers - Command-line tool for generating OpenAPI documentation.
//!
//! Scans a Rust project for routed handler methods, resolves their parameter
//! and return types through generics, trait impls and proxies, and writes an
//! OpenAPI 3.0 document for one documentation group.
//!
//! # Usage
//!
//! ```bash
//! openapi-from-handlers [OPTIONS] <PROJECT_PATH>
//! ```
//!
//! # Examples
//!
//! Generate YAML documentation:
//! ```bash
//! openapi-from-handlers ./my-api-project -o openapi.yaml
//! ```
//!
//! Only document `/api` routes, naming generic models for code generators:
//! ```bash
//! openapi-from-handlers ./my-api-project -p /api -n codegen -f json -o openapi.json
//! ```
//!
//! Enable verbose logging:
//! ```bash
//! openapi-from-handlers ./my-api-project -v
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use openapi_from_handlers::cli;

fn main() -> Result<()> {
    // Parse once for the verbose flag, validate after the logger is up
    let args_for_verbose = cli::CliArgs::parse();

    let log_level = if args_for_verbose.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("openapi-from-handlers starting...");

    let args = cli::parse_args_from_parsed(args_for_verbose)?;
    cli::run(args)?;

    info!("OpenAPI document generation completed successfully");

    Ok(())
}

//! Status command - shows server health and pool/cache counters.

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use serde::Serialize;

use eligo_server::StatusResponse;

use super::Context;
use crate::client::Client;

/// Arguments for the status command.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Show pool, cache and store counters
    #[arg(short, long)]
    pub detailed: bool,
}

/// Status response for JSON output.
#[derive(Debug, Serialize)]
struct StatusOutput {
    running: bool,
    version: Option<String>,
    server_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    counters: Option<StatusResponse>,
}

/// Run the status command.
pub async fn run(args: StatusArgs, ctx: &Context) -> Result<()> {
    let server_url = ctx.server_url();
    let client = Client::new(&server_url)?;

    match client.health().await {
        Ok(health) => {
            let counters = if args.detailed || ctx.json_output {
                client.status().await.ok()
            } else {
                None
            };

            if ctx.json_output {
                let output = StatusOutput {
                    running: true,
                    version: Some(health.version),
                    server_url,
                    counters,
                };
                println!("{}", serde_json::to_string_pretty(&output)?);
                return Ok(());
            }

            let green = Style::new().green();
            let dim = Style::new().dim();

            println!();
            println!("{}", style("Eligo Server Status").bold());
            println!("{}", dim.apply_to("─".repeat(40)));
            println!();
            println!(
                "  {} {}",
                dim.apply_to("Status:"),
                green.apply_to("● running")
            );
            println!("  {} {}", dim.apply_to("Version:"), health.version);
            println!("  {} {}", dim.apply_to("Server:"), server_url);

            if args.detailed {
                println!();
                println!("{}", dim.apply_to("─".repeat(40)));
                println!();
                match counters {
                    Some(status) => print_counters(&status),
                    None => println!("  {} unavailable", dim.apply_to("Counters:")),
                }
            }

            println!();
        }
        Err(e) => {
            if ctx.json_output {
                let output = StatusOutput {
                    running: false,
                    version: None,
                    server_url,
                    counters: None,
                };
                println!("{}", serde_json::to_string_pretty(&output)?);
                return Ok(());
            }

            let red = Style::new().red();
            let dim = Style::new().dim();

            println!();
            println!("{}", style("Eligo Server Status").bold());
            println!("{}", dim.apply_to("─".repeat(40)));
            println!();
            println!(
                "  {} {}",
                dim.apply_to("Status:"),
                red.apply_to("● not running")
            );
            println!("  {} {}", dim.apply_to("Server:"), server_url);

            if ctx.verbose {
                println!();
                println!("  {} {}", dim.apply_to("Error:"), e);
            }

            println!();
            println!("  {}", dim.apply_to("Start the server with: eligo start"));
            println!();
        }
    }

    Ok(())
}

fn print_counters(status: &StatusResponse) {
    let dim = Style::new().dim();
    let pool = &status.pool;
    let cache = &status.cache;

    println!(
        "  {} {}/{} leased, {} idle",
        dim.apply_to("Sessions:"),
        pool.leased,
        pool.capacity,
        pool.idle
    );
    println!(
        "  {} {} created, {} torn down",
        dim.apply_to("Lifetime:"),
        pool.created,
        pool.torn_down
    );
    println!(
        "  {} {}/{} entries, {} in flight",
        dim.apply_to("Cache:"),
        cache.size,
        cache.capacity,
        cache.in_flight
    );
    println!(
        "  {} {} hits, {} misses, {} joined",
        dim.apply_to("Lookups:"),
        cache.hits,
        cache.misses,
        cache.joined
    );
    match status.recordings {
        Some(count) => println!("  {} {}", dim.apply_to("Recordings:"), count),
        None => println!("  {} unavailable", dim.apply_to("Recordings:")),
    }
}

//! Check command - one-shot eligibility lookup.

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use eligo_engine::{EligibilityRecord, LookupResponse};

use super::Context;
use crate::bootstrap;
use crate::client::Client;

/// Arguments for the check command.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Scheme identifier to look up
    pub scheme_id: String,

    /// Send the lookup to a running server instead of driving a browser here
    #[arg(short, long)]
    pub remote: bool,
}

/// Run the check command.
pub async fn run(args: CheckArgs, ctx: &Context) -> Result<()> {
    let scheme_id = args.scheme_id.trim();
    if scheme_id.is_empty() || !scheme_id.chars().all(|c| c.is_ascii_alphanumeric()) {
        anyhow::bail!("Scheme ID must be a non-empty alphanumeric string");
    }

    let response = if args.remote {
        Client::new(&ctx.server_url())?.check_status(scheme_id).await?
    } else {
        let config = ctx.load_config()?.config;
        let engine = bootstrap::build_engine(&config)?;
        let response = engine.lookup(scheme_id).await;
        engine.shutdown().await;
        response
    };

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_response(scheme_id, &response);
    }

    Ok(())
}

fn print_response(scheme_id: &str, response: &LookupResponse) {
    let dim = Style::new().dim();

    println!();
    println!("{} {}", style("Scheme").bold(), style(scheme_id).bold());
    println!("{}", dim.apply_to("─".repeat(40)));

    match response {
        LookupResponse::Success { data } => {
            println!("  {}", Style::new().green().apply_to("● found"));
            for (label, value) in record_fields(data) {
                println!(
                    "  {:<24} {}",
                    dim.apply_to(format!("{}:", label)),
                    value.unwrap_or("-")
                );
            }
        }
        LookupResponse::Error {
            code,
            title,
            message,
        } => {
            println!("  {} {}", Style::new().red().apply_to("●"), title);
            println!("  {:<24} {}", dim.apply_to("Code:"), code.as_str());
            println!("  {:<24} {}", dim.apply_to("Message:"), message);
        }
    }
    println!();
}

fn record_fields(record: &EligibilityRecord) -> [(&'static str, Option<&str>); 7] {
    [
        ("Eligibility", record.eligibility.as_deref()),
        ("Scheme ID", record.scheme_id.as_deref()),
        ("Scheme type", record.scheme_type.as_deref()),
        ("Doctor number", record.doctor_number.as_deref()),
        ("Date of birth", record.date_of_birth.as_deref()),
        ("Eligibility start", record.eligibility_start_date.as_deref()),
        ("Eligibility end", record.eligibility_end_date.as_deref()),
    ]
}

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use responder::Responder;
use responder::admin::SystemHealth;

use crate::output;

#[derive(Args)]
pub struct StatusArgs {
    #[arg(long, help = "Output as JSON")]
    pub json: bool,
}

pub fn run(responder: &Responder, args: StatusArgs) -> Result<()> {
    let report = responder.admin.status();

    if args.json {
        return output::json(&report);
    }

    output::header("cake Status");
    println!();

    let health = match report.health {
        SystemHealth::Operational => "operational".green().bold(),
        SystemHealth::Degraded => "degraded".yellow().bold(),
    };
    println!("  {:<14} {}", "health:", health);
    println!("  {:<14} {}", "cache size:", report.cache_size);
    println!(
        "  {:<14} {}",
        "checked at:",
        report.timestamp.to_rfc3339().dimmed()
    );

    println!();
    output::subheader("Providers:");
    for (provider, status) in &report.connectivity {
        output::provider_line(*provider, status);
    }

    println!();
    output::subheader("Subjects:");
    for subject in &report.configured_subjects {
        let count = report.fallback_counts.get(subject).copied().unwrap_or(0);
        println!(
            "  {:<20} {}",
            subject.to_string(),
            format!("{count} canned responses").dimmed()
        );
    }

    if report.providers_initialized.len() <= 1 {
        println!();
        output::hint("set OPENAI_API_KEY or ANTHROPIC_API_KEY to enable live responses");
    }

    Ok(())
}

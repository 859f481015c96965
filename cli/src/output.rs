use anyhow::Result;
use cake_core::{Provenance, Provider};
use colored::{ColoredString, Colorize};
use responder::admin::{ConnectionStatus, ProviderStatus};
use serde::Serialize;

pub fn header(title: &str) {
    println!("{}", title.bold().underline());
}

pub fn subheader(title: &str) {
    println!("{}", title.bold());
}

pub fn hint(msg: &str) {
    println!("{} {}", "hint:".cyan().bold(), msg.dimmed());
}

pub fn warn(msg: &str) {
    eprintln!("{} {}", "warning:".yellow().bold(), msg);
}

pub fn error(msg: &str) {
    eprintln!("{} {}", "error:".red().bold(), msg);
}

pub fn success(msg: &str) {
    println!("{} {}", "✓".green().bold(), msg);
}

pub fn json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn provenance(provenance: Provenance) -> ColoredString {
    let label = provenance.to_string();
    match provenance {
        Provenance::LiveModel => label.green(),
        Provenance::SecondaryModel => label.yellow(),
        Provenance::Cache => label.blue(),
        Provenance::StaticFallback => label.magenta(),
    }
}

pub fn connection_status(status: ConnectionStatus) -> ColoredString {
    match status {
        ConnectionStatus::Connected => "connected".green(),
        ConnectionStatus::AlwaysAvailable => "always available".green(),
        ConnectionStatus::Disconnected => "disconnected".yellow(),
        ConnectionStatus::Error => "error".red(),
    }
}

pub fn provider_line(provider: Provider, status: &ProviderStatus) {
    let detail = match &status.error {
        Some(e) => format!("({e})").red(),
        None => format!("({:.1}ms)", status.latency_ms).dimmed(),
    };
    println!(
        "  {:<12} {} {}",
        format!("{provider}:"),
        connection_status(status.status),
        detail
    );
}

use anyhow::Result;
use cake_core::{ModelEndpointConfig, Subject, SubjectConfig};
use clap::{Args, Subcommand};
use colored::Colorize;
use errors::ConfigurationError;
use responder::{Responder, SubjectConfigUpdate};

use crate::{output, ux_error};

#[derive(Subcommand)]
pub enum ConfigCommand {
    #[command(about = "Show subject configurations (credentials masked)")]
    Show(ShowArgs),

    #[command(about = "Apply a partial JSON update to one subject")]
    Update(UpdateArgs),
}

#[derive(Args)]
pub struct ShowArgs {
    #[arg(long, help = "Only show this subject")]
    pub subject: Option<String>,

    #[arg(long, help = "Output as JSON")]
    pub json: bool,
}

#[derive(Args)]
pub struct UpdateArgs {
    #[arg(help = "Subject tag to update")]
    pub subject: String,

    #[arg(help = "Partial update, e.g. '{\"primary\": {\"temperature\": 0.5}}'")]
    pub patch: String,

    #[arg(long, help = "Output as JSON")]
    pub json: bool,
}

pub async fn run(responder: &Responder, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show(args) => show(responder, args),
        ConfigCommand::Update(args) => update(responder, args).await,
    }
}

fn show(responder: &Responder, args: ShowArgs) -> Result<()> {
    let mut snapshot = responder.admin.config_snapshot();

    if let Some(tag) = &args.subject {
        let Some(subject) = Subject::from_tag(tag) else {
            ux_error::unknown_subject(tag).display();
            return Err(anyhow::anyhow!("Unknown subject: {tag}"));
        };
        snapshot.subjects.retain(|s, _| *s == subject);
    }

    if args.json {
        return output::json(&snapshot);
    }

    output::header("Subject Configuration");
    for config in snapshot.subjects.values() {
        println!();
        print_subject(config);
    }
    println!();
    println!(
        "  {} {}",
        "providers:".dimmed(),
        snapshot
            .available_providers
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(())
}

async fn update(responder: &Responder, args: UpdateArgs) -> Result<()> {
    let patch: SubjectConfigUpdate = match serde_json::from_str(&args.patch) {
        Ok(p) => p,
        Err(e) => {
            ux_error::invalid_update_json(&e.to_string()).display();
            return Err(anyhow::anyhow!("Invalid update JSON"));
        }
    };

    let updated = match responder
        .admin
        .update_subject_config(&args.subject, patch)
        .await
    {
        Ok(config) => config,
        Err(e) => {
            report_rejection(&args.subject, &e);
            return Err(e.into());
        }
    };

    if args.json {
        return output::json(&updated);
    }

    output::success(&format!("Updated {}", updated.subject));
    print_subject(&updated);
    Ok(())
}

fn report_rejection(tag: &str, error: &ConfigurationError) {
    match error {
        ConfigurationError::UnknownSubject { .. } => ux_error::unknown_subject(tag).display(),
        ConfigurationError::Validation { field, reason } => {
            ux_error::update_rejected(field, reason).display();
        }
        other => output::error(&other.to_string()),
    }
}

fn print_subject(config: &SubjectConfig) {
    output::subheader(&config.subject.to_string());
    print_endpoint("primary", &config.primary);
    match &config.secondary {
        Some(secondary) => print_endpoint("secondary", secondary),
        None => println!("  {:<11} {}", "secondary:", "(none)".dimmed()),
    }
    let cache = if config.cache_eligible {
        format!("{}s", config.cache_ttl_secs).green()
    } else {
        "off".red()
    };
    println!("  {:<11} {}", "cache:", cache);
}

fn print_endpoint(label: &str, endpoint: &ModelEndpointConfig) {
    if endpoint.provider.is_static() {
        println!("  {:<11} {}", format!("{label}:"), "static".cyan());
        return;
    }
    println!(
        "  {:<11} {} {}",
        format!("{label}:"),
        format!("{}/{}", endpoint.provider, endpoint.model_name).cyan(),
        format!(
            "(temperature {}, max_tokens {}, timeout {}s, {} attempts)",
            endpoint.temperature,
            endpoint.max_tokens,
            endpoint.timeout_secs,
            endpoint.retry_attempts
        )
        .dimmed()
    );
}

use anyhow::Result;
use cake_core::{GeneratedResponse, ResponseContext};
use clap::Args;
use colored::Colorize;
use responder::Responder;

use crate::{output, ux_error};

#[derive(Args)]
pub struct GenerateArgs {
    #[arg(help = "Subject tag, e.g. task_completion or task-completion")]
    pub subject: String,

    #[arg(long, help = "Context as a flat JSON object")]
    pub context: Option<String>,

    #[arg(long, help = "Skip the cache and the connectivity check")]
    pub force: bool,

    #[arg(long, help = "Output as JSON")]
    pub json: bool,
}

pub async fn run(responder: &Responder, args: GenerateArgs) -> Result<()> {
    let context = parse_context(args.context.as_deref())?;

    let response = responder
        .orchestrator
        .generate_for_tag(&args.subject, &context, args.force)
        .await;

    if args.json {
        return output::json(&response);
    }

    print_response(&response);
    Ok(())
}

fn parse_context(raw: Option<&str>) -> Result<ResponseContext> {
    let Some(raw) = raw else {
        return Ok(ResponseContext::new());
    };

    let value: serde_json::Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            ux_error::invalid_context_json(&e.to_string()).display();
            return Err(anyhow::anyhow!("Invalid context JSON"));
        }
    };

    match ResponseContext::from_json(&value) {
        Some(ctx) => Ok(ctx),
        None => {
            ux_error::invalid_context_json("expected a JSON object").display();
            Err(anyhow::anyhow!("Invalid context JSON"))
        }
    }
}

fn print_response(response: &GeneratedResponse) {
    println!("{}", response.text.bold());
    println!(
        "  {} {}  {} {}  {} {}",
        "mood:".dimmed(),
        response.mood.cyan(),
        "animation:".dimmed(),
        response.animation.cyan(),
        "from:".dimmed(),
        output::provenance(response.provenance)
    );
    if let Some(reason) = response.fallback_reason() {
        println!("  {} {}", "reason:".dimmed(), reason.yellow());
    }
}

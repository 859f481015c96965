use anyhow::Result;
use cake_core::Subject;
use clap::{Args, Subcommand};
use colored::Colorize;
use responder::Responder;

use crate::{output, ux_error};

#[derive(Subcommand)]
pub enum FallbacksCommand {
    #[command(about = "List canned responses per subject")]
    List(ListArgs),
}

#[derive(Args)]
pub struct ListArgs {
    #[arg(long, help = "Only list this subject")]
    pub subject: Option<String>,

    #[arg(long, help = "Output as JSON")]
    pub json: bool,
}

pub fn run(responder: &Responder, cmd: FallbacksCommand) -> Result<()> {
    match cmd {
        FallbacksCommand::List(args) => list(responder, args),
    }
}

fn list(responder: &Responder, args: ListArgs) -> Result<()> {
    let mut listing = responder.admin.list_fallbacks();

    if let Some(tag) = &args.subject {
        let Some(subject) = Subject::from_tag(tag) else {
            ux_error::unknown_subject(tag).display();
            return Err(anyhow::anyhow!("Unknown subject: {tag}"));
        };
        listing.responses.retain(|s, _| *s == subject);
        listing.total = listing.responses.values().map(Vec::len).sum();
    }

    if args.json {
        return output::json(&listing);
    }

    output::header(&format!("Canned Responses ({})", listing.total));
    for (subject, responses) in &listing.responses {
        println!();
        output::subheader(&subject.to_string());
        for response in responses {
            println!(
                "  {} {}",
                format!("[{}/{} x{}]", response.context_tag, response.mood, response.weight)
                    .dimmed(),
                response.text
            );
        }
    }
    Ok(())
}

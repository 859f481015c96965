use anyhow::Result;
use clap::Args;
use colored::Colorize;
use responder::Responder;
use responder::admin::SyncOutcome;

use crate::output;

#[derive(Args)]
pub struct SyncArgs {
    #[arg(
        long,
        value_delimiter = ',',
        help = "Comma-separated subject tags (default: all subjects)",
    )]
    pub subjects: Option<Vec<String>>,

    #[arg(long, help = "Output as JSON")]
    pub json: bool,
}

pub async fn run(responder: &Responder, args: SyncArgs) -> Result<()> {
    let results = responder.admin.sync(args.subjects).await;

    if args.json {
        return output::json(&results);
    }

    output::header("Sync");
    println!();
    let mut added_total = 0;
    for (subject, outcome) in &results {
        let line = match outcome {
            SyncOutcome::Synced { added } => {
                added_total += added;
                format!("{added} added").green()
            }
            SyncOutcome::InvalidSubject => "invalid subject".red(),
            SyncOutcome::Error { reason } => format!("error: {reason}").red(),
        };
        println!("  {:<20} {}", subject, line);
    }

    println!();
    if added_total == 0 {
        output::warn("No live responses were generated; check provider connectivity");
    } else {
        output::success(&format!("{added_total} responses added to the canned library"));
    }
    Ok(())
}

use anyhow::Result;
use clap::Args;
use responder::Responder;

use crate::output;

#[derive(Args)]
pub struct ConnectivityArgs {
    #[arg(long, help = "Output as JSON")]
    pub json: bool,
}

pub fn run(responder: &Responder, args: ConnectivityArgs) -> Result<()> {
    let results = responder.admin.test_connectivity();

    if args.json {
        return output::json(&results);
    }

    output::header("Provider Connectivity");
    println!();
    for (provider, status) in &results {
        output::provider_line(*provider, status);
    }
    Ok(())
}

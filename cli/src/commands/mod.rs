pub mod connectivity;
pub mod fallbacks;
pub mod generate;
pub mod status;
pub mod subject_config;
pub mod sync;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "cake",
    author,
    version,
    about = "cake - encouragement responses for the task planner",
    long_about = "Generates short, mood-tagged encouragement for task events.\n\nResponses come \
                  from the response cache, a configured language model, a secondary model, or \
                  the built-in canned library, in that order.\nConfiguration is read from CAKE_* \
                  and provider environment variables unless --config is given.",
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        env = "CAKE_CONFIG_FILE",
        help = "Process configuration file (.toml, .yaml or .json)",
    )]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Generate a response for a subject")]
    Generate(generate::GenerateArgs),

    #[command(about = "Show configured subjects, fallback counts and provider health")]
    Status(status::StatusArgs),

    #[command(about = "Probe every provider and report reachability")]
    Connectivity(connectivity::ConnectivityArgs),

    #[command(subcommand, about = "Show or update per-subject model configuration")]
    Config(subject_config::ConfigCommand),

    #[command(subcommand, about = "Inspect the canned response library")]
    Fallbacks(fallbacks::FallbacksCommand),

    #[command(about = "Generate fresh responses and add them to the canned library")]
    Sync(sync::SyncArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_args() {
        let cli = Cli::try_parse_from([
            "cake",
            "generate",
            "task-completion",
            "--context",
            r#"{"task_title":"Frost"}"#,
            "--force",
        ])
        .unwrap();

        match cli.command {
            Commands::Generate(args) => {
                assert_eq!(args.subject, "task-completion");
                assert!(args.force);
                assert!(!args.json);
                assert_eq!(args.context.as_deref(), Some(r#"{"task_title":"Frost"}"#));
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn test_global_config_flag_after_subcommand() {
        let cli = Cli::try_parse_from(["cake", "status", "--config", "cake.toml", "--json"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("cake.toml")));
        assert!(matches!(cli.command, Commands::Status(ref a) if a.json));
    }

    #[test]
    fn test_sync_subject_list() {
        let cli = Cli::try_parse_from(["cake", "sync", "--subjects", "motivation,celebration"])
            .unwrap();
        match cli.command {
            Commands::Sync(args) => assert_eq!(
                args.subjects,
                Some(vec!["motivation".to_string(), "celebration".to_string()])
            ),
            _ => panic!("expected sync"),
        }
    }

    #[test]
    fn test_config_update_requires_patch() {
        assert!(Cli::try_parse_from(["cake", "config", "update", "motivation"]).is_err());
    }

    #[test]
    fn test_generate_requires_subject() {
        assert!(Cli::try_parse_from(["cake", "generate"]).is_err());
    }
}

use cake_core::Subject;
use colored::Colorize;

#[derive(Debug)]
pub struct UxError {
    pub what: String,
    pub why: Option<String>,
    pub how_to_fix: Vec<String>,
    pub suggested_command: Option<String>,
}

impl UxError {
    pub fn new(what: impl Into<String>) -> Self {
        Self {
            what: what.into(),
            why: None,
            how_to_fix: Vec::new(),
            suggested_command: None,
        }
    }

    pub fn why(mut self, reason: impl Into<String>) -> Self {
        self.why = Some(reason.into());
        self
    }

    pub fn fix(mut self, suggestion: impl Into<String>) -> Self {
        self.how_to_fix.push(suggestion.into());
        self
    }

    pub fn suggest(mut self, cmd: impl Into<String>) -> Self {
        self.suggested_command = Some(cmd.into());
        self
    }

    pub fn display(&self) {
        eprintln!();
        eprintln!("{} {}", "error:".red().bold(), self.what.white().bold());

        if let Some(why) = &self.why {
            eprintln!("       {}", why.dimmed());
        }

        if !self.how_to_fix.is_empty() {
            eprintln!();
            eprintln!("{}", "How to fix:".yellow().bold());
            for (i, fix) in self.how_to_fix.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, fix);
            }
        }

        if let Some(cmd) = &self.suggested_command {
            eprintln!();
            eprintln!("{}", "Try this:".green().bold());
            eprintln!("  $ {}", cmd.cyan());
        }
        eprintln!();
    }
}

impl std::fmt::Display for UxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.what)
    }
}

impl std::error::Error for UxError {}

pub fn unknown_subject(tag: &str) -> UxError {
    let valid: Vec<String> = Subject::all().iter().map(ToString::to_string).collect();
    UxError::new(format!("Unknown subject: '{}'", tag))
        .why(format!("Valid subjects are: {}", valid.join(", ")))
        .fix("Use snake_case or kebab-case, e.g. task_completion or task-completion")
        .suggest("cake config show")
}

pub fn invalid_context_json(error: &str) -> UxError {
    UxError::new("Invalid context JSON")
        .why(format!("Parse error: {}", error))
        .fix("Provide a flat JSON object for the --context flag")
        .fix("Example: --context '{\"task_title\": \"Write report\", \"mood\": \"excited\"}'")
}

pub fn invalid_update_json(error: &str) -> UxError {
    UxError::new("Invalid configuration update")
        .why(format!("Parse error: {}", error))
        .fix("Provide a JSON object with the fields to change")
        .suggest("cake config update motivation '{\"primary\": {\"temperature\": 0.5}}'")
}

pub fn update_rejected(field: &str, reason: &str) -> UxError {
    UxError::new(format!("Update rejected: {}", field))
        .why(reason.to_string())
        .fix("Nothing was changed; correct the value and retry")
        .suggest("cake config show --subject <subject>")
}

pub fn config_error(message: &str) -> UxError {
    UxError::new(format!("Configuration error: {}", message))
        .why("The configuration file may be invalid or use an unsupported extension")
        .fix("Use a .toml, .yaml, .yml or .json file")
        .fix("Or drop --config and use CAKE_* environment variables")
        .suggest("cake status")
}

//! User-prompt rendering from a subject's template and the call context.

use cake_core::{ResponseContext, SubjectConfig};
use regex::{Captures, Regex};

/// Rendered prompt plus the placeholders that had no context value.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPrompt {
    pub text: String,
    pub missing: Vec<String>,
}

pub struct PromptRenderer {
    placeholder: Regex,
}

impl PromptRenderer {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            placeholder: Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}")?,
        })
    }

    /// Substitutes `{name}` placeholders. A placeholder without a matching
    /// context key stays in the text as written. The result is cut to the
    /// subject's `max_context_length` characters.
    pub fn render(&self, config: &SubjectConfig, context: &ResponseContext) -> RenderedPrompt {
        let mut missing = Vec::new();

        let text = if config.prompt_template.trim().is_empty() {
            format!(
                "Generate a response for {} with context: {}",
                config.subject,
                context.canonical_string()
            )
        } else {
            self.placeholder
                .replace_all(&config.prompt_template, |caps: &Captures<'_>| {
                    let name = &caps[1];
                    match context.get(name) {
                        Some(value) => value.to_string(),
                        None => {
                            missing.push(name.to_string());
                            caps[0].to_string()
                        }
                    }
                })
                .into_owned()
        };

        RenderedPrompt {
            text: utils::truncate_chars(&text, config.max_context_length).to_string(),
            missing,
        }
    }
}

//! System prompt loading
//!
//! The persona lives in a plain text file the operator supplies. Without
//! one, a neutral instruction to answer from the supplied context is used.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

pub const FALLBACK_PROMPT: &str = "\
You will be given a JSON object with a `context` drawn from a collection of quotes \
and a `userQuestion`. Answer the question using only the context. \
Be polite and concise, and keep the answer within 5-8 lines.";

/// Read the system prompt
///
/// An explicitly given path must exist. Otherwise `default_path` is used if
/// present, and [`FALLBACK_PROMPT`] if not.
pub fn load_system_prompt(explicit: Option<&Path>, default_path: &Path) -> Result<String> {
    if let Some(path) = explicit {
        let prompt = fs::read_to_string(path)
            .with_context(|| format!("Failed to read system prompt {}", path.display()))?;
        info!("Using system prompt from {}", path.display());
        return Ok(prompt);
    }

    if default_path.is_file() {
        let prompt = fs::read_to_string(default_path)
            .with_context(|| format!("Failed to read system prompt {}", default_path.display()))?;
        info!("Using system prompt from {}", default_path.display());
        return Ok(prompt);
    }

    warn!(
        "No system prompt at {}, using the built-in fallback",
        default_path.display()
    );
    Ok(FALLBACK_PROMPT.to_string())
}

//! Reading records from stdin or an editor, and operator prompts

use std::env;
use std::fs;
use std::io::{self, IsTerminal, Read, Write};
use std::process::Command;

use anyhow::{anyhow, bail, Context, Result};
use console::Term;

use crate::config::OutputFormat;

const DEFAULT_EDITOR: &str = "vi";

/// Text piped on stdin, or `None` when stdin is a terminal or empty
pub fn piped_stdin() -> Result<Option<String>> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut text = String::new();
    stdin
        .lock()
        .read_to_string(&mut text)
        .context("could not process STDIN")?;

    Ok(if text.trim().is_empty() { None } else { Some(text) })
}

/// Take the new version of a record from stdin when something was piped in,
/// otherwise open the editor on the text `initial` produces
pub fn stdin_or_editor<F>(format: OutputFormat, initial: F) -> Result<String>
where
    F: FnOnce() -> Result<String>,
{
    if let Some(text) = piped_stdin()? {
        return Ok(text);
    }

    edit_text(&initial()?, format)
}

/// Open `$EDITOR` on `text` and return what was saved
pub fn edit_text(text: &str, format: OutputFormat) -> Result<String> {
    let suffix = match format {
        OutputFormat::Json => ".json",
        OutputFormat::Yaml => ".yaml",
    };

    let mut file = tempfile::Builder::new()
        .prefix("tbnctl-")
        .suffix(suffix)
        .tempfile()
        .context("Unable to create editor buffer")?;
    file.write_all(text.as_bytes())?;
    file.flush()?;

    let editor = env::var("EDITOR").unwrap_or_else(|_| DEFAULT_EDITOR.to_string());
    let mut words = editor.split_whitespace();
    let program = words
        .next()
        .ok_or_else(|| anyhow!("EDITOR is set but empty"))?;

    let status = Command::new(program)
        .args(words)
        .arg(file.path())
        .status()
        .with_context(|| format!("Unable to launch editor '{}'", editor))?;
    if !status.success() {
        bail!("editor '{}' exited with {}", editor, status);
    }

    let edited = fs::read_to_string(file.path()).context("Unable to read editor buffer")?;
    if edited.trim().is_empty() {
        bail!("nothing to do: the editor buffer was empty");
    }
    Ok(edited)
}

/// Ask a yes/no question on the terminal; anything but yes is a no
pub fn confirm(question: &str) -> crate::error::Result<bool> {
    let term = Term::stderr();
    term.write_str(&format!("{} (y/N) ", question.trim_end()))?;
    let answer = term.read_line()?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Prompt for a value, offering `default` when one is known
pub fn prompt(label: &str, default: Option<&str>) -> Result<String> {
    let term = Term::stderr();
    match default.filter(|d| !d.is_empty()) {
        Some(d) => term.write_str(&format!("{} [{}]: ", label, d))?,
        None => term.write_str(&format!("{}: ", label))?,
    }

    let value = term.read_line()?.trim().to_string();
    if value.is_empty() {
        return default
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .ok_or_else(|| anyhow!("{} is required", label.to_lowercase()));
    }
    Ok(value)
}

/// Prompt for a value without echoing it
pub fn prompt_secret(label: &str) -> Result<String> {
    let term = Term::stderr();
    term.write_str(&format!("{}: ", label))?;
    let value = term.read_secure_line()?;
    if value.is_empty() {
        bail!("{} is required", label.to_lowercase());
    }
    Ok(value)
}

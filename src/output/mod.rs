//! Output formatting module

use std::io::{self, Write};

use owo_colors::OwoColorize;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::OutputFormat;
use crate::error::Result;

/// Encode a value with the configured codec
pub fn encode<T: Serialize + ?Sized>(data: &T, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(data)?,
        OutputFormat::Yaml => serde_yaml::to_string(data)?,
    })
}

/// Decode a value with the configured codec
pub fn decode<T: DeserializeOwned>(text: &str, format: OutputFormat) -> Result<T> {
    Ok(match format {
        OutputFormat::Json => serde_json::from_str(text)?,
        OutputFormat::Yaml => serde_yaml::from_str(text)?,
    })
}

/// Print output in the configured format
pub fn print_output<T: Serialize + ?Sized>(data: &T, format: OutputFormat) -> Result<()> {
    let text = encode(data, format)?;
    let mut stdout = io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    if !text.ends_with('\n') {
        stdout.write_all(b"\n")?;
    }
    Ok(())
}

/// Print success message
pub fn success(msg: &str) {
    eprintln!("{} {}", "✓".green().bold(), msg);
}

/// Print error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red().bold(), msg);
}

/// Print warning message
pub fn warning(msg: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), msg);
}

/// Print info message
pub fn info(msg: &str) {
    eprintln!("{} {}", "ℹ".blue().bold(), msg);
}

/// Print tab separated rows as aligned columns
pub fn table(header: Option<&str>, rows: &[String]) {
    let split = |line: &str| line.split('\t').map(str::to_string).collect::<Vec<_>>();

    let header = header.map(split);
    let rows: Vec<Vec<String>> = rows.iter().map(|r| split(r)).collect();

    let mut widths: Vec<usize> = Vec::new();
    for cells in header.iter().chain(rows.iter()) {
        for (i, cell) in cells.iter().enumerate() {
            let w = console::measure_text_width(cell);
            match widths.get_mut(i) {
                Some(max) => *max = (*max).max(w),
                None => widths.push(w),
            }
        }
    }

    let render = |cells: &[String]| -> String {
        let last = cells.len().saturating_sub(1);
        cells
            .iter()
            .enumerate()
            .map(|(i, c)| {
                if i == last {
                    c.clone()
                } else {
                    console::pad_str(c, widths[i], console::Alignment::Left, None).into_owned()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    };

    if let Some(header) = header {
        println!("{}", render(&header).bold());
    }
    for cells in &rows {
        println!("{}", render(cells));
    }
}

/// Print a name/type listing, indented, as shown by `list --show-filter-fields`
pub fn field_table<'a>(fields: impl IntoIterator<Item = (&'a str, &'a str)>) {
    let rows: Vec<String> = fields
        .into_iter()
        .map(|(name, kind)| format!("    {}\t{}", name.cyan(), kind))
        .collect();
    table(Some("    NAME\tTYPE"), &rows);
}

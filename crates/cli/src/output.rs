// SPDX-License-Identifier: MIT

//! Output formatting: every command can render either a human-readable
//! summary or a `--json` payload of the same data.

use clap::ValueEnum;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Prints `data` as pretty JSON when `format` is [`OutputFormat::Json`],
/// otherwise calls `text_fn` to render the human-readable form.
pub fn format_or_json<T, F>(format: OutputFormat, data: &T, text_fn: F)
where
    T: Serialize,
    F: FnOnce(&T),
{
    match format {
        OutputFormat::Json => match serde_json::to_string_pretty(data) {
            Ok(body) => println!("{body}"),
            Err(err) => eprintln!("failed to encode output as json: {err}"),
        },
        OutputFormat::Text => text_fn(data),
    }
}

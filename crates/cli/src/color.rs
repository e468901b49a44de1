// SPDX-License-Identifier: MIT

//! Terminal color policy, shared by `main`'s `clap::builder::styling::Styles`
//! and any command that prints colored status text.

use std::io::IsTerminal;

pub fn should_colorize() -> bool {
    if std::env::var("NO_COLOR").is_ok_and(|v| v == "1") {
        return false;
    }
    if std::env::var("FORCE_COLOR").is_ok_and(|v| v == "1") {
        return true;
    }
    std::io::stdout().is_terminal()
}

pub mod codes {
    pub const GREEN: u8 = 2;
    pub const RED: u8 = 1;
    pub const YELLOW: u8 = 3;
    pub const CYAN: u8 = 6;
}

pub fn paint(code: u8, text: &str) -> String {
    if should_colorize() {
        format!("\x1b[3{code}m{text}\x1b[0m")
    } else {
        text.to_string()
    }
}

pub fn styles() -> clap::builder::styling::Styles {
    use clap::builder::styling::{AnsiColor, Styles};
    Styles::styled()
        .header(AnsiColor::Cyan.on_default().bold())
        .usage(AnsiColor::Cyan.on_default().bold())
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Yellow.on_default())
}

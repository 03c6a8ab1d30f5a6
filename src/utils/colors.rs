// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 plugflow contributors

//! Terminal color utilities
//!
//! Provides consistent color schemes across the CLI.

use colored::{ColoredString, Colorize};
use std::fmt::Display;

/// Leading mark of a status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Error,
    Warning,
    Info,
}

impl Status {
    fn mark(self) -> ColoredString {
        match self {
            Self::Ok => "✓".green(),
            Self::Error => "✗".red(),
            Self::Warning => "⚠".yellow(),
            Self::Info => "→".blue(),
        }
    }
}

/// Whether the terminal should get colors (honors `NO_COLOR`)
pub fn should_use_colors() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }

    std::env::var_os("TERM").is_some_and(|term| term != "dumb")
}

/// Print a blank line and a bold section title
pub fn print_section(title: impl Display) {
    println!();
    println!("{}:", title.to_string().bold());
}

/// Print an indented line with a colored status mark
pub fn print_status(status: Status, msg: impl Display) {
    println!("  {} {}", status.mark(), msg);
}

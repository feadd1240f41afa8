//! Status lines for the maintenance commands
//!
//! Each line carries a marker: a coloured symbol on a terminal, a
//! bracketed tag when output is piped, so scripts can grep for `[OK]`.

use super::context::UiContext;
use console::{style, StyledObject};
use std::io::{self, Write};

#[derive(Clone, Copy)]
enum Marker {
    Ok,
    Warn,
    Info,
}

impl Marker {
    fn render(self, ctx: &UiContext) -> StyledObject<&'static str> {
        let (symbol, tag) = match self {
            Self::Ok => ("✓", "[OK]"),
            Self::Warn => ("▲", "[WARN]"),
            Self::Info => ("●", "[INFO]"),
        };
        let text = if ctx.is_interactive() { symbol } else { tag };
        match self {
            Self::Ok => style(text).green(),
            Self::Warn => style(text).yellow(),
            Self::Info => style(text).cyan(),
        }
    }
}

fn line(ctx: &UiContext, marker: Marker, body: &str) {
    let indent = if ctx.is_interactive() { "" } else { "  " };
    println!("{}{} {}", indent, marker.render(ctx), body);
}

/// Heading printed before a block of key/value lines
pub fn intro(ctx: &UiContext, title: &str) {
    let heading = style(title).cyan().bold();
    if ctx.is_interactive() {
        println!("{} {}", style("◆").cyan(), heading);
    } else {
        println!("{}", heading);
    }
    println!();
}

pub fn step_ok(ctx: &UiContext, message: &str) {
    line(ctx, Marker::Ok, message);
}

/// Success line with a dimmed detail, usually the snapshot path
pub fn step_ok_detail(ctx: &UiContext, message: &str, detail: &str) {
    let detail = if ctx.is_interactive() {
        style(detail).dim().to_string()
    } else {
        detail.to_string()
    };
    line(ctx, Marker::Ok, &format!("{} ({})", message, detail));
}

/// Warning line followed by what the user can do about it
pub fn step_warn_hint(ctx: &UiContext, message: &str, hint: &str) {
    let hint = if ctx.is_interactive() {
        style(hint).dim().to_string()
    } else {
        hint.to_string()
    };
    line(ctx, Marker::Warn, &format!("{} - {}", message, hint));
}

pub fn step_info(ctx: &UiContext, message: &str) {
    line(ctx, Marker::Info, message);
}

/// Indented `key: value` line, the key dimmed on a terminal
pub fn key_value(ctx: &UiContext, key: &str, value: &str) {
    if ctx.is_interactive() {
        println!("  {}: {}", style(key).dim(), value);
    } else {
        println!("  {}: {}", key, value);
    }
}

/// Ask a yes/no question, defaulting to no
///
/// Returns true without asking under `--yes`, false without asking when
/// there is no terminal to answer from.
pub fn confirm(ctx: &UiContext, question: &str) -> bool {
    if ctx.auto_yes() {
        return true;
    }
    if !ctx.is_interactive() {
        return false;
    }

    print!("{} [y/N] ", question);
    let _ = io::stdout().flush();

    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_err() {
        return false;
    }
    input.trim().eq_ignore_ascii_case("y")
}

//! Terminal styling for CLI output.

use std::io::IsTerminal;

use owo_colors::OwoColorize;

/// What a line of output reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Success,
    Warning,
    Error,
    Accent,
}

/// Colour `text` for stdout, plain when stdout is not a terminal.
pub fn paint(tone: Tone, text: impl AsRef<str>) -> String {
    render(tone, text.as_ref(), std::io::stdout().is_terminal())
}

/// Colour `text` for stderr, plain when stderr is not a terminal.
pub fn paint_stderr(tone: Tone, text: impl AsRef<str>) -> String {
    render(tone, text.as_ref(), std::io::stderr().is_terminal())
}

fn render(tone: Tone, text: &str, colored: bool) -> String {
    if !colored {
        return text.to_string();
    }
    match tone {
        Tone::Success => text.green().to_string(),
        Tone::Warning => text.yellow().to_string(),
        Tone::Error => text.red().bold().to_string(),
        Tone::Accent => text.cyan().to_string(),
    }
}

/// Startup banner followed by the effective arguments, one per line.
pub fn print_banner(arguments: &[(&str, String)]) {
    println!(
        "{}",
        paint(
            Tone::Accent,
            format!("Welcome to Swordfish version {}", swordfish::VERSION)
        )
    );
    for line in argument_lines(arguments) {
        println!("{line}");
    }
    println!();
}

fn argument_lines(arguments: &[(&str, String)]) -> Vec<String> {
    let width = arguments
        .iter()
        .map(|(name, _)| name.len())
        .max()
        .unwrap_or(0);
    arguments
        .iter()
        .map(|(name, value)| format!("  {name:<width$}  {value}"))
        .collect()
}

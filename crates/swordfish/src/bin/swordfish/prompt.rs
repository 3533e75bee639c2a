//! Interactive prompts for the setup wizard.
//!
//! Uses dialoguer on a terminal and falls back to plain line reads when
//! stdin or stdout is redirected.

use std::io::{self, IsTerminal, Write};

use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};

fn use_dialoguer() -> bool {
    io::stdin().is_terminal() && io::stdout().is_terminal()
}

fn read_answer(prompt: &str) -> anyhow::Result<String> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().read_line(&mut line)? == 0 {
        anyhow::bail!("input closed before setup finished");
    }
    Ok(line.trim().to_string())
}

pub(crate) fn prompt_string(label: &str, default: Option<&str>) -> anyhow::Result<String> {
    if use_dialoguer() {
        let theme = ColorfulTheme::default();
        let mut input = Input::<String>::with_theme(&theme).with_prompt(label);
        if let Some(default) = default {
            input = input.default(default.to_string());
        }
        return Ok(input.interact_text()?.trim().to_string());
    }
    loop {
        let answer = match default {
            Some(default) => read_answer(&format!("{label} [{default}]: "))?,
            None => read_answer(&format!("{label}: "))?,
        };
        match (answer.is_empty(), default) {
            (false, _) => return Ok(answer),
            (true, Some(default)) => return Ok(default.to_string()),
            (true, None) => println!("A value is required."),
        }
    }
}

/// Pick one of `options`; returns its index.
pub(crate) fn prompt_choice(label: &str, options: &[&str], default: usize) -> anyhow::Result<usize> {
    if use_dialoguer() {
        let theme = ColorfulTheme::default();
        let selection = Select::with_theme(&theme)
            .with_prompt(label)
            .items(options)
            .default(default)
            .interact()?;
        return Ok(selection);
    }
    let default_text = options.get(default).copied().unwrap_or_default();
    let answer = read_answer(&format!("{label} ({}) [{default_text}]: ", options.join("/")))?;
    if answer.is_empty() {
        return Ok(default);
    }
    options
        .iter()
        .position(|option| option.eq_ignore_ascii_case(&answer))
        .ok_or_else(|| {
            anyhow::anyhow!(
                "invalid choice '{answer}', expected one of: {}",
                options.join(", ")
            )
        })
}

pub(crate) fn prompt_port(label: &str, default: u16) -> anyhow::Result<u16> {
    let input = prompt_string(label, Some(&default.to_string()))?;
    input
        .parse::<u16>()
        .map_err(|err| anyhow::anyhow!("{label} must be a port number: {err}"))
}

pub(crate) fn prompt_yes_no(label: &str, default: bool) -> anyhow::Result<bool> {
    if use_dialoguer() {
        let theme = ColorfulTheme::default();
        let confirmed = Confirm::with_theme(&theme)
            .with_prompt(label)
            .default(default)
            .interact()?;
        return Ok(confirmed);
    }
    let default_text = if default { "Y/n" } else { "y/N" };
    let answer = read_answer(&format!("{label} [{default_text}]: "))?.to_ascii_lowercase();
    match answer.as_str() {
        "" => Ok(default),
        "y" | "yes" => Ok(true),
        "n" | "no" => Ok(false),
        _ => anyhow::bail!("please answer yes or no"),
    }
}

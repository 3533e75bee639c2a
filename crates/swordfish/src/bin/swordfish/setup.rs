//! Interactive setup: write a first readfish TOML for a barcoded run.

use std::fs;
use std::path::{Path, PathBuf};

use swordfish::template::{parse_barcodes, render_document, DocumentTemplate};

use crate::prompt::{prompt_choice, prompt_port, prompt_string, prompt_yes_no};
use crate::style::{self, Tone};

const DEFAULT_BASECALLER_HOST: &str = "localhost";
const DEFAULT_BASECALLER_PORT: u16 = 5555;

pub fn run_setup(path: PathBuf, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        let overwrite = prompt_yes_no(
            &format!("{} already exists. Overwrite it?", path.display()),
            false,
        )?;
        if !overwrite {
            println!(
                "{}",
                style::paint(Tone::Warning, "Setup cancelled; nothing was written.")
            );
            return Ok(());
        }
    }

    let deplete =
        prompt_choice("Deplete or enrich the chosen barcodes?", &["enrich", "deplete"], 0)? == 1;
    let basecaller_host = prompt_string("Basecaller host", Some(DEFAULT_BASECALLER_HOST))?;
    let basecaller_port = prompt_port("Basecaller port", DEFAULT_BASECALLER_PORT)?;
    let accept_multi_maps = prompt_yes_no("Accept reads that map to several targets?", true)?;
    let verb = if deplete { "deplete" } else { "enrich" };
    let barcodes = loop {
        let answer = prompt_string(
            &format!("Barcodes to {verb}, two digits each, comma separated (e.g. 01,07,19)"),
            None,
        )?;
        match parse_barcodes(&answer) {
            Ok(barcodes) => break barcodes,
            Err(err) => println!("{}", style::paint(Tone::Warning, err.to_string())),
        }
    };
    let barcode_kit = prompt_string("Barcode kit", None)?;
    let reference = loop {
        let answer = prompt_string("Reference path", None)?;
        if Path::new(&answer).exists() {
            break answer;
        }
        println!(
            "{}",
            style::paint(Tone::Warning, format!("{answer} does not exist, try again."))
        );
    };

    let document = render_document(&DocumentTemplate {
        deplete,
        basecaller_host,
        basecaller_port,
        accept_multi_maps,
        barcodes,
        barcode_kit,
        reference,
    });
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, document.to_toml_string()?)?;
    println!(
        "{}",
        style::paint(Tone::Success, format!("Wrote {}", path.display()))
    );
    Ok(())
}

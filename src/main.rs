//! `desalt` — render Salt-style pillar templates without a Salt master.
//!
//! Pillar data comes from a data file, the `DESALT_PILLAR` environment
//! variable, or nowhere at all; the template comes from a file argument
//! or standard input. The rendered result goes to standard output.
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

mod error;
mod pillar;
mod render;

use pillar::Format;

#[derive(Parser)]
#[command(
    name = "desalt",
    about = "Render Salt-style pillar templates without a Salt master"
)]
struct Cli {
    /// Template file (absent or `-` reads standard input)
    template: Option<PathBuf>,

    /// Pillar data file (YAML or JSON)
    #[arg(short, long)]
    pillar: Option<PathBuf>,

    /// Pillar data format
    #[arg(short, long, value_enum, default_value = "auto")]
    format: Format,

    /// Fail on undefined template variables instead of rendering them empty
    #[arg(long)]
    strict: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // The environment is consulted once, here; the resolver only sees
    // explicit arguments.
    let inline = std::env::var(pillar::PILLAR_ENV)
        .ok()
        .filter(|s| !s.trim().is_empty());

    let data = pillar::resolve(cli.pillar.as_deref(), inline.as_deref(), cli.format)
        .context("resolve pillar data")?;

    let template = read_template(cli.template.as_deref()).context("read template")?;

    let output = render::render(&template, &data, cli.strict).context("render template")?;

    // Nothing reaches stdout unless rendering succeeded in full.
    io::stdout()
        .write_all(output.as_bytes())
        .context("write rendered output")?;

    Ok(())
}

/// Read the template from a file, or from standard input when no path
/// (or `-`) is given.
fn read_template(path: Option<&Path>) -> Result<String> {
    match path {
        Some(p) if p.as_os_str() != "-" => {
            std::fs::read_to_string(p).with_context(|| format!("read {}", p.display()))
        }
        _ => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("read standard input")?;
            Ok(buf)
        }
    }
}

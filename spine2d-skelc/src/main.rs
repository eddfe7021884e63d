//! skelc - converts JSON skeleton documents to Spine 3.5 `.skel` files and back.

use anyhow::{Context, Result};
use clap::Parser;
use spine2d_skel::{EncodeOptions, SkeletonData, SkeletonDecoder, SkeletonEncoder};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "skelc")]
#[command(about = "Convert skeleton documents between JSON and the Spine 3.5 binary format")]
#[command(version)]
struct Cli {
    /// Input file (JSON document, or `.skel` with --decode)
    input: PathBuf,

    /// Output file
    #[arg(short, long)]
    output: PathBuf,

    /// Fill in a missing header version
    #[arg(short, long)]
    makeup: bool,

    /// Drop empty timelines and empty named skins
    #[arg(short = 'x', long)]
    trim: bool,

    /// Write non-essential (editor) data
    #[arg(short = 'e', long)]
    nonessential: bool,

    /// Decode a `.skel` file into a JSON document instead
    #[arg(short, long)]
    decode: bool,
}

impl Cli {
    fn encode_options(&self) -> EncodeOptions {
        EncodeOptions {
            nonessential: self.nonessential,
            trim: self.trim,
            makeup: self.makeup,
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            println!("skelc: {err:#}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let input = fs::read(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;
    let output = convert(cli, &input)
        .with_context(|| format!("failed to convert {}", cli.input.display()))?;
    fs::write(&cli.output, &output)
        .with_context(|| format!("failed to write {}", cli.output.display()))?;
    log::info!(
        "{} -> {} ({} bytes)",
        cli.input.display(),
        cli.output.display(),
        output.len()
    );
    Ok(())
}

fn convert(cli: &Cli, input: &[u8]) -> Result<Vec<u8>> {
    if cli.decode {
        if cli.makeup || cli.trim || cli.nonessential {
            log::warn!("--makeup, --trim and --nonessential only apply when encoding");
        }
        let data = SkeletonDecoder::new()
            .decode(input)
            .context("invalid .skel data")?;
        let mut json = serde_json::to_vec_pretty(&data).context("failed to serialize JSON")?;
        json.push(b'\n');
        return Ok(json);
    }

    let data: SkeletonData = serde_json::from_slice(input).context("invalid JSON document")?;
    log::debug!(
        "document: bones={} slots={} skins={} animations={}",
        data.bones.len(),
        data.slots.len(),
        data.skin_count(),
        data.animations.len()
    );
    let bytes = SkeletonEncoder::new(cli.encode_options())
        .encode(&data)
        .context("failed to encode .skel data")?;
    Ok(bytes)
}

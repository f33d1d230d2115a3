//! `mbox-text`: export an MBOX archive as chunked, headered plain-text files.

use std::path::PathBuf;

use clap::Parser;

use mboxsplit::cli::{self, CommonArgs};
use mboxsplit::export::OutputFormat;

#[derive(Parser)]
#[command(
    name = "mbox-text",
    version,
    about = "Extract message headers and bodies from an MBOX archive into chunked text files",
    after_help = "Every output file holds up to 150 messages, each introduced by a '# <index>' \
                  line and its Subject, From, To and Date headers."
)]
struct Cli {
    /// MBOX file to read
    #[arg(value_name = "MBOX_PATH")]
    mbox_path: PathBuf,

    /// Output text file path (extension included); a chunk number is inserted before the extension
    #[arg(value_name = "OUTPUT_PATH")]
    output_path: PathBuf,

    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cli::run(
        &cli.mbox_path,
        &cli.output_path,
        OutputFormat::HeaderedText,
        &cli.common,
    )
}

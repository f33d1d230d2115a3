//! `mbox-extract`: export an MBOX archive as chunked JSON, JSON Lines or CSV.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use mboxsplit::cli::{self, CommonArgs};
use mboxsplit::export::OutputFormat;

#[derive(Parser)]
#[command(
    name = "mbox-extract",
    version,
    about = "Extract messages from an MBOX archive into chunked JSON, JSONL or CSV files",
    after_help = "Every output file holds up to 150 messages. OUTPUT_PATH 'out/mail.json' \
                  produces out/mail-0000.json, out/mail-0001.json, ..."
)]
struct Cli {
    /// MBOX file to read
    #[arg(value_name = "MBOX_PATH")]
    mbox_path: PathBuf,

    /// Output file path (extension included); a chunk number is inserted before the extension
    #[arg(value_name = "OUTPUT_PATH")]
    output_path: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t = FormatArg::Json)]
    format: FormatArg,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatArg {
    Json,
    Jsonl,
    Csv,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Jsonl => OutputFormat::JsonLines,
            FormatArg::Csv => OutputFormat::Csv,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cli::run(
        &cli.mbox_path,
        &cli.output_path,
        cli.format.into(),
        &cli.common,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_config_help_mentions_chunk_size() {
        let help = Cli::command().render_help().to_string();
        assert!(help.contains("chunk_size"));
        assert!(help.contains("150"));
    }

    #[test]
    fn test_format_defaults_to_json() {
        let cli = Cli::try_parse_from(["mbox-extract", "in.mbox", "out.json"]).unwrap();
        assert!(matches!(cli.format, FormatArg::Json));
        assert_eq!(cli.common.verbose, 0);
    }

    #[test]
    fn test_unknown_format_rejected() {
        assert!(Cli::try_parse_from(["mbox-extract", "in.mbox", "out.x", "--format", "xml"]).is_err());
        assert!(Cli::try_parse_from(["mbox-extract", "in.mbox", "out.x", "--format", "text"]).is_err());
    }

    #[test]
    fn test_format_and_flags() {
        let cli =
            Cli::try_parse_from(["mbox-extract", "in.mbox", "out.csv", "--format", "csv", "-vv", "-q"])
                .unwrap();
        assert_eq!(OutputFormat::from(cli.format), OutputFormat::Csv);
        assert_eq!(cli.common.verbose, 2);
        assert!(cli.common.quiet);
    }
}

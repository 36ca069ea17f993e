use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "dedup",
    about = "Deduplicating content-addressed blob store",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML configuration file with [store] and [fingerprint] sections
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Store root directory (overrides the configuration file)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Store a file and print its locator
    Put(PutArgs),
    /// Write stored content to stdout
    Cat(LocatorArgs),
    /// Delete stored content
    Rm(LocatorArgs),
    /// Print the filesystem path behind a locator
    Path(LocatorArgs),
    /// List every stored blob
    Ls,
    /// Print fingerprint records for a file
    Digest(DigestArgs),
}

#[derive(Args)]
pub struct PutArgs {
    pub file: PathBuf,
    #[arg(long)]
    pub mimetype: Option<String>,
    #[arg(long)]
    pub encoding: Option<String>,
}

#[derive(Args)]
pub struct LocatorArgs {
    pub locator: String,
}

#[derive(Args)]
pub struct DigestArgs {
    pub file: PathBuf,
    /// Comma-separated algorithm list (defaults to the configured one)
    #[arg(long)]
    pub algorithms: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_put_with_globals() {
        let cli = Cli::try_parse_from([
            "dedup", "--root", "/srv/blobs", "put", "a.txt", "--mimetype", "text/plain", "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.root, Some(PathBuf::from("/srv/blobs")));
        let Command::Put(args) = cli.command else {
            panic!("expected put");
        };
        assert_eq!(args.file, PathBuf::from("a.txt"));
        assert_eq!(args.mimetype.as_deref(), Some("text/plain"));
    }

    #[test]
    fn parses_digest_algorithms() {
        let cli = Cli::try_parse_from(["dedup", "digest", "f", "--algorithms", "SHA-1,SHA-256"]).unwrap();
        let Command::Digest(args) = cli.command else {
            panic!("expected digest");
        };
        assert_eq!(args.algorithms.as_deref(), Some("SHA-1,SHA-256"));
    }

    #[test]
    fn json_format() {
        let cli = Cli::try_parse_from(["dedup", "--format", "json", "ls"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(matches!(cli.command, Command::Ls));
    }
}

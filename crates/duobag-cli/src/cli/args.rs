use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "duobag",
    version,
    about = "Build, inspect and verify thesis submission bags"
)]
pub struct Cli {
    /// YAML config with `writer:` and `limits:` sections
    #[arg(long, global = true, env = "DUOBAG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Debug logging (overrides RUST_LOG)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a bag from a YAML plan
    Create(CreateArgs),
    /// Inspect a bag's members (verify + show table)
    Show(ShowArgs),
    /// Check every entry against the manifests
    Verify(VerifyArgs),
    /// Print the container's MD5 and file name
    Digest(DigestArgs),
}

#[derive(Args, Debug, Clone)]
pub struct CreateArgs {
    /// Plan file naming final, supporting, licence and metadata files
    #[arg(long)]
    pub plan: PathBuf,

    /// Output bag path (.tar.gz); its stem becomes the base directory
    #[arg(long, short = 'o')]
    pub out: PathBuf,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ShowFormat {
    #[default]
    Table,
    Json,
}

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    /// Bag path
    #[arg(value_name = "BAG")]
    pub bag: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    pub format: ShowFormat,

    /// Skip verification (show even if corrupt)
    #[arg(long)]
    pub no_verify: bool,
}

#[derive(Args, Debug, Clone)]
pub struct VerifyArgs {
    /// Bag path, or "-" for stdin
    #[arg(value_name = "BAG", default_value = "-")]
    pub bag: String,
}

#[derive(Args, Debug, Clone)]
pub struct DigestArgs {
    /// Bag path
    #[arg(value_name = "BAG")]
    pub bag: PathBuf,
}

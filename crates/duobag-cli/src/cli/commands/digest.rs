use crate::cli::args::DigestArgs;
use crate::config::CliConfig;
use crate::exit_codes;
use anyhow::{Context, Result};
use duobag_core::BagReader;

/// Prints `<md5>  <name>` in `md5sum` layout.
pub fn run(args: DigestArgs, config: &CliConfig) -> Result<i32> {
    let bag = BagReader::new(config.read_limits())
        .load_path(&args.bag)
        .with_context(|| format!("failed to load bag {}", args.bag.display()))?;

    let name = bag.whole_archive_name().unwrap_or("-");
    println!("{}  {}", bag.whole_archive_digest(), name);
    Ok(exit_codes::SUCCESS)
}

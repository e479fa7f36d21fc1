use crate::cli::args::VerifyArgs;
use crate::config::CliConfig;
use crate::exit_codes;
use anyhow::{Context, Result};
use duobag_core::{BagReader, EntryStatus, VerifyReport};
use std::io::{self, Cursor, Read};

pub fn run(args: VerifyArgs, config: &CliConfig) -> Result<i32> {
    let reader = BagReader::new(config.read_limits());
    let bag = if args.bag == "-" {
        // zip needs to seek, so the stream is buffered first.
        let limit = reader.limits().max_archive_bytes;
        let mut buf = Vec::new();
        io::stdin()
            .lock()
            .take(limit.saturating_add(1))
            .read_to_end(&mut buf)
            .context("failed to read bag from stdin")?;
        if buf.len() as u64 > limit {
            anyhow::bail!(duobag_core::BagError::Limit {
                path: "<stdin>".into(),
                message: format!("more than {limit} bytes on stdin"),
            });
        }
        reader.load(Cursor::new(buf)).context("failed to load bag from stdin")?
    } else {
        reader
            .load_path(&args.bag)
            .with_context(|| format!("failed to load bag {}", args.bag))?
    };

    let report = bag.verify();
    let label = if args.bag == "-" { "stdin" } else { args.bag.as_str() };
    if report.is_ok() {
        eprintln!("Bag verified ({label}): OK");
        return Ok(exit_codes::SUCCESS);
    }

    print_failures(&report);
    eprintln!(
        "Bag verification FAILED ({label}): {} of {} entries",
        report.failures().count(),
        report.entries.len()
    );
    Ok(exit_codes::VERIFY_FAILED)
}

pub(crate) fn print_failures(report: &VerifyReport) {
    for check in report.failures() {
        match &check.status {
            EntryStatus::Mismatch { expected, actual } => eprintln!(
                "  MISMATCH {} (expected {expected}, got {actual})",
                check.path
            ),
            EntryStatus::Missing if check.path == check.manifest => {
                eprintln!("  MISSING  {} (required)", check.path)
            }
            EntryStatus::Missing => eprintln!("  MISSING  {} (listed in {})", check.path, check.manifest),
            EntryStatus::Unlisted => {
                eprintln!("  UNLISTED {} (not in {})", check.path, check.manifest)
            }
            EntryStatus::Match => {}
        }
    }
}

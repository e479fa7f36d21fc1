use crate::cli::args::CreateArgs;
use crate::config::CliConfig;
use crate::exit_codes;
use crate::plan::Plan;
use anyhow::{Context, Result};
use duobag_core::BagWriter;
use std::path::Path;

pub fn run(args: CreateArgs, config: &CliConfig) -> Result<i32> {
    let plan = Plan::load(&args.plan)?;
    let plan_dir = args.plan.parent().unwrap_or_else(|| Path::new("."));
    let registry = plan.into_registry(plan_dir, &args.out)?;

    let summary = BagWriter::new(config.writer_options())
        .write_to_path(&registry, &args.out)
        .with_context(|| format!("failed to write bag {}", args.out.display()))?;

    eprintln!(
        "Wrote bag {} ({}, {} members, base dir {})",
        args.out.display(),
        summary.format.mime_type(),
        summary.payload.len(),
        summary.base_dir
    );
    if let Some(md5) = &summary.archive_md5 {
        eprintln!("MD5: {md5}");
    }
    Ok(exit_codes::SUCCESS)
}

use crate::cli::args::{ShowArgs, ShowFormat};
use crate::config::CliConfig;
use crate::exit_codes;
use anyhow::{Context, Result};
use duobag_core::{Access, Bag, BagReader, Member};
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Serialize)]
struct MemberView<'a> {
    role: String,
    path: String,
    name: &'a str,
    sequence: Option<u32>,
    access: Option<&'static str>,
    content_type: Option<&'a str>,
    md5: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct BagView<'a> {
    archive: Option<&'a str>,
    md5: &'a str,
    base_dir: &'a str,
    bagit_version: Option<&'a str>,
    mime_type: &'static str,
    packaging: &'static str,
    payload_bytes: u64,
    verified: Option<bool>,
    members: Vec<MemberView<'a>>,
    warnings: Vec<String>,
}

pub fn run(args: ShowArgs, config: &CliConfig) -> Result<i32> {
    let bag = BagReader::new(config.read_limits())
        .load_path(&args.bag)
        .with_context(|| format!("failed to load bag {}", args.bag.display()))?;

    let verified = if args.no_verify {
        None
    } else {
        let report = bag.verify();
        if !report.is_ok() {
            super::verify::print_failures(&report);
            eprintln!("Verification FAILED (use --no-verify to inspect corrupt bags)");
            return Ok(exit_codes::VERIFY_FAILED);
        }
        Some(true)
    };

    let view = BagView {
        archive: bag.whole_archive_name(),
        md5: bag.whole_archive_digest(),
        base_dir: bag.base_dir(),
        bagit_version: bag.declaration().and_then(|d| d.version.as_deref()),
        mime_type: bag.mime_type(),
        packaging: bag.packaging(),
        payload_bytes: bag.payload_bytes(),
        verified,
        members: display_order(&bag).into_iter().map(member_view).collect(),
        warnings: bag.warnings().iter().map(ToString::to_string).collect(),
    };

    match args.format {
        ShowFormat::Json => println!("{}", serde_json::to_string_pretty(&view)?),
        ShowFormat::Table => print_table(&view),
    }
    Ok(exit_codes::SUCCESS)
}

/// Finals, open then closed supporting files in sequence order, followed by
/// everything else in container order.
fn display_order(bag: &Bag) -> Vec<&Member> {
    let mut ordered = bag.sequenced_finals();
    ordered.extend(bag.sequenced_supporting(Access::Open));
    ordered.extend(bag.sequenced_supporting(Access::Closed));

    let seen: HashSet<String> = ordered.iter().map(|m| m.path()).collect();
    ordered.extend(
        bag.registry()
            .members()
            .iter()
            .filter(|m| !seen.contains(&m.path())),
    );
    ordered
}

fn member_view(member: &Member) -> MemberView<'_> {
    MemberView {
        role: member.role().to_string(),
        path: member.path(),
        name: member.display_name(),
        sequence: member.sequence(),
        access: member.access().map(Access::as_str),
        content_type: member.content_type(),
        md5: member.checksum(),
    }
}

fn print_table(view: &BagView<'_>) {
    println!("Bag Inspector");
    println!("=============");
    println!("Archive:     {}", view.archive.unwrap_or("-"));
    println!("MD5:         {}", view.md5);
    println!("Base dir:    {}", view.base_dir);
    println!("BagIt:       {}", view.bagit_version.unwrap_or("-"));
    println!("MIME type:   {}", view.mime_type);
    println!("Packaging:   {}", view.packaging);
    println!("Payload:     {} bytes", view.payload_bytes);
    println!();
    println!(
        "{:<11} {:<4} {:<7} {:<28} PATH",
        "ROLE", "SEQ", "ACCESS", "TYPE"
    );
    println!("{:-<11} {:-<4} {:-<7} {:-<28} {:-<20}", "", "", "", "", "");
    for m in &view.members {
        let seq = m.sequence.map_or_else(|| "-".to_string(), |s| s.to_string());
        println!(
            "{:<11} {:<4} {:<7} {:<28} {}",
            m.role,
            seq,
            m.access.unwrap_or("-"),
            m.content_type.unwrap_or("-"),
            m.path
        );
    }

    for warning in &view.warnings {
        println!("warning: {warning}");
    }
    match view.verified {
        Some(_) => println!("\nVerified integrity"),
        None => println!("\nVerification skipped"),
    }
}

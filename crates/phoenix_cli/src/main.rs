//! Maintenance CLI for the phoenix records database.
//!
//! # Responsibility
//! - Expose the rebuild/repair/verify engines as subcommands.
//! - Render structured reports as human-readable output on stdout.
//!
//! # Invariants
//! - The process exit code reflects only unhandled errors; integrity
//!   anomalies stay warnings on stdout.

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use flexi_logger::LoggerHandle;
use phoenix_core::db::open_db;
use phoenix_core::{
    rebuild_residency_groups, repair_residency_links, verify_residency_integrity, RebuildReport,
    RepairReport, VerificationReport,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "phoenix",
    version = phoenix_core::core_version(),
    about = "Residency group maintenance for the phoenix records database"
)]
struct Cli {
    /// Path to the records database file.
    #[arg(long, global = true, default_value = "phoenix.db")]
    db: PathBuf,

    /// Log level: trace|debug|info|warn|error.
    #[arg(long, global = true, default_value = phoenix_core::default_log_level())]
    log_level: String,

    /// Absolute directory for rolling log files; logs to stderr when omitted.
    #[arg(long, global = true)]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Wipe and regenerate all residency groups and memberships from census rows.
    Rebuild,
    /// Re-derive census-to-group links and patch only mismatches.
    Repair,
    /// Audit link integrity without changing anything.
    Verify,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _logger = init_logging(&cli)?;

    let mut conn = open_db(&cli.db)
        .with_context(|| format!("failed to open records database `{}`", cli.db.display()))?;

    match cli.command {
        Command::Rebuild => {
            println!("Starting rebuild of residency groups from {}", cli.db.display());
            let report = rebuild_residency_groups(&mut conn).context("rebuild failed")?;
            print_rebuild_report(&report);
        }
        Command::Repair => {
            println!("Starting repair of residency links in {}", cli.db.display());
            let report = repair_residency_links(&mut conn).context("repair failed")?;
            print_repair_report(&report);
        }
        Command::Verify => {
            println!("Verifying residency integrity in {}", cli.db.display());
            let report = verify_residency_integrity(&conn).context("verification failed")?;
            print_verification_report(&report);
        }
    }

    Ok(())
}

/// Starts file logging when `--log-dir` is set, stderr logging otherwise.
/// The returned handle must stay alive for the process duration.
fn init_logging(cli: &Cli) -> anyhow::Result<Option<LoggerHandle>> {
    if let Some(log_dir) = &cli.log_dir {
        phoenix_core::init_logging(&cli.log_level, log_dir).map_err(|message| anyhow!(message))?;
        return Ok(None);
    }

    let handle = flexi_logger::Logger::try_with_str(&cli.log_level)
        .with_context(|| format!("invalid log level `{}`", cli.log_level))?
        .start()
        .context("failed to start stderr logger")?;
    Ok(Some(handle))
}

fn print_rebuild_report(report: &RebuildReport) {
    println!("Rebuild complete.");
    println!("  residency groups created: {}", report.groups_created);
    println!("  census rows relinked:     {}", report.census_rows_relinked);
    println!("  memberships inserted:     {}", report.members_inserted);
    println!();
    print_verification_report(&report.verification);
}

fn print_repair_report(report: &RepairReport) {
    for fix in &report.fixes {
        match fix.previous {
            Some(previous) => println!(
                "[FIXED] Census ID {}: ResGroup {} -> {}",
                fix.census_id, previous, fix.assigned
            ),
            None => println!(
                "[FIXED] Census ID {}: unlinked -> ResGroup {}",
                fix.census_id, fix.assigned
            ),
        }
    }
    println!(
        "Repair complete. {} of {} census records were reassigned.",
        report.rows_fixed(),
        report.rows_scanned
    );
    println!();
    print_verification_report(&report.verification);
}

fn print_verification_report(report: &VerificationReport) {
    println!("Verification checks:");

    if report.unlinked_census_rows.is_empty() {
        println!("  all keyed census records are linked to a residency group.");
    } else {
        println!(
            "  WARNING: {} census records have no residency group assigned:",
            report.unlinked_census_rows.total
        );
        for row in &report.unlinked_census_rows.examples {
            println!("    - Census ID {} (Person ID {})", row.census_id, row.person_id);
        }
        print_truncation(
            report.unlinked_census_rows.total,
            report.unlinked_census_rows.examples.len(),
        );
    }

    if report.missing_memberships.is_empty() {
        println!("  all linked census records have a matching group membership.");
    } else {
        println!(
            "  WARNING: {} census records are missing from ResGroupMembers:",
            report.missing_memberships.total
        );
        for row in &report.missing_memberships.examples {
            println!(
                "    - Census ID {} (Person ID {}, ResGroup {})",
                row.census_id, row.person_id, row.res_group_id
            );
        }
        print_truncation(
            report.missing_memberships.total,
            report.missing_memberships.examples.len(),
        );
    }

    if report.orphaned_memberships.is_empty() {
        println!("  all group memberships are backed by a census record.");
    } else {
        println!(
            "  WARNING: {} group memberships are not linked to any census record:",
            report.orphaned_memberships.total
        );
        for row in &report.orphaned_memberships.examples {
            println!(
                "    - ResGroup {} / Person ID {}",
                row.res_group_id, row.person_id
            );
        }
        print_truncation(
            report.orphaned_memberships.total,
            report.orphaned_memberships.examples.len(),
        );
    }

    if report.duplicate_member_orders.is_empty() {
        println!("  all member ordinals are unique within their group.");
    } else {
        println!(
            "  WARNING: {} groups have duplicate member_order values:",
            report.duplicate_member_orders.total
        );
        for row in &report.duplicate_member_orders.examples {
            println!(
                "    - ResGroup {} has {} members with order {}",
                row.res_group_id, row.member_count, row.member_order
            );
        }
        print_truncation(
            report.duplicate_member_orders.total,
            report.duplicate_member_orders.examples.len(),
        );
    }

    if report.is_clean() {
        println!("No anomalies found.");
    } else {
        println!("{} anomalies found in total.", report.total_anomalies());
    }
}

fn print_truncation(total: usize, shown: usize) {
    if total > shown {
        println!("    ... and {} more", total - shown);
    }
}

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use group_settlement::config::Settings;
use group_settlement::models::{sort_entries, GroupId, LedgerEntry};
use group_settlement::observability::{init_logging, init_metrics};
use group_settlement::services::{issued_total, BalanceProjector, ConservationAuditor, NettingPlanner};
use serde::Serialize;
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use tracing::{info, warn};

/// Replays a group's ledger history and reports balances or a settlement plan.
#[derive(Parser)]
#[command(name = "group-settle")]
#[command(version)]
#[command(about = "Project, audit and net a group points ledger", long_about = None)]
struct Cli {
    /// JSON array of ledger entries; `-` reads stdin
    #[arg(short, long, global = true, default_value = "-")]
    input: PathBuf,

    /// Group to process; defaults to the group of the first entry.
    /// Entries of other groups are skipped
    #[arg(short, long, global = true)]
    group: Option<String>,

    /// Print Prometheus metrics to stderr when done
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print custodial balance and net result per account
    Project,
    /// Check custody and net-result conservation
    Audit,
    /// Print the settlement plan
    Plan,
}

#[derive(Serialize)]
struct AuditReport {
    group_id: GroupId,
    entry_count: usize,
    issued_total: rust_decimal::Decimal,
    custodial_total: rust_decimal::Decimal,
    net_result_total: rust_decimal::Decimal,
}

fn read_entries(input: &PathBuf) -> anyhow::Result<Vec<LedgerEntry>> {
    let raw = if input.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))?
    };
    serde_json::from_str(&raw).context("parsing ledger entries")
}

/// Picks the group to process and drops every entry of other groups.
fn select_group(entries: &mut Vec<LedgerEntry>, requested: Option<String>) -> anyhow::Result<GroupId> {
    let group_id = requested
        .map(GroupId::from)
        .or_else(|| entries.first().map(|e| e.group_id.clone()))
        .ok_or_else(|| anyhow!("no entries and no --group given"))?;

    let loaded = entries.len();
    entries.retain(|e| e.group_id == group_id);
    if entries.len() < loaded {
        warn!(
            group_id = %group_id,
            skipped = loaded - entries.len(),
            "Skipping entries of other groups"
        );
    }
    Ok(group_id)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let settings = Settings::new()?;
    init_logging(&settings.logging.to_log_config());
    let metrics = cli.metrics.then(init_metrics);

    let mut entries = read_entries(&cli.input)?;
    sort_entries(&mut entries);
    let group_id = select_group(&mut entries, cli.group)?;
    info!(group_id = %group_id, entry_count = entries.len(), "Loaded ledger history");

    let projection = BalanceProjector::new(settings.ledger.issuer()).project(&group_id, &entries)?;
    let auditor = ConservationAuditor::new(settings.ledger.epsilon);

    match cli.command {
        Commands::Project => print_json(&projection)?,
        Commands::Audit => {
            auditor.audit(&entries, &projection)?;
            print_json(&AuditReport {
                group_id: projection.group_id.clone(),
                entry_count: projection.entry_count,
                issued_total: issued_total(&entries),
                custodial_total: projection.custodial_total(),
                net_result_total: projection.net_result_total(),
            })?;
        }
        Commands::Plan => {
            auditor.audit(&entries, &projection)?;
            let plan = NettingPlanner::new(settings.ledger.epsilon).plan(&projection)?;
            print_json(&plan)?;
        }
    }

    if let Some(handle) = metrics {
        eprintln!("{}", handle.render());
    }
    Ok(())
}

use crate::infra::{load_bundle, sample_bundle, CannedReasoningClient, FixtureEvidenceSource};
use clap::Args;
use credit_ai::config::RetryConfig;
use credit_ai::error::AppError;
use credit_ai::workflows::validation::audit::{AuditStore, InMemoryAuditStore};
use credit_ai::workflows::validation::consolidate::consolidate;
use credit_ai::workflows::validation::service::CreditValidationService;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ConsolidateArgs {
    /// Path to a raw evidence bundle (JSON)
    #[arg(long)]
    pub(crate) bundle: PathBuf,
    /// Transaction identifier to stamp on the canonical evidence
    #[arg(long, default_value = "local-run")]
    pub(crate) transaction_id: String,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Optional raw evidence bundle (JSON). Defaults to a built-in sample.
    #[arg(long)]
    pub(crate) bundle: Option<PathBuf>,
    /// Transaction identifier for the demo run
    #[arg(long, default_value = "demo-txn")]
    pub(crate) transaction_id: String,
}

/// Runs the deterministic consolidation stage on its own, printing the
/// canonical evidence that would be handed to the reasoning service.
pub(crate) fn run_consolidate(args: ConsolidateArgs) -> Result<(), AppError> {
    let bundle = load_bundle(&args.bundle)?;
    let evidence = consolidate(&args.transaction_id, &bundle);

    if !evidence.anomalies.is_empty() {
        println!("Source anomalies:");
        for anomaly in &evidence.anomalies {
            println!("- {anomaly}");
        }
        println!();
    }

    println!("{}", serde_json::to_string_pretty(&evidence)?);
    Ok(())
}

/// Drives the full pipeline against fixture collaborators: a pre-loaded
/// evidence bundle and a canned reasoning verdict.
pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let bundle = match args.bundle {
        Some(path) => load_bundle(&path)?,
        None => sample_bundle(),
    };

    println!("Credit validation demo (fixture collaborators)");
    println!("Transaction: {}", args.transaction_id);

    let audit = Arc::new(InMemoryAuditStore::new());
    let service = CreditValidationService::new(
        Arc::new(FixtureEvidenceSource::new(bundle)),
        CannedReasoningClient::approving(),
        RetryConfig::default(),
        audit.clone(),
        "fixture-model",
    );

    let outcome = service.validate(&args.transaction_id).await;
    println!("\nOutcome:\n{}", serde_json::to_string_pretty(&outcome)?);

    match audit.list_by_transaction(&args.transaction_id) {
        Ok(records) => {
            println!("\nAudit trail ({} row(s)):", records.len());
            for record in records {
                println!(
                    "- id={} status={} retries={} decision={:?}",
                    record.id.map_or_else(|| "?".to_string(), |id| id.to_string()),
                    record.status.label(),
                    record.retries,
                    record.decision
                );
            }
        }
        Err(err) => println!("\nAudit trail unavailable: {err}"),
    }

    Ok(())
}

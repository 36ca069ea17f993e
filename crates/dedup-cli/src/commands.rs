use std::fs::File;
use std::io::{self, Write};
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use dedup_crypto::digest_reader;
use dedup_fingerprint::{
    CatalogOutcome, FingerprintAlgorithms, FingerprintCatalog, FingerprintRecord, InMemoryNodeStore,
    StoreContentSource,
};
use dedup_store::{ContentAddressStore, FinalizedContent, Materialization, RollbackReport, Transaction};
use dedup_types::{ContentLocator, NodeRef, PropertyName};
use serde_json::json;

use crate::cli::*;
use crate::config::CliConfig;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = CliConfig::load(cli.config.as_deref(), cli.root.clone())?;
    match cli.command {
        Command::Put(args) => cmd_put(&config, args, cli.format),
        Command::Cat(args) => cmd_cat(&config, args),
        Command::Rm(args) => cmd_rm(&config, args),
        Command::Path(args) => cmd_path(&config, args),
        Command::Ls => cmd_ls(&config, cli.format),
        Command::Digest(args) => cmd_digest(&config, args, cli.format),
    }
}

fn open_store(config: &CliConfig) -> anyhow::Result<ContentAddressStore> {
    ContentAddressStore::open(config.store.clone())
        .with_context(|| format!("opening store at {}", config.store.root.display()))
}

fn parse_locator(raw: &str) -> anyhow::Result<ContentLocator> {
    raw.parse()
        .with_context(|| format!("invalid locator {raw:?}"))
}

fn cmd_put(config: &CliConfig, args: PutArgs, format: OutputFormat) -> anyhow::Result<()> {
    let store = Arc::new(open_store(config)?);
    let mut source =
        File::open(&args.file).with_context(|| format!("opening {}", args.file.display()))?;

    let mut txn = Transaction::begin();
    let mut session = store.open_write_session(None)?;
    if let Some(mimetype) = &args.mimetype {
        session.set_mimetype(mimetype.as_str());
    }
    if let Some(encoding) = &args.encoding {
        session.set_encoding(encoding.as_str());
    }
    let written = io::copy(&mut source, &mut session).map_err(anyhow::Error::from);
    let finalized = written.and_then(|_| session.close(&mut txn).map_err(anyhow::Error::from));
    let done = match finalized {
        Ok(done) => done,
        Err(err) => {
            let report = txn.rollback(&store);
            let err = with_rollback_failures(err, &report);
            return Err(err.context(format!("storing {}", args.file.display())));
        }
    };
    txn.commit();
    let data = session.content_data();
    drop(session);

    let fingerprints = fingerprint_stored(config, &store, &done.digest, data)?;

    match format {
        OutputFormat::Json => {
            let value = json!({
                "locator": done.locator.as_str(),
                "size": done.size,
                "digest": done.digest,
                "outcome": outcome_label(done.outcome),
                "mimetype": args.mimetype,
                "encoding": args.encoding,
                "fingerprints": fingerprints.iter().map(ToString::to_string).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Text => {
            print_put(&done);
            for record in &fingerprints {
                println!("  fingerprint: {}", record.to_string().dimmed());
            }
        }
    }
    Ok(())
}

/// Attach the blobs a rollback could not remove to the error that caused it.
fn with_rollback_failures(err: anyhow::Error, report: &RollbackReport) -> anyhow::Error {
    if report.is_clean() {
        return err;
    }
    let orphans = report
        .failed
        .iter()
        .map(|(locator, reason)| format!("{locator} ({reason})"))
        .collect::<Vec<_>>()
        .join(", ");
    err.context(format!(
        "rollback left {} orphaned blob(s): {orphans}",
        report.failed.len()
    ))
}

fn print_put(done: &FinalizedContent) {
    let status = match done.outcome {
        Materialization::Created => "stored".green().bold(),
        Materialization::Deduplicated => "deduplicated".cyan().bold(),
        Materialization::CopyFailed => "copy failed".red().bold(),
    };
    println!("{} {}", status, done.locator.as_str().yellow());
    println!("  size: {} bytes", done.size);
}

fn outcome_label(outcome: Materialization) -> &'static str {
    match outcome {
        Materialization::Created => "created",
        Materialization::Deduplicated => "deduplicated",
        Materialization::CopyFailed => "copy_failed",
    }
}

/// Run the configured fingerprint algorithms over freshly stored content.
///
/// The content is attached to a transient node named after its digest.
fn fingerprint_stored(
    config: &CliConfig,
    store: &Arc<ContentAddressStore>,
    digest: &str,
    data: dedup_types::ContentData,
) -> anyhow::Result<Vec<FingerprintRecord>> {
    let algorithms = FingerprintAlgorithms::from_config(&config.fingerprint);
    if algorithms.is_empty() {
        return Ok(Vec::new());
    }
    let nodes = Arc::new(InMemoryNodeStore::new());
    let node = content_node(digest);
    nodes.create_node(node.clone());
    let catalog = FingerprintCatalog::new(
        nodes.clone(),
        StoreContentSource::new(nodes.clone(), store.clone()),
        algorithms,
    );
    let update = nodes.set_content(&node, &PropertyName::content(), data)?;
    match catalog.on_content_property_update(&update)? {
        CatalogOutcome::Updated(set) => Ok(set.into_iter().collect()),
        _ => Ok(Vec::new()),
    }
}

fn content_node(digest: &str) -> NodeRef {
    NodeRef::primary(digest)
}

fn cmd_cat(config: &CliConfig, args: LocatorArgs) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let mut reader = store.read(&parse_locator(&args.locator)?)?;
    if !reader.exists() {
        tracing::info!(locator = %args.locator, "no content stored");
    }
    let stdout = io::stdout();
    let mut out = stdout.lock();
    io::copy(&mut reader, &mut out)?;
    out.flush()?;
    Ok(())
}

fn cmd_rm(config: &CliConfig, args: LocatorArgs) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let locator = parse_locator(&args.locator)?;
    if store.delete(&locator)? {
        println!("{} {}", "removed".green().bold(), locator.as_str().yellow());
    } else {
        println!("{} {}", "not present".dimmed(), locator.as_str().yellow());
    }
    Ok(())
}

fn cmd_path(config: &CliConfig, args: LocatorArgs) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let path = store.resolve(&parse_locator(&args.locator)?)?;
    println!("{}", path.display());
    Ok(())
}

fn cmd_ls(config: &CliConfig, format: OutputFormat) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let locators = store.locators()?;
    match format {
        OutputFormat::Json => {
            let list: Vec<&str> = locators.iter().map(ContentLocator::as_str).collect();
            println!("{}", serde_json::to_string_pretty(&list)?);
        }
        OutputFormat::Text => {
            for locator in &locators {
                println!("{}", locator.as_str());
            }
            println!("{} blob(s)", locators.len().to_string().bold());
        }
    }
    Ok(())
}

fn cmd_digest(config: &CliConfig, args: DigestArgs, format: OutputFormat) -> anyhow::Result<()> {
    let list = args
        .algorithms
        .as_deref()
        .unwrap_or(&config.fingerprint.digest_algorithms);
    let algorithms = FingerprintAlgorithms::parse(list);
    for name in algorithms.unsupported() {
        eprintln!("{} unsupported algorithm {}", "warning:".yellow().bold(), name);
    }
    if algorithms.is_empty() {
        anyhow::bail!("no fingerprint algorithms configured");
    }

    let mut records = Vec::with_capacity(algorithms.len());
    for algorithm in algorithms.iter() {
        let mut file =
            File::open(&args.file).with_context(|| format!("opening {}", args.file.display()))?;
        let digest = digest_reader(algorithm, &mut file)?;
        records.push(FingerprintRecord::new(PropertyName::content(), algorithm, digest));
    }

    match format {
        OutputFormat::Json => {
            let encoded: Vec<String> = records.iter().map(ToString::to_string).collect();
            println!("{}", serde_json::to_string_pretty(&encoded)?);
        }
        OutputFormat::Text => {
            for record in &records {
                println!("{record}");
            }
        }
    }
    Ok(())
}

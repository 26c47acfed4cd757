//! Mailbase - mailing-address database
//!
//! Main entry point for the Mailbase CLI.

mod commands;

use anyhow::{bail, Context};
use commands::{Cli, Commands, ExclusiveListArg};
use clap::Parser;
use mailbase::config::{validate_config_result, MailbaseConfig};
use mailbase::{Address, AddressStore, ListKind, StoreError};
use std::io::Read;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::process;

const CONFLICT_HINT: &str =
    "addresses conflict with the opposing list; rerun with --force to move them or --skip-conflicts to leave them out";

fn main() {
    let cli = Cli::parse();

    if let Err(e) = mailbase::logging::init(cli.verbose) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(MailbaseConfig::default_path);

    // Handle init command first (creates config)
    if let Commands::Init { force } = cli.command {
        return handle_init(&config_path, force, cli.quiet);
    }

    let mut config = if cli.config.is_some() {
        MailbaseConfig::load(&config_path)?
    } else {
        MailbaseConfig::load_default_or_new()?
    };
    validate_config_result(&config).context("Invalid configuration")?;

    let mut store = AddressStore::new(config.compile_pattern()?);

    if let Commands::New { path } = &cli.command {
        let path = match path.as_ref().or(cli.file.as_ref()) {
            Some(p) => config.with_extension(p),
            None => MailbaseConfig::config_dir().join(config.default_file_name()),
        };
        if path.exists() {
            bail!("{} already exists", path.display());
        }
        store.reset();
        store
            .save_as(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        remember(&mut config, &config_path, &path)?;
        if !cli.quiet {
            println!("Created {}", path.display());
        }
        return Ok(());
    }

    let file = resolve_file(&cli, &config)?;
    store
        .load(&file)
        .with_context(|| format!("Failed to open {}", file.display()))?;
    tracing::info!(file = %file.display(), "List file opened");

    execute(&mut store, &cli, &config)?;

    if store.is_dirty() {
        store
            .save()
            .with_context(|| format!("Failed to save {}", file.display()))?;
    }
    remember(&mut config, &config_path, &file)?;

    Ok(())
}

fn execute(store: &mut AddressStore, cli: &Cli, config: &MailbaseConfig) -> anyhow::Result<()> {
    match &cli.command {
        // Handled before a list file is opened.
        Commands::Init { .. } | Commands::New { .. } => {}

        Commands::List { list, separator } => {
            let list = list.map(ListKind::from);
            match (list, separator) {
                (Some(kind), Some(sep)) => println!("{}", store.join_list(kind, sep)),
                _ => print_lists(store, list, cli.json)?,
            }
        }

        Commands::Add {
            list,
            addresses,
            conflicts,
        } => {
            let addresses = validate_addresses(store, addresses)?;
            let kind = ListKind::from(*list);
            let resolved = store
                .add_resolving(kind, &addresses, conflicts.policy())
                .map_err(with_conflict_hint)?;
            report(cli, format!("Added {} address(es) to {}", addresses.len(), kind));
            report_resolved(cli, &resolved);
        }

        Commands::Del { list, addresses } => {
            let addresses = validate_addresses(store, addresses)?;
            let kind = ListKind::from(*list);
            store.del_from(kind, &addresses);
            report(cli, format!("Deleted from {}", kind));
        }

        Commands::Move { from, addresses } => {
            let addresses = validate_addresses(store, addresses)?;
            let to = match from {
                ExclusiveListArg::Active => {
                    store.move_active_to_removed(&addresses)?;
                    ListKind::Removed
                }
                ExclusiveListArg::Removed => {
                    store.move_removed_to_active(&addresses)?;
                    ListKind::Active
                }
            };
            report(cli, format!("Moved {} address(es) to {}", addresses.len(), to));
        }

        Commands::Bounce { addresses } => {
            let addresses = validate_addresses(store, addresses)?;
            store.increment_returned(&addresses)?;
        }

        Commands::Unbounce { addresses } => {
            let addresses = validate_addresses(store, addresses)?;
            store.decrement_returned(&addresses)?;
        }

        Commands::Count { address } => {
            let addr = store
                .pattern()
                .parse(address)
                .with_context(|| format!("Invalid address: {}", address))?;
            let count = store.return_count(addr.as_str())?;
            if cli.json {
                println!("{}", serde_json::json!({ "address": addr, "count": count }));
            } else {
                println!("{}", count);
            }
        }

        Commands::Process { threshold } => {
            let threshold = match threshold {
                Some(n) => NonZeroU32::new(*n).context("threshold must be at least 1")?,
                None => config.threshold()?,
            };
            let retired = store.process_returned(threshold);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&retired)?);
            } else {
                for addr in &retired {
                    println!("{}", addr);
                }
                report(cli, format!("Retired {} address(es)", retired.len()));
            }
        }

        Commands::Extract { source } => {
            let found = if source == "-" {
                let mut text = String::new();
                std::io::stdin().read_to_string(&mut text)?;
                store.extract_addresses(&text.lines().collect::<Vec<_>>().join(" "))
            } else {
                store
                    .extract_from_file(source)
                    .with_context(|| format!("Failed to read {}", source))?
            };
            report(
                cli,
                format!(
                    "Found {} match(es), {} unique address(es) extracted",
                    found,
                    store.list_extracted().len()
                ),
            );
        }

        Commands::Triage { target, conflicts } => {
            let staged = store.list_extracted().len();
            let resolved = store
                .move_extracted_resolving(ListKind::from(*target), conflicts.policy())
                .map_err(with_conflict_hint)?;
            report(cli, format!("Filed {} extracted address(es)", staged));
            report_resolved(cli, &resolved);
        }

        Commands::ClearExtracted => store.clear_extracted(),

        Commands::Stats => {
            let stats = store.stats();
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("active:    {}", stats.active);
                println!("removed:   {}", stats.removed);
                println!("returned:  {}", stats.returned);
                println!("extracted: {}", stats.extracted);
                if let Some(file) = &stats.current_file {
                    println!("file:      {}", file.display());
                }
            }
        }
    }

    Ok(())
}

fn handle_init(config_path: &Path, force: bool, quiet: bool) -> anyhow::Result<()> {
    if config_path.exists() && !force {
        bail!(
            "Configuration already exists at {} (use --force to overwrite)",
            config_path.display()
        );
    }

    MailbaseConfig::new().save(config_path)?;
    if !quiet {
        println!("Wrote {}", config_path.display());
    }
    Ok(())
}

fn resolve_file(cli: &Cli, config: &MailbaseConfig) -> anyhow::Result<PathBuf> {
    match cli.file.clone().or_else(|| config.last_file.clone()) {
        Some(path) => Ok(path),
        None => bail!(
            "No list file given. Pass --file <PATH>, or create one with 'mailbase new <PATH>'."
        ),
    }
}

fn remember(config: &mut MailbaseConfig, config_path: &Path, file: &Path) -> anyhow::Result<()> {
    if config.remember_file(file) {
        config
            .save(config_path)
            .with_context(|| format!("Failed to update {}", config_path.display()))?;
    }
    Ok(())
}

/// Reject anything the configured pattern does not accept
fn validate_addresses(store: &AddressStore, raw: &[String]) -> anyhow::Result<Vec<Address>> {
    let mut valid = Vec::with_capacity(raw.len());
    let mut invalid = Vec::new();

    for candidate in raw {
        match store.pattern().parse(candidate) {
            Some(addr) => valid.push(addr),
            None => invalid.push(candidate.as_str()),
        }
    }

    if !invalid.is_empty() {
        bail!("Invalid address(es): {}", invalid.join(", "));
    }
    Ok(valid)
}

fn with_conflict_hint(err: StoreError) -> anyhow::Error {
    match err {
        StoreError::MutualExclusion { .. } => anyhow::Error::new(err).context(CONFLICT_HINT),
        other => other.into(),
    }
}

fn report_resolved(cli: &Cli, resolved: &[Address]) {
    if !resolved.is_empty() {
        report(
            cli,
            format!("Resolved {} conflicting address(es)", resolved.len()),
        );
    }
}

fn print_lists(store: &AddressStore, list: Option<ListKind>, json: bool) -> anyhow::Result<()> {
    if json {
        let value = match list {
            None => serde_json::to_value(store.snapshot())?,
            Some(ListKind::Active) => serde_json::to_value(store.list_active())?,
            Some(ListKind::Removed) => serde_json::to_value(store.list_removed())?,
            Some(ListKind::Extracted) => serde_json::to_value(store.list_extracted())?,
            Some(ListKind::Returned) => serde_json::to_value(store.snapshot().returned)?,
        };
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let kinds = match list {
        Some(kind) => vec![kind],
        None => ListKind::ALL.to_vec(),
    };

    for kind in kinds {
        if list.is_none() {
            println!("{}", kind.header());
        }
        match kind {
            ListKind::Active => store.list_active().iter().for_each(|a| println!("{}", a)),
            ListKind::Removed => store.list_removed().iter().for_each(|a| println!("{}", a)),
            ListKind::Extracted => store.list_extracted().iter().for_each(|a| println!("{}", a)),
            ListKind::Returned => {
                for (addr, count) in store.list_returned() {
                    println!("{} {}", addr, count);
                }
            }
        }
    }
    Ok(())
}

fn report(cli: &Cli, message: String) {
    if !cli.quiet && !cli.json {
        println!("{}", message);
    }
}

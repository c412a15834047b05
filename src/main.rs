//! lexnet CLI: check and convert wordnet sources.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result};

use lexnet::LexnetConfig;
use lexnet::codec::{xml, yaml};
use lexnet::error::LexnetError;
use lexnet::model::Lexicon;
use lexnet::store::LexiconStore;
use lexnet::store::durable::DurableStore;
use lexnet::store::mem::MemStore;
use lexnet::store::snapshot::SnapshotCache;
use lexnet::validate::{Report, validate};

#[derive(Parser)]
#[command(name = "lexnet", version, about = "Wordnet graph engine")]
struct Cli {
    /// TOML config file. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// On-disk layout of a lexicon.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Directory of YAML shards.
    Yaml,
    /// Single WN-LMF XML file.
    Xml,
    /// Directory of WN-LMF files, one per lexicographer file.
    Split,
    /// redb database.
    Db,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a lexicon and report every violation.
    Validate {
        /// Lexicon source. Defaults to the configured YAML directory.
        input: Option<PathBuf>,

        #[arg(long, value_enum, default_value = "yaml")]
        format: Format,

        /// Print the repair operations as a script.
        #[arg(long)]
        fix: bool,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Convert a lexicon between layouts.
    Convert {
        input: PathBuf,
        output: PathBuf,

        #[arg(long, value_enum)]
        from: Format,

        #[arg(long, value_enum)]
        to: Format,
    },

    /// Load a lexicon into a durable database, replacing whatever it held.
    ImportDb {
        input: PathBuf,
        db: PathBuf,

        #[arg(long, value_enum, default_value = "yaml")]
        format: Format,
    },

    /// Show node and relation counts.
    Stats {
        input: Option<PathBuf>,

        #[arg(long, value_enum, default_value = "yaml")]
        format: Format,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => LexnetConfig::load(path)?,
        None => LexnetConfig::default(),
    };

    match cli.command {
        Commands::Validate {
            input,
            format,
            fix,
            json,
        } => {
            let input = input.unwrap_or_else(|| config.yaml_dir.clone());
            let report = if format == Format::Db {
                let store = DurableStore::open(&input, config.cache_size)?;
                validate(&store, &config.validate_config())?
            } else {
                let store = MemStore::new(load(&config, format, &input)?);
                validate(&store, &config.validate_config())?
            };
            print_report(&report, fix, json)?;
            if !report.is_clean() {
                miette::bail!("{} violations in {}", report.len(), input.display());
            }
        }

        Commands::Convert {
            input,
            output,
            from,
            to,
        } => {
            let lexicon = load(&config, from, &input)?;
            save(&config, to, &lexicon, &output)?;
            println!(
                "Converted {} ({from:?}) to {} ({to:?})",
                input.display(),
                output.display()
            );
        }

        Commands::ImportDb { input, db, format } => {
            let lexicon = load(&config, format, &input)?;
            save(&config, Format::Db, &lexicon, &db)?;
            println!(
                "Imported {} entries and {} synsets into {}",
                lexicon.entries.len(),
                lexicon.synsets.len(),
                db.display()
            );
        }

        Commands::Stats { input, format } => {
            let input = input.unwrap_or_else(|| config.yaml_dir.clone());
            let lexicon = load(&config, format, &input)?;
            print_stats(&lexicon);
        }
    }

    Ok(())
}

fn load(config: &LexnetConfig, format: Format, path: &Path) -> Result<Lexicon> {
    let lexicon = match format {
        Format::Yaml => load_yaml_cached(config, path)?,
        Format::Xml => xml::load_xml(path)?,
        Format::Split => xml::load_xml_dir(path)?,
        Format::Db => DurableStore::open(path, config.cache_size)?.export()?,
    };
    Ok(lexicon)
}

/// YAML sources are slow to parse; reuse the configured snapshot when it was
/// built from the same set of shards and is newer than each of them.
fn load_yaml_cached(config: &LexnetConfig, dir: &Path) -> Result<Lexicon> {
    let read = || yaml::load_yaml(dir, config.header(), config.chunk_threshold);
    let Some(snapshot) = &config.snapshot else {
        return Ok(read()?);
    };
    let mut sources = Vec::new();
    for entry in std::fs::read_dir(dir).into_diagnostic()? {
        let path = entry.into_diagnostic()?.path();
        if path.extension().is_some_and(|e| e == "yaml") {
            sources.push(path);
        }
    }
    let cache = SnapshotCache::new(snapshot, sources);
    let lexicon = cache.reload_if_stale(|| read().map_err(LexnetError::from))?;
    Ok(lexicon)
}

fn save(config: &LexnetConfig, format: Format, lexicon: &Lexicon, path: &Path) -> Result<()> {
    match format {
        Format::Yaml => {
            yaml::save_yaml(lexicon, path)?;
        }
        Format::Xml => xml::save_xml(lexicon, path)?,
        Format::Split => {
            xml::save_xml_dir(lexicon, path)?;
        }
        Format::Db => {
            let mut store = DurableStore::open(path, config.cache_size)?;
            store.import(lexicon)?;
            store.flush()?;
        }
    }
    Ok(())
}

fn print_report(report: &Report, fix: bool, json: bool) -> Result<()> {
    if json {
        let json = serde_json::to_string_pretty(report).into_diagnostic()?;
        println!("{json}");
    } else {
        for violation in &report.violations {
            println!("{violation}");
        }
        if report.is_clean() {
            println!("No violations.");
        } else {
            println!("\nViolations ({}):", report.len());
            for (kind, count) in report.summary() {
                println!("  {kind:<20} {count}");
            }
        }
    }
    if fix {
        let fixes = report.fixes();
        eprintln!("# {} repair operations", fixes.len());
        for op in &fixes {
            println!("{op}");
        }
    }
    Ok(())
}

fn print_stats(lexicon: &Lexicon) {
    let synset_relations: usize = lexicon.synsets.iter().map(|s| s.relations.len()).sum();
    let sense_relations: usize = lexicon
        .entries
        .iter()
        .flat_map(|e| &e.senses)
        .map(|s| s.relations.len())
        .sum();
    let mut by_pos: BTreeMap<char, usize> = BTreeMap::new();
    for synset in &lexicon.synsets {
        *by_pos.entry(synset.part_of_speech.as_char()).or_insert(0) += 1;
    }

    println!("Lexicon: {} ({})", lexicon.header.id, lexicon.header.version);
    println!("  entries:           {}", lexicon.entries.len());
    println!("  senses:            {}", lexicon.sense_count());
    println!("  synsets:           {}", lexicon.synsets.len());
    for (pos, count) in by_pos {
        println!("    {pos}: {count}");
    }
    println!("  synset relations:  {synset_relations}");
    println!("  sense relations:   {sense_relations}");
    println!("  frames:            {}", lexicon.frames.len());
    println!("  comments:          {}", lexicon.comments.len());
}

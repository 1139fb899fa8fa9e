mod config;
mod tracing_setup;

use anyhow::Context;
use atlas_core::mapper::preferred_mapper_id;
use atlas_core::state::{display, legend};
use atlas_core::{
    DataProvider, Fact, FactRegistry, Filter, FilterSpec, MapController, MapEvent, MapState, MapperRegistry,
    SqliteStore, event_channel,
};
use clap::{Args, Parser, Subcommand};
use config::AtlasConfig;
use serde::Serialize;
use serde_json::json;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Explore the country database from the command line
#[derive(Parser, Debug)]
#[command(name = "atlas", version, about)]
struct Cli {
    /// Configuration file (defaults to ATLAS_CONFIG_PATH or atlas.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Country database, overrides the configured store path
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the registered facts and mappers
    Facts,
    /// Ids of the countries matching a filter
    Ids {
        #[arg(long)]
        filter: Option<PathBuf>,
    },
    /// One hydrated country with formatted values
    Show { id: String },
    /// Render a map frame
    Frame(FrameArgs),
    /// Legend of a fact under a mapper
    Legend {
        #[arg(long)]
        fact: String,
        #[arg(long)]
        mapper: Option<String>,
        #[arg(long)]
        filter: Option<PathBuf>,
    },
    /// Read one JSON filter per stdin line and print a frame per burst
    Watch(FrameArgs),
}

#[derive(Args, Debug)]
struct FrameArgs {
    /// Fact driving the colors
    #[arg(long)]
    color: String,
    /// Fact shown as label
    #[arg(long)]
    label: Option<String>,
    /// Mapper id, or "auto" for the fact's preferred mapper
    #[arg(long)]
    mapper: Option<String>,
    #[arg(long)]
    filter: Option<PathBuf>,
    /// Hide countries outside the filter
    #[arg(long)]
    hide_filtered: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_setup::init_tracing(cli.log_json)?;

    let mut config = match &cli.config {
        Some(path) => AtlasConfig::from_path(path)?,
        None => AtlasConfig::load()?,
    }
    .apply_profile();
    if let Some(db) = &cli.db {
        config.store.path = db.clone();
    }

    let registry = Arc::new(config.registry()?);
    let store = SqliteStore::open(&config.store.path)?;
    let provider = Arc::new(DataProvider::new(Box::new(store), Arc::clone(&registry))?);
    let mappers = Arc::new(MapperRegistry::new());
    info!(db = %config.store.path.display(), command = ?cli.command, "Starting atlas");

    match cli.command {
        Command::Facts => print_json(&json!({ "facts": registry.all(), "mappers": mappers.ids() })),
        Command::Ids { filter } => {
            let filter = load_filter(filter.as_deref(), &registry)?;
            print_json(&provider.country_ids(&filter)?)
        }
        Command::Show { id } => {
            let country = provider.hydrate(&id)?.with_context(|| format!("No country with id '{id}'"))?;
            let values: serde_json::Map<String, serde_json::Value> = registry
                .table_facts()
                .map(|fact| {
                    let value = country.value(fact);
                    (
                        fact.id().to_string(),
                        json!({
                            "value": value.map(serde_json::Value::from),
                            "display": display(fact, value),
                            "alignment": value.and_then(|v| fact.format(v)).map(|f| f.alignment),
                        }),
                    )
                })
                .collect();
            print_json(&json!({ "id": country.id(), "values": values }))
        }
        Command::Frame(args) => {
            let state = map_state(&args, &registry, &config)?;
            print_json(&state.render(&provider, &mappers)?)
        }
        Command::Legend { fact, mapper, filter } => {
            let fact = registry.require(&fact)?;
            let filter = load_filter(filter.as_deref(), &registry)?;
            let mapper_id = resolve_mapper_id(mapper.as_deref(), fact, &config);
            let mapper = mappers.create(&mapper_id, fact, &filter, &provider)?;
            let metadata = provider.fact_metadata(fact, &filter)?;
            print_json(&json!({
                "fact": fact.id(),
                "mapper": mapper.id(),
                "metadata": metadata,
                "entries": legend(fact, mapper.as_ref(), &metadata),
            }))
        }
        Command::Watch(args) => watch(&args, &registry, &config, provider, mappers),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}

fn load_filter(path: Option<&Path>, registry: &FactRegistry) -> anyhow::Result<Filter> {
    let Some(path) = path else {
        return Ok(Filter::all());
    };
    let text = std::fs::read_to_string(path).with_context(|| format!("Reading filter {}", path.display()))?;
    Ok(FilterSpec::from_json(&text)?.resolve(registry)?)
}

fn resolve_mapper_id(requested: Option<&str>, fact: &Fact, config: &AtlasConfig) -> String {
    match requested.unwrap_or(&config.session.default_mapper) {
        "auto" => preferred_mapper_id(fact).to_string(),
        id => id.to_string(),
    }
}

fn map_state(args: &FrameArgs, registry: &FactRegistry, config: &AtlasConfig) -> anyhow::Result<MapState> {
    let color = registry.require(&args.color)?;
    let mut state = MapState::new(resolve_mapper_id(args.mapper.as_deref(), color, config));
    state.set_color_fact(Some(color.clone()));
    if let Some(label) = &args.label {
        state.set_label_fact(Some(registry.require(label)?.clone()));
    }
    state.set_filter(load_filter(args.filter.as_deref(), registry)?);
    state.set_show_filtered(config.session.show_filtered && !args.hide_filtered);
    Ok(state)
}

fn watch(
    args: &FrameArgs,
    registry: &Arc<FactRegistry>,
    config: &AtlasConfig,
    provider: Arc<DataProvider>,
    mappers: Arc<MapperRegistry>,
) -> anyhow::Result<()> {
    let state = map_state(args, registry, config)?;
    let (sender, receiver) = event_channel();
    sender.send(MapEvent::Refresh)?;

    let reader_registry = Arc::clone(registry);
    let reader = std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    warn!(error = %err, "Stopped reading stdin");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match FilterSpec::from_json(&line).and_then(|spec| spec.resolve(&reader_registry)) {
                Ok(filter) => {
                    if sender.send(MapEvent::Filter(filter)).is_err() {
                        break;
                    }
                }
                Err(err) => warn!(error = %err, "Skipping invalid filter line"),
            }
        }
    });

    let mut controller = MapController::new(state, provider, mappers, receiver, config.session.debounce());
    let mut write_error = None;
    let frames = controller.run(|frame| {
        if write_error.is_none() {
            write_error = print_json(&frame).err();
        }
    })?;
    if let Some(err) = write_error {
        return Err(err);
    }

    if reader.join().is_err() {
        warn!("Stdin reader panicked");
    }
    info!(frames, "Watch finished");
    Ok(())
}

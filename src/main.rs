use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;

use cutover::catalog::{self, builtin, source_from_config, CatalogDocument, FileSource};
use cutover::config::Config;
use cutover::{logging, render, rest};
use cutover::{JsonFileStore, MemoryStore, ProgressEngine, ProgressStore, StepCatalog};

type Engine = ProgressEngine<Box<dyn ProgressStore>>;

#[derive(Parser)]
#[command(name = "cutover")]
#[command(about = "Guided checklist for migrating a zone to a full DNS setup")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Keep progress in memory only; nothing is read from or written to disk
    #[arg(long)]
    ephemeral: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show position and overall progress (default)
    Status,

    /// List every step with its status
    Steps,

    /// Show a step's details and checkpoints
    Show {
        /// Step number (1-based) or id; defaults to the current step
        step: Option<String>,
    },

    /// Advance to the next step once required checkpoints are done
    Next,

    /// Go back one step
    Back,

    /// Jump to any step, regardless of completion
    Goto {
        /// Step number (1-based, N+1 = finished) or id
        step: String,
    },

    /// Mark or unmark a checkpoint
    Toggle {
        /// Checkpoint id
        checkpoint: String,

        /// Step owning the checkpoint (default: current step)
        #[arg(short, long)]
        step: Option<String>,
    },

    /// Clear all progress and return to the first step
    Reset {
        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Show reference documentation links
    Docs {
        /// Only show one topic (e.g. ssl, dnssec)
        topic: Option<String>,
    },

    /// Serve the step catalog over HTTP
    Serve {
        /// Port to listen on (default: 7008)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Inspect or validate step catalogs
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },

    /// Inspect or initialize configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// Print the JSON Schema for catalog files
    Schema,
    /// Print the configured catalog as JSON
    Export,
    /// Print the OpenAPI document served by `cutover serve`
    Openapi,
    /// Check a catalog file for problems
    Validate {
        /// Catalog JSON file
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Write the effective configuration to .cutover/config.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first (needed for logging setup)
    let config = Config::load(cli.config.as_deref())?;

    let is_server_mode = matches!(cli.command, Some(Commands::Serve { .. }));

    // Initialize logging (file-based for the server when enabled, stderr otherwise)
    let _logging_handle = logging::init_logging(&config, is_server_mode, cli.debug)?;

    match cli.command.unwrap_or(Commands::Status) {
        Commands::Status => {
            let engine = open_engine(&config, cli.ephemeral).await?;
            println!("{}", render::render_status(&engine));
        }
        Commands::Steps => {
            let engine = open_engine(&config, cli.ephemeral).await?;
            println!("{}", render::render_step_list(&engine));
        }
        Commands::Show { step } => {
            let engine = open_engine(&config, cli.ephemeral).await?;
            let index = match step {
                Some(selector) => resolve_step(engine.catalog(), &selector)?,
                None => engine.current_step(),
            };
            if index > engine.step_count() {
                bail!("No step {}; the guide has {} steps", index + 1, engine.step_count());
            }
            println!("{}", render::render_step(&engine, index));
        }
        Commands::Next => {
            let mut engine = open_engine(&config, cli.ephemeral).await?;
            cmd_next(&mut engine)?;
        }
        Commands::Back => {
            let mut engine = open_engine(&config, cli.ephemeral).await?;
            if !engine.retreat()? {
                println!("Already at the first step");
            }
            print_current(&engine);
        }
        Commands::Goto { step } => {
            let mut engine = open_engine(&config, cli.ephemeral).await?;
            let index = resolve_step(engine.catalog(), &step)?;
            engine.go_to(index)?;
            print_current(&engine);
        }
        Commands::Toggle { checkpoint, step } => {
            let mut engine = open_engine(&config, cli.ephemeral).await?;
            cmd_toggle(&mut engine, &checkpoint, step.as_deref())?;
        }
        Commands::Reset { yes } => {
            let mut engine = open_engine(&config, cli.ephemeral).await?;
            cmd_reset(&mut engine, yes)?;
        }
        Commands::Docs { topic } => {
            let index = builtin::documentation().context("Failed to parse documentation index")?;
            match render::render_documentation(&index, topic.as_deref()) {
                Some(text) => println!("{text}"),
                None => {
                    let topics: Vec<&str> = index.keys().map(String::as_str).collect();
                    bail!(
                        "Unknown topic '{}' (available: {})",
                        topic.unwrap_or_default(),
                        topics.join(", ")
                    );
                }
            }
        }
        Commands::Serve { port } => {
            cmd_serve(&config, port).await?;
        }
        Commands::Catalog { action } => {
            cmd_catalog(&config, action).await?;
        }
        Commands::Config { action } => {
            cmd_config(&config, action)?;
        }
    }

    Ok(())
}

async fn open_engine(config: &Config, ephemeral: bool) -> Result<Engine> {
    let source = source_from_config(&config.catalog)?;
    let store: Box<dyn ProgressStore> = if ephemeral {
        Box::new(MemoryStore::new())
    } else {
        Box::new(JsonFileStore::new(config.state_path()))
    };

    let engine = ProgressEngine::open(source.as_ref(), store).await?;
    Ok(engine)
}

/// Resolve a 1-based step number or a step id to an index.
///
/// Numbers are not range-checked here so that `goto` can report
/// out-of-range positions through the engine.
fn resolve_step(catalog: &StepCatalog, selector: &str) -> Result<usize> {
    if let Ok(number) = selector.parse::<usize>() {
        if number == 0 {
            bail!("Steps are numbered from 1");
        }
        return Ok(number - 1);
    }

    match catalog.index_of(selector) {
        Some(index) => Ok(index),
        None => bail!("Unknown step '{selector}'"),
    }
}

fn print_current(engine: &Engine) {
    println!("{}", render::render_step(engine, engine.current_step()));
    println!();
    println!("{}", render::render_status(engine));
}

fn cmd_next(engine: &mut Engine) -> Result<()> {
    if engine.is_terminal() {
        println!("{}", render::render_finished(engine));
        return Ok(());
    }

    if !engine.advance()? {
        let (done, required) = engine.required_tally(engine.current_step());
        println!("Cannot advance: {done} of {required} required checkpoints done on this step.");
        println!();
    }
    print_current(engine);
    Ok(())
}

/// Step index owning a toggled checkpoint: `--step` if given, else the cursor
fn toggle_step_index(catalog: &StepCatalog, current: usize, step: Option<&str>) -> Result<usize> {
    let Some(selector) = step else {
        if current >= catalog.len() {
            bail!("The migration is finished; pass --step to pick a step");
        }
        return Ok(current);
    };

    let index = resolve_step(catalog, selector)?;
    if index >= catalog.len() {
        bail!(
            "Step {} has no checkpoints; steps are numbered 1 to {}",
            index + 1,
            catalog.len()
        );
    }
    Ok(index)
}

fn cmd_toggle(engine: &mut Engine, checkpoint: &str, step: Option<&str>) -> Result<()> {
    let index = toggle_step_index(engine.catalog(), engine.current_step(), step)?;
    let step_id = engine.catalog().steps()[index].id.clone();

    let completed = engine.toggle_checkpoint(&step_id, checkpoint)?;
    println!(
        "{} {checkpoint}",
        if completed { "Checked" } else { "Unchecked" }
    );
    println!();
    println!("{}", render::render_step(engine, index));
    Ok(())
}

fn cmd_reset(engine: &mut Engine, skip_confirm: bool) -> Result<()> {
    // Only ask when there is something to lose
    if !skip_confirm && engine.has_completed_checkpoints() {
        print!("Reset all progress? This cannot be undone. [y/N] ");

        use std::io::{self, Write};
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Cancelled");
            return Ok(());
        }
    }

    engine.reset()?;
    println!("Progress reset");
    println!();
    println!("{}", render::render_status(engine));
    Ok(())
}

async fn cmd_serve(config: &Config, port: Option<u16>) -> Result<()> {
    let source = source_from_config(&config.catalog)?;
    let state = rest::ApiState::from_source(source.as_ref()).await?;

    let bind: IpAddr = config
        .api
        .bind
        .parse()
        .with_context(|| format!("Invalid api.bind address '{}'", config.api.bind))?;
    let port = port.unwrap_or(config.api.port);

    println!("Serving {} steps on http://{bind}:{port}/api/steps", state.catalog.len());
    rest::serve(state, bind, port).await
}

async fn cmd_catalog(config: &Config, action: CatalogAction) -> Result<()> {
    match action {
        CatalogAction::Schema => {
            println!("{}", CatalogDocument::json_schema()?);
        }
        CatalogAction::Export => {
            let source = source_from_config(&config.catalog)?;
            let catalog = catalog::load(source.as_ref()).await?;
            println!("{}", catalog.to_document().to_json()?);
        }
        CatalogAction::Openapi => {
            println!("{}", rest::ApiDoc::json()?);
        }
        CatalogAction::Validate { file } => {
            let catalog = catalog::load(&FileSource::new(&file)).await?;
            let fraction_total = (0..catalog.len())
                .filter(|&i| !catalog.is_progress_exempt(i))
                .count();
            println!(
                "{}: {} steps ({} counted toward progress)",
                file.display(),
                catalog.len(),
                fraction_total
            );
            println!("digest: {}", catalog.digest());
        }
    }
    Ok(())
}

fn cmd_config(config: &Config, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            print!("{}", config.to_toml()?);
        }
        ConfigAction::Init { force } => {
            let path = Config::project_config_path();
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            config.save()?;
            println!("Wrote {}", path.display());
        }
    }
    Ok(())
}

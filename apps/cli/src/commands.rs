//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use blockpath_core::{
    BreadcrumbDerivation, Breadcrumbs, ContentTracker, DisplaySurface, EditorEvent, EventHub,
    WordCountDerivation, fetch_block_snapshot, fetch_focus_snapshot, fetch_page_snapshot,
    find_block,
};
use blockpath_host::{HostOptions, HttpEditorApi};
use blockpath_shared::{
    AppConfig, Block, BlockId, Page, Snapshot, TrackerConfig, init_config, load_config,
    load_config_from,
};
use blockpath_text::{TextOptions, page_word_count};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// blockpath: where am I in this page, and how long is it?
#[derive(Parser)]
#[command(
    name = "blockpath",
    version,
    about = "Breadcrumb trails and page word counts for an outliner's edit focus.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.blockpath/blockpath.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Host API endpoint, overriding `host.endpoint`.
    #[arg(long, env = "BLOCKPATH_ENDPOINT", global = true)]
    pub endpoint: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Print the breadcrumb trail of the focused block.
    Breadcrumb {
        /// Use this block instead of the one in edit focus.
        #[arg(long)]
        block: Option<Uuid>,

        /// Print the crumbs as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print the word count of a page.
    Count {
        /// Page name (defaults to the page of the focused block).
        #[arg(long)]
        page: Option<String>,
    },

    /// Inspect a saved `{ "page": .., "tree": [..] }` dump without the host.
    Inspect {
        /// Path to the JSON dump.
        file: PathBuf,

        /// Print the breadcrumb trail of this block id.
        #[arg(long)]
        block: Option<u64>,
    },

    /// Run both trackers on editor events read from stdin, one per line.
    ///
    /// Events: focus, blur, change, navigate <page>, show, hide.
    Watch {
        /// Debounce for content changes, in milliseconds.
        #[arg(long)]
        debounce_ms: Option<u64>,

        /// Grace period after a blur, in milliseconds.
        #[arg(long)]
        blur_grace_ms: Option<u64>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr so stdout stays
/// clean for command output.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "blockpath=info",
        1 => "blockpath=debug",
        _ => "blockpath=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    if let Command::Config {
        action: ConfigAction::Init,
    } = cli.command
    {
        return cmd_config_init();
    }

    let config = resolve_config(cli.config.as_deref(), cli.endpoint)?;

    match cli.command {
        Command::Breadcrumb { block, json } => cmd_breadcrumb(&config, block, json).await,
        Command::Count { page } => cmd_count(&config, page.as_deref()).await,
        Command::Inspect { file, block } => cmd_inspect(&config, &file, block.map(BlockId)),
        Command::Watch {
            debounce_ms,
            blur_grace_ms,
        } => {
            let mut timing = TrackerConfig::from(&config);
            if let Some(ms) = debounce_ms {
                timing.debounce = Duration::from_millis(ms);
            }
            if let Some(ms) = blur_grace_ms {
                timing.blur_grace = Duration::from_millis(ms);
            }
            cmd_watch(&config, timing).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(&config),
        },
    }
}

/// Load the config file and apply flag overrides.
fn resolve_config(path: Option<&Path>, endpoint: Option<String>) -> Result<AppConfig> {
    let mut config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    if let Some(endpoint) = endpoint {
        config.host.endpoint = endpoint;
    }
    Ok(config)
}

fn connect(config: &AppConfig) -> Result<HttpEditorApi> {
    let opts = HostOptions::from_config(config)?;
    info!(endpoint = %opts.endpoint, "connecting to host API");
    Ok(HttpEditorApi::new(opts)?)
}

// ---------------------------------------------------------------------------
// One-shot commands
// ---------------------------------------------------------------------------

async fn cmd_breadcrumb(config: &AppConfig, block: Option<Uuid>, json: bool) -> Result<()> {
    let api = connect(config)?;
    let opts = TextOptions::from_config(config)?;

    let snapshot = match block {
        Some(uuid) => fetch_block_snapshot(&api, uuid).await?,
        None => fetch_focus_snapshot(&api).await?,
    }
    .ok_or_else(|| {
        eyre!("no block to resolve: nothing is in edit focus or the block does not exist")
    })?;

    let crumbs = Breadcrumbs::for_snapshot(&snapshot, &opts).ok_or_else(|| {
        eyre!(
            "block is not part of the tree of page '{}'",
            snapshot.page().display_name()
        )
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&crumbs)?);
    } else {
        println!("{}", crumbs.render(&config.display.separator));
    }
    Ok(())
}

async fn cmd_count(config: &AppConfig, page: Option<&str>) -> Result<()> {
    let api = connect(config)?;
    let opts = TextOptions::from_config(config)?;

    let snapshot = match page {
        Some(name) => fetch_page_snapshot(&api, name)
            .await?
            .ok_or_else(|| eyre!("page '{name}' not found"))?,
        None => fetch_focus_snapshot(&api)
            .await?
            .ok_or_else(|| eyre!("nothing is in edit focus; pass --page"))?,
    };

    let words = page_word_count(snapshot.tree(), &opts);
    println!("{words}");
    Ok(())
}

fn cmd_inspect(config: &AppConfig, file: &Path, block: Option<BlockId>) -> Result<()> {
    let opts = TextOptions::from_config(config)?;
    let (page, tree) = read_dump(file)?;

    let focus = match block {
        Some(id) => Some(
            find_block(&tree, id)
                .cloned()
                .ok_or_else(|| eyre!("block {id} is not in {}", file.display()))?,
        ),
        None => None,
    };
    let snapshot = Snapshot::capture(page, tree, focus);

    println!();
    println!("  Page:   {}", snapshot.page().display_name());
    println!("  Blocks: {}", snapshot.block_count());
    println!("  Words:  {}", page_word_count(snapshot.tree(), &opts));
    if let Some(crumbs) = Breadcrumbs::for_snapshot(&snapshot, &opts) {
        println!("  Trail:  {}", crumbs.render(&config.display.separator));
    }
    println!();

    Ok(())
}

/// Read a `{ "page": .., "tree": [..] }` dump.
fn read_dump(file: &Path) -> Result<(Page, Vec<Block>)> {
    let raw = std::fs::read_to_string(file)
        .wrap_err_with(|| format!("failed to read {}", file.display()))?;
    let mut dump: Value = serde_json::from_str(&raw)
        .wrap_err_with(|| format!("{} is not valid JSON", file.display()))?;

    let page: Page = serde_json::from_value(dump["page"].take())
        .wrap_err("dump has no valid \"page\" object")?;
    let tree: Vec<Block> = serde_json::from_value(dump["tree"].take())
        .wrap_err("dump has no valid \"tree\" array")?;
    Ok((page, tree))
}

// ---------------------------------------------------------------------------
// watch
// ---------------------------------------------------------------------------

/// Prints each published value as `<name>: <text>`.
struct PrintSurface<F> {
    name: &'static str,
    format: F,
}

impl<T, F> DisplaySurface<T> for PrintSurface<F>
where
    F: Fn(&T) -> String + Send + 'static,
{
    fn show(&mut self, value: &T) {
        println!("{}: {}", self.name, (self.format)(value));
    }

    fn clear(&mut self) {
        println!("{}: (cleared)", self.name);
    }
}

async fn cmd_watch(config: &AppConfig, timing: TrackerConfig) -> Result<()> {
    let api = Arc::new(connect(config)?);
    let opts = TextOptions::from_config(config)?;
    let separator = config.display.separator.clone();

    let crumbs = ContentTracker::new(
        Arc::clone(&api),
        BreadcrumbDerivation::new(opts.clone()),
        PrintSurface {
            name: "breadcrumb",
            format: move |crumbs: &Breadcrumbs| crumbs.render(&separator),
        },
        timing,
    );
    let words = ContentTracker::new(
        api,
        WordCountDerivation::new(opts),
        PrintSurface {
            name: "words",
            format: |count: &usize| count.to_string(),
        },
        timing,
    );

    let mut hub = EventHub::new();
    let handles = [
        tokio::spawn(crumbs.run(hub.subscribe())),
        tokio::spawn(words.run(hub.subscribe())),
    ];

    info!(
        debounce_ms = timing.debounce.as_millis() as u64,
        blur_grace_ms = timing.blur_grace.as_millis() as u64,
        "watching stdin for editor events"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => match parse_event(&line) {
                    Ok(Some(event)) => hub.publish(event).await,
                    Ok(None) => {}
                    Err(e) => warn!(%line, error = %e, "ignoring input line"),
                },
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }

    // Closing the hub stops the trackers once their last fetch lands.
    drop(hub);
    for handle in handles {
        handle.await?;
    }
    Ok(())
}

/// Parse one line of `watch` input. Blank lines and `#` comments are skipped.
fn parse_event(line: &str) -> Result<Option<EditorEvent>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let event = match word.to_ascii_lowercase().as_str() {
        "focus" => EditorEvent::Focus,
        "blur" => EditorEvent::Blur,
        "change" => EditorEvent::Change,
        "navigate" if !rest.is_empty() => EditorEvent::Navigate {
            page: rest.to_string(),
        },
        "navigate" => return Err(eyre!("navigate needs a page name")),
        "show" => EditorEvent::Visibility { visible: true },
        "hide" => EditorEvent::Visibility { visible: false },
        other => return Err(eyre!("unknown event '{other}'")),
    };
    Ok(Some(event))
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

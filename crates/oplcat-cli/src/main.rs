//! oplcat
//!
//! Lists, renames and registers the games installed on an Open PS2 Loader
//! game root, in either the directory layout or the legacy `ul.cfg` layout.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use oplcat_config::{CatalogConfig, DEFAULT_CONFIG_FILE, InstallationType, StorageConfig};
use oplcat_library::{Game, GameStorage, MediaType, detect_installation_type, open_storage};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "oplcat", version)]
#[command(about = "Manage the game catalog of an Open PS2 Loader game root")]
struct Cli {
    /// Configuration file; ./oplcat.toml is used when present
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Game root directory
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Storage layout (directory or ul_config); detected from the root when omitted
    #[arg(long, global = true, value_parser = parse_kind)]
    kind: Option<InstallationType>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List installed games
    List {
        /// Print a JSON array instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Change the title of a game
    Rename {
        /// Select the game by catalog position instead of id
        #[arg(long)]
        index: Option<usize>,

        /// `<ID> <TITLE>`, or only `<TITLE>` together with --index
        #[arg(required = true, num_args = 1..=2, value_name = "ID TITLE")]
        args: Vec<String>,
    },

    /// Add an installed game to the catalog
    Register {
        #[arg(long)]
        id: String,

        #[arg(long)]
        title: String,

        /// cd or dvd
        #[arg(long, value_parser = parse_media)]
        media: MediaType,

        /// Number of part files
        #[arg(long, default_value_t = 1)]
        parts: u8,
    },

    /// Show the resolved game root and layout
    Info,
}

#[derive(Debug, PartialEq, Eq)]
enum RenameTarget {
    Id(String),
    Index(usize),
}

fn parse_media(s: &str) -> Result<MediaType, String> {
    MediaType::from_name(s).ok_or_else(|| format!("unknown media '{}', expected cd or dvd", s))
}

fn parse_kind(s: &str) -> Result<InstallationType, String> {
    s.parse::<InstallationType>().map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    setup_logging(&config.logging.level);

    let (root, kind) = resolve_storage(cli.root.as_deref(), cli.kind, &config)?;
    let stdout = io::stdout();
    execute(cli.command, &root, kind, &mut stdout.lock())
}

/// Setup logging on stderr; `RUST_LOG` wins over the configured level
fn setup_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(io::stderr),
        )
        .init();
}

fn load_config(path: Option<&Path>) -> Result<CatalogConfig> {
    let path = path.map(Path::to_path_buf).or_else(|| {
        let default = PathBuf::from(DEFAULT_CONFIG_FILE);
        default.is_file().then_some(default)
    });

    CatalogConfig::load_layered(path.as_deref()).with_context(|| match &path {
        Some(path) => format!("Failed to load configuration from {}", path.display()),
        None => "Failed to load configuration".to_string(),
    })
}

/// Command-line flags first, then configuration, then layout detection
fn resolve_storage(
    root: Option<&Path>,
    kind: Option<InstallationType>,
    config: &CatalogConfig,
) -> Result<(PathBuf, InstallationType)> {
    let mut storage = StorageConfig {
        root: root.map(Path::to_path_buf),
        installation: kind,
    };
    storage.merge(&config.storage);

    let root = storage
        .root
        .context("No game root given; pass --root or set storage.root")?;
    let kind = storage
        .installation
        .unwrap_or_else(|| detect_installation_type(&root));
    Ok((root, kind))
}

fn rename_target(index: Option<usize>, mut args: Vec<String>) -> Result<(RenameTarget, String)> {
    match (index, args.len()) {
        (Some(index), 1) => Ok((RenameTarget::Index(index), args.remove(0))),
        (None, 2) => {
            let title = args.remove(1);
            Ok((RenameTarget::Id(args.remove(0)), title))
        }
        (Some(_), _) => bail!("With --index, give only the new title"),
        (None, _) => bail!("Give the game id and the new title"),
    }
}

fn open_loaded(root: &Path, kind: InstallationType) -> Result<Box<dyn GameStorage>> {
    let mut storage = open_storage(kind);
    storage
        .load(root)
        .with_context(|| format!("Failed to load {} storage at {}", kind, root.display()))?;
    Ok(storage)
}

fn execute(
    command: Commands,
    root: &Path,
    kind: InstallationType,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        Commands::Info => {
            writeln!(out, "Root:   {}", root.display())?;
            writeln!(out, "Layout: {}", kind)?;
        }

        Commands::List { json } => {
            let storage = open_loaded(root, kind)?;
            let games: Vec<&Game> = storage.collection().iter().collect();
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&games)?)?;
            } else if games.is_empty() {
                writeln!(out, "No games found in {}", root.display())?;
            } else {
                out.write_all(format_table(&games).as_bytes())?;
            }
        }

        Commands::Rename { index, args } => {
            let (target, title) = rename_target(index, args)?;
            let mut storage = open_loaded(root, kind)?;
            match target {
                RenameTarget::Id(id) => storage
                    .rename_game(&id, &title)
                    .with_context(|| format!("Failed to rename {}", id))?,
                RenameTarget::Index(index) => storage
                    .rename_game_at(index, &title)
                    .with_context(|| format!("Failed to rename game #{}", index))?,
            }
            writeln!(out, "Renamed to '{}'", title)?;
        }

        Commands::Register {
            id,
            title,
            media,
            parts,
        } => {
            let mut storage = open_loaded(root, kind)?;
            let game = Game::new(id.clone(), media)
                .with_title(title)
                .with_parts(parts);
            storage
                .register_game(game)
                .with_context(|| format!("Failed to register {}", id))?;
            info!("Catalog now holds {} games", storage.collection().len());
            writeln!(out, "Registered {}", id)?;
        }
    }

    Ok(())
}

fn format_table(games: &[&Game]) -> String {
    let mut table = format!(
        "{:>3}  {:<12}  {:<7}  {:>5}  {}\n",
        "#", "ID", "MEDIA", "PARTS", "TITLE"
    );
    for (index, game) in games.iter().enumerate() {
        table.push_str(&format!(
            "{:>3}  {:<12}  {:<7}  {:>5}  {}\n",
            index, game.id, game.media_type, game.part_count, game.title
        ));
    }
    table
}

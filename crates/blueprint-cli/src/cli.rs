//! Command-line interface for the blueprint utility
//!
//! Inspects and edits the stores persisted in a data directory.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::colorizer::colorize_json;
use crate::table::Table;
use blueprint::core::logging::init_logging;
use blueprint::{CollectionKind, FileStorage, HubConfig, JsonPatch, StoreHub, StoreKind};
use tracing::{debug, info};

/// Blueprint - inspect and edit persisted artifact stores
#[derive(Parser)]
#[command(name = "blueprint")]
#[command(about = "Inspect and edit the persisted stores of a blueprint workspace")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding the store snapshots
    #[arg(long, global = true, env = "BLUEPRINT_DATA_DIR", default_value = ".blueprint")]
    pub data_dir: PathBuf,

    /// Prefix of the snapshot names
    #[arg(long, global = true, env = "BLUEPRINT_KEY_PREFIX", default_value = "blueprint")]
    pub prefix: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Set log level (trace|debug|info|warn|error|off)
    #[arg(
        long,
        global = true,
        env = "BLUEPRINT_LOG_LEVEL",
        value_enum,
        default_value_t = LogLevel::Warn
    )]
    pub log_level: LogLevel,

    /// Set log format (compact|pretty|json)
    #[arg(
        long,
        global = true,
        env = "BLUEPRINT_LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Compact
    )]
    pub log_format: LogFormat,

    /// When to use colors in output
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,
}

/// Log level options
#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }
}

/// Log format options
#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Compact => "compact",
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
        }
    }
}

/// When to colorize output
#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Use colors if output is a terminal and NO_COLOR is not set
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create the data directory and register the built-in schemas
    Init,

    /// Show every store with its snapshot name and record counts
    Stores {
        /// Show in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List the records of a collection
    List {
        #[arg(value_parser = parse_collection)]
        collection: CollectionKind,

        /// Print the records as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Print one record as JSON
    Show {
        #[arg(value_parser = parse_collection)]
        collection: CollectionKind,

        key: String,
    },

    /// Insert or overwrite a record read as JSON
    Add {
        #[arg(value_parser = parse_collection)]
        collection: CollectionKind,

        /// File containing the record (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Merge a JSON object into a record
    Update {
        #[arg(value_parser = parse_collection)]
        collection: CollectionKind,

        key: String,

        /// JSON object whose fields replace the record's fields
        #[arg(long)]
        patch: String,
    },

    /// Remove a record
    Remove {
        #[arg(value_parser = parse_collection)]
        collection: CollectionKind,

        key: String,
    },

    /// Set the current selection of a collection, or clear it without a key
    Select {
        #[arg(value_parser = parse_collection)]
        collection: CollectionKind,

        key: Option<String>,
    },

    /// Print the raw snapshot of a store
    Dump {
        #[arg(value_parser = parse_store)]
        store: StoreKind,

        /// Output file for the snapshot (use - for stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Clear a store and delete its snapshot
    Reset {
        #[arg(value_parser = parse_store)]
        store: StoreKind,
    },
}

fn parse_collection(s: &str) -> Result<CollectionKind, String> {
    s.parse().map_err(|_| {
        let names: Vec<&str> = CollectionKind::ALL.iter().map(|k| k.as_str()).collect();
        format!("unknown collection '{}' (expected one of: {})", s, names.join(", "))
    })
}

fn parse_store(s: &str) -> Result<StoreKind, String> {
    s.parse().map_err(|_| {
        let names: Vec<&str> = StoreKind::ALL.iter().map(|k| k.as_str()).collect();
        format!("unknown store '{}' (expected one of: {})", s, names.join(", "))
    })
}

/// Initialize logging from the parsed flags
pub fn init_cli_logging(cli: &Cli) {
    if let Err(e) = init_logging(Some(cli.log_level.as_str()), Some(cli.log_format.as_str())) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }
}

/// Columns shown by `list` for each collection, as JSON field paths
fn summary_columns(collection: CollectionKind) -> &'static [&'static str] {
    match collection {
        CollectionKind::Documents => &["title", "content.kind"],
        CollectionKind::Models => &["name", "kind"],
        CollectionKind::Schemas => &["title", "kind"],
        CollectionKind::Generations => &["document_kind", "status"],
        CollectionKind::Charts => &["title", "kind"],
        CollectionKind::Templates => &["name", "document_kind"],
        CollectionKind::Sessions => &["protocol", "status"],
    }
}

fn column_header(path: &str) -> String {
    path.rsplit('.').next().unwrap_or(path).to_uppercase()
}

fn field_text(record: &Value, path: &str) -> String {
    let field = path
        .split('.')
        .try_fold(record, |value, segment| value.get(segment));
    match field {
        None | Some(Value::Null) => "-".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// One entry of `stores --json`
#[derive(Debug, Serialize)]
struct StoreSummary {
    store: &'static str,
    name: String,
    collections: BTreeMap<&'static str, usize>,
    persisted: bool,
    persist_failures: u64,
}

/// Main CLI application
pub struct BlueprintApp {
    hub: StoreHub,
    data_dir: PathBuf,
    color: ColorChoice,
    verbose: bool,
}

impl BlueprintApp {
    /// Open the stores kept in `data_dir`
    pub fn open(data_dir: &Path, prefix: &str) -> Result<Self> {
        let storage = FileStorage::create(data_dir)
            .with_context(|| format!("Failed to open data directory '{}'", data_dir.display()))?;
        let hub = StoreHub::open(Arc::new(storage), &HubConfig::new(prefix));
        info!(data_dir = %data_dir.display(), prefix, "Opened data directory");
        Ok(Self {
            hub,
            data_dir: data_dir.to_path_buf(),
            color: ColorChoice::Auto,
            verbose: false,
        })
    }

    /// Open the stores named by the global flags
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let mut app = Self::open(&cli.data_dir, &cli.prefix)?;
        app.color = cli.color;
        app.verbose = cli.verbose;
        Ok(app)
    }

    pub fn hub(&self) -> &StoreHub {
        &self.hub
    }

    /// Run one command
    pub fn run(&mut self, command: Commands) -> Result<()> {
        if self.verbose {
            eprintln!(
                "Blueprint v{} ({})",
                env!("CARGO_PKG_VERSION"),
                self.data_dir.display()
            );
        }
        debug!(?command, "Running command");

        match command {
            Commands::Init => self.init_command(),
            Commands::Stores { json } => self.stores_command(json),
            Commands::List { collection, json } => self.list_command(collection, json),
            Commands::Show { collection, key } => self.show_command(collection, &key),
            Commands::Add { collection, input } => self.add_command(collection, input),
            Commands::Update {
                collection,
                key,
                patch,
            } => self.update_command(collection, &key, &patch),
            Commands::Remove { collection, key } => self.remove_command(collection, &key),
            Commands::Select { collection, key } => self.select_command(collection, key),
            Commands::Dump { store, output } => self.dump_command(store, output),
            Commands::Reset { store } => self.reset_command(store),
        }?;

        self.report_persist_failures()
    }

    fn report_persist_failures(&self) -> Result<()> {
        let failed: Vec<&str> = StoreKind::ALL
            .into_iter()
            .filter(|store| self.hub.persist_failures(*store) > 0)
            .map(|store| store.as_str())
            .collect();
        if failed.is_empty() {
            Ok(())
        } else {
            Err(anyhow!("Failed to save stores: {}", failed.join(", ")))
        }
    }

    fn init_command(&mut self) -> Result<()> {
        self.hub.initialize();
        println!(
            "Initialized {} stores in {}",
            StoreKind::ALL.len(),
            self.data_dir.display()
        );
        Ok(())
    }

    fn stores_command(&self, json: bool) -> Result<()> {
        if json {
            let stores = StoreKind::ALL
                .into_iter()
                .map(|store| -> Result<StoreSummary> {
                    Ok(StoreSummary {
                        store: store.as_str(),
                        name: self.hub.config().storage_key(store),
                        collections: store
                            .collections()
                            .iter()
                            .map(|c| (c.as_str(), self.hub.count(*c)))
                            .collect(),
                        persisted: self.hub.persisted(store)?.is_some(),
                        persist_failures: self.hub.persist_failures(store),
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            println!("{}", serde_json::to_string_pretty(&stores)?);
            return Ok(());
        }

        let mut table = Table::new(["STORE", "SNAPSHOT", "RECORDS"]);
        for store in StoreKind::ALL {
            let counts: Vec<String> = store
                .collections()
                .iter()
                .map(|c| format!("{}={}", c.as_str(), self.hub.count(*c)))
                .collect();
            let snapshot = match self.hub.persisted(store)? {
                Some(_) => self.hub.config().storage_key(store),
                None => "-".to_string(),
            };
            table.push_row(vec![store.as_str().to_string(), snapshot, counts.join(" ")]);
        }
        print!("{}", table.render(self.should_colorize(&None)));
        Ok(())
    }

    fn list_command(&self, collection: CollectionKind, json: bool) -> Result<()> {
        let records = self.hub.list_json(collection)?;

        if json {
            println!("{}", serde_json::to_string_pretty(&records)?);
            return Ok(());
        }

        let columns = summary_columns(collection);
        let current = self.hub.current_key(collection);
        let mut table = Table::new(
            ["", "KEY"]
                .into_iter()
                .map(str::to_string)
                .chain(columns.iter().map(|path| column_header(path))),
        );
        for record in &records {
            let key = field_text(record, "id");
            let marker = if current == Some(key.as_str()) { "*" } else { "" };
            let mut row = vec![marker.to_string(), key];
            row.extend(columns.iter().map(|path| field_text(record, path)));
            table.push_row(row);
        }

        if table.is_empty() {
            if self.verbose {
                eprintln!("No {} stored", collection);
            }
            return Ok(());
        }
        print!("{}", table.render(self.should_colorize(&None)));
        Ok(())
    }

    fn show_command(&self, collection: CollectionKind, key: &str) -> Result<()> {
        let record = self
            .hub
            .get_json(collection, key)?
            .ok_or_else(|| anyhow!("No record '{}' in {}", key, collection))?;
        let pretty = serde_json::to_string_pretty(&record)?;
        let output = if self.should_colorize(&None) {
            colorize_json(&pretty)
        } else {
            pretty
        };
        self.write_output(None, &output)
    }

    fn add_command(&mut self, collection: CollectionKind, input: Option<PathBuf>) -> Result<()> {
        let content = self.read_input(input)?;
        if self.verbose {
            eprintln!("Read {} bytes of input", content.len());
        }

        let value: Value = serde_json::from_str(&content).context("Input is not valid JSON")?;
        let key = self
            .hub
            .add_json(collection, value)
            .with_context(|| format!("Input is not a valid record for {}", collection))?;
        println!("{}", key);
        Ok(())
    }

    fn update_command(&mut self, collection: CollectionKind, key: &str, patch: &str) -> Result<()> {
        let patch = JsonPatch::parse(patch)?;
        if self.verbose {
            let fields: Vec<&str> = patch.field_names().collect();
            eprintln!("Patching fields: {}", fields.join(", "));
        }
        let applied = self
            .hub
            .update_json(collection, key, patch)
            .with_context(|| format!("Cannot update '{}' in {}", key, collection))?;
        if !applied {
            bail!("No record '{}' in {}", key, collection);
        }
        println!("Updated {}", key);
        Ok(())
    }

    fn remove_command(&mut self, collection: CollectionKind, key: &str) -> Result<()> {
        if !self.hub.remove_json(collection, key) {
            bail!("No record '{}' in {}", key, collection);
        }
        println!("Removed {}", key);
        Ok(())
    }

    fn select_command(&mut self, collection: CollectionKind, key: Option<String>) -> Result<()> {
        if !self.hub.has_selection(collection) {
            bail!("{} keep no current selection", collection);
        }
        if !self.hub.select(collection, key.as_deref()) {
            bail!(
                "No record '{}' in {}",
                key.as_deref().unwrap_or_default(),
                collection
            );
        }
        match key {
            Some(key) => println!("Selected {}", key),
            None => println!("Cleared {} selection", collection),
        }
        Ok(())
    }

    fn dump_command(&self, store: StoreKind, output: Option<PathBuf>) -> Result<()> {
        let raw = self
            .hub
            .persisted(store)?
            .ok_or_else(|| anyhow!("Store {} has no snapshot", store))?;
        let content = match serde_json::from_str::<Value>(&raw) {
            Ok(value) => serde_json::to_string_pretty(&value)?,
            Err(_) => raw,
        };
        self.write_output(output, &content)
    }

    fn reset_command(&mut self, store: StoreKind) -> Result<()> {
        self.hub.reset(store);
        println!("Reset {}", store);
        Ok(())
    }

    /// Determine if we should colorize the output based on color choice and output destination
    fn should_colorize(&self, output: &Option<PathBuf>) -> bool {
        match self.color {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => {
                if std::env::var("NO_COLOR").is_ok() {
                    return false;
                }
                match output {
                    None => crossterm::tty::IsTty::is_tty(&std::io::stdout()),
                    Some(p) if p.to_str() == Some("-") => {
                        crossterm::tty::IsTty::is_tty(&std::io::stdout())
                    }
                    Some(_) => false,
                }
            }
        }
    }

    /// Read input from file or stdin
    pub fn read_input(&self, input: Option<PathBuf>) -> Result<String> {
        match input {
            Some(path) if path.to_string_lossy() != "-" => fs::read_to_string(&path)
                .map_err(|e| anyhow!("Failed to read input file '{}': {}", path.display(), e)),
            _ => {
                let mut content = String::new();
                io::stdin().read_to_string(&mut content)?;
                Ok(content)
            }
        }
    }

    /// Write output to file or stdout
    pub fn write_output(&self, output: Option<PathBuf>, content: &str) -> Result<()> {
        match output {
            Some(path) if path.to_string_lossy() != "-" => {
                fs::write(&path, content).map_err(|e| {
                    anyhow!("Failed to write output file '{}': {}", path.display(), e)
                })?;
            }
            _ => {
                if content.is_empty() || content.ends_with('\n') {
                    print!("{}", content);
                } else {
                    println!("{}", content);
                }
                io::stdout().flush()?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blueprint::Chart;
    use tempfile::tempdir;

    fn app(dir: &Path) -> BlueprintApp {
        let mut app = BlueprintApp::open(dir, "blueprint").unwrap();
        app.color = ColorChoice::Never;
        app
    }

    fn write_record(dir: &Path, json: &str) -> PathBuf {
        let path = dir.join("record.json");
        fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn test_cli_parsing_list_command() {
        let args = vec!["blueprint", "list", "charts", "--json"];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.command {
            Commands::List { collection, json } => {
                assert_eq!(collection, CollectionKind::Charts);
                assert!(json);
            }
            _ => panic!("Expected List command"),
        }
        assert_eq!(cli.color, ColorChoice::Auto);
        assert_eq!(cli.prefix, "blueprint");
    }

    #[test]
    fn test_cli_parsing_rejects_unknown_collection() {
        let args = vec!["blueprint", "list", "widgets"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_cli_parsing_update_command() {
        let args = vec![
            "blueprint",
            "update",
            "documents",
            "d-1",
            "--patch",
            r#"{"title": "New"}"#,
        ];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.command {
            Commands::Update {
                collection,
                key,
                patch,
            } => {
                assert_eq!(collection, CollectionKind::Documents);
                assert_eq!(key, "d-1");
                assert_eq!(patch, r#"{"title": "New"}"#);
            }
            _ => panic!("Expected Update command"),
        }
    }

    #[test]
    fn test_cli_parsing_select_without_key() {
        let args = vec!["blueprint", "select", "charts"];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.command {
            Commands::Select { collection, key } => {
                assert_eq!(collection, CollectionKind::Charts);
                assert!(key.is_none());
            }
            _ => panic!("Expected Select command"),
        }
    }

    #[test]
    fn test_cli_parsing_global_flags_after_command() {
        let args = vec![
            "blueprint",
            "dump",
            "chart-engine",
            "--data-dir",
            "/tmp/bp",
            "--log-level",
            "debug",
            "--color",
            "never",
            "--verbose",
        ];
        let cli = Cli::try_parse_from(args).unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.data_dir, PathBuf::from("/tmp/bp"));
        assert_eq!(cli.log_level, LogLevel::Debug);
        assert_eq!(cli.color, ColorChoice::Never);
        match cli.command {
            Commands::Dump { store, output } => {
                assert_eq!(store, StoreKind::Charts);
                assert!(output.is_none());
            }
            _ => panic!("Expected Dump command"),
        }
    }

    #[test]
    fn test_init_registers_schemas() {
        let dir = tempdir().unwrap();
        let mut app = app(dir.path());
        app.run(Commands::Init).unwrap();
        assert_eq!(app.hub().count(CollectionKind::Schemas), 5);
        assert!(dir.path().join("blueprint-document-engine.json").is_file());
    }

    #[test]
    fn test_add_update_remove_round() {
        let dir = tempdir().unwrap();
        let mut app = app(dir.path());
        let input = write_record(
            dir.path(),
            r#"{"id": "c-1", "title": "Errors", "kind": "bar"}"#,
        );

        app.run(Commands::Add {
            collection: CollectionKind::Charts,
            input: Some(input),
        })
        .unwrap();
        app.run(Commands::Update {
            collection: CollectionKind::Charts,
            key: "c-1".to_string(),
            patch: r#"{"title": "Error rate"}"#.to_string(),
        })
        .unwrap();
        assert_eq!(
            app.hub().charts.get::<Chart>("c-1").map(|c| c.title.as_str()),
            Some("Error rate")
        );

        // A second app over the same directory sees the change
        let reopened = BlueprintApp::open(dir.path(), "blueprint").unwrap();
        assert_eq!(reopened.hub().count(CollectionKind::Charts), 1);

        app.run(Commands::Remove {
            collection: CollectionKind::Charts,
            key: "c-1".to_string(),
        })
        .unwrap();
        assert_eq!(app.hub().count(CollectionKind::Charts), 0);
    }

    #[test]
    fn test_missing_keys_are_errors() {
        let dir = tempdir().unwrap();
        let mut app = app(dir.path());

        let show = app.run(Commands::Show {
            collection: CollectionKind::Documents,
            key: "nope".to_string(),
        });
        assert!(show.unwrap_err().to_string().contains("No record 'nope'"));

        assert!(app
            .run(Commands::Update {
                collection: CollectionKind::Documents,
                key: "nope".to_string(),
                patch: "{}".to_string(),
            })
            .is_err());
        assert!(app
            .run(Commands::Select {
                collection: CollectionKind::Charts,
                key: Some("nope".to_string()),
            })
            .is_err());
    }

    #[test]
    fn test_invalid_record_is_rejected() {
        let dir = tempdir().unwrap();
        let mut app = app(dir.path());
        let input = write_record(dir.path(), r#"{"id": "c-1"}"#);

        let err = app
            .run(Commands::Add {
                collection: CollectionKind::Charts,
                input: Some(input),
            })
            .unwrap_err();
        assert!(err.to_string().contains("not a valid record"));
        assert_eq!(app.hub().count(CollectionKind::Charts), 0);
    }

    #[test]
    fn test_update_rejects_key_change() {
        let dir = tempdir().unwrap();
        let mut app = app(dir.path());
        let input = write_record(
            dir.path(),
            r#"{"id": "c-1", "title": "Errors", "kind": "bar"}"#,
        );
        app.run(Commands::Add {
            collection: CollectionKind::Charts,
            input: Some(input),
        })
        .unwrap();

        let err = app
            .run(Commands::Update {
                collection: CollectionKind::Charts,
                key: "c-1".to_string(),
                patch: r#"{"id": "c-2"}"#.to_string(),
            })
            .unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid patch"));
        assert!(app.hub().charts.get::<Chart>("c-1").is_some());
        assert!(app.hub().charts.get::<Chart>("c-2").is_none());
    }

    #[test]
    fn test_select_on_collection_without_selection() {
        let dir = tempdir().unwrap();
        let mut app = app(dir.path());
        let err = app
            .run(Commands::Select {
                collection: CollectionKind::Generations,
                key: None,
            })
            .unwrap_err();
        assert!(err.to_string().contains("no current selection"));
    }

    #[test]
    fn test_dump_writes_snapshot_file() {
        let dir = tempdir().unwrap();
        let mut app = app(dir.path());
        app.run(Commands::Init).unwrap();

        let out = dir.path().join("dump.json");
        app.run(Commands::Dump {
            store: StoreKind::Documents,
            output: Some(out.clone()),
        })
        .unwrap();
        let dumped: Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(dumped["version"], 0);
        assert_eq!(dumped["state"]["schemas"].as_array().map(Vec::len), Some(5));

        app.run(Commands::Reset {
            store: StoreKind::Documents,
        })
        .unwrap();
        assert!(app
            .run(Commands::Dump {
                store: StoreKind::Documents,
                output: None,
            })
            .is_err());
    }

    #[test]
    fn test_field_text_paths() {
        let record = serde_json::json!({
            "id": "d-1",
            "content": {"kind": "api_spec"},
            "count": 3,
            "missing": null
        });
        assert_eq!(field_text(&record, "content.kind"), "api_spec");
        assert_eq!(field_text(&record, "count"), "3");
        assert_eq!(field_text(&record, "missing"), "-");
        assert_eq!(field_text(&record, "content.nope"), "-");
    }

    #[test]
    fn test_read_input_from_file() {
        let dir = tempdir().unwrap();
        let app = app(dir.path());
        let path = write_record(dir.path(), "{}");
        assert_eq!(app.read_input(Some(path)).unwrap(), "{}");
    }
}

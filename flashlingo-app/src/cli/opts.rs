use crate::config::{AppConfig, StoreKind};
use clap::{Args, Parser, Subcommand, ValueEnum};
use flashlingo_core::Direction;
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[command(
    name = "flashlingo",
    version,
    about = "FlashLingo vocabulary cards and quizzes (CLI/TUI/API)"
)]
pub struct Cli {
    /// Storage backend (overrides config)
    #[arg(long, value_enum)]
    pub store: Option<StoreKind>,

    /// Whose collection to work on (overrides config)
    #[arg(long)]
    pub user: Option<String>,

    /// Data directory for the JSON store and default SQLite file
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// SQLite DB path when --store sqlite
    #[arg(long)]
    pub db_path: Option<PathBuf>,

    /// Postgres URL when --store pg
    #[arg(long)]
    pub database_url: Option<String>,

    /// Log at info level (FLASHLINGO_LOG takes precedence)
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

impl Cli {
    /// Applies flags on top of the loaded config.
    pub fn apply(&self, mut config: AppConfig) -> AppConfig {
        if let Some(store) = self.store {
            config.store = store;
        }
        if let Some(user) = &self.user {
            config.user = user.clone();
        }
        if let Some(dir) = &self.data_dir {
            config.data_dir = Some(dir.clone());
        }
        if let Some(p) = &self.db_path {
            config.db_path = Some(p.clone());
        }
        if let Some(url) = &self.database_url {
            config.database_url = Some(url.clone());
        }
        if let Command::Api(ApiCmd { addr: Some(addr) }) = &self.cmd {
            config.api_addr = addr.clone();
        }
        config
    }
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Vocabulary entry operations
    #[command(subcommand)]
    Entry(EntryCmd),
    /// List topics with entry counts
    Topics,
    /// Flip-card review loop
    Learn(LearnCmd),
    /// Typed-answer quiz
    Quiz(QuizCmd),
    /// Collection totals
    Stats,
    /// Export data
    #[command(subcommand)]
    Export(ExportCmd),
    /// Import data
    #[command(subcommand)]
    Import(ImportCmd),
    /// Launch Terminal UI
    Tui,
    /// Launch Axum HTTP API
    Api(ApiCmd),
}

#[derive(Debug, Subcommand, Clone)]
pub enum EntryCmd {
    Add(EntryAdd),
    List {
        #[arg(long)]
        topic: Option<String>,
        #[arg(long)]
        search: Option<String>,
    },
    Edit(EntryEdit),
    Rm {
        id: String,
    },
}

#[derive(Debug, Args, Clone)]
pub struct EntryAdd {
    #[arg(long)]
    pub source: String,
    #[arg(long)]
    pub target: String,
    /// Left empty, the entry is filed under "Unclassified"
    #[arg(long)]
    pub topic: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct EntryEdit {
    pub id: String,
    #[arg(long)]
    pub source: Option<String>,
    #[arg(long)]
    pub target: Option<String>,
    #[arg(long)]
    pub topic: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct LearnCmd {
    /// Topic name, or "all"
    #[arg(long, default_value = "all")]
    pub topic: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DirectionArg {
    SourceToTarget,
    TargetToSource,
}

impl From<DirectionArg> for Direction {
    fn from(d: DirectionArg) -> Self {
        match d {
            DirectionArg::SourceToTarget => Direction::SourceToTarget,
            DirectionArg::TargetToSource => Direction::TargetToSource,
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct QuizCmd {
    /// Topic name, or "all"
    #[arg(long, default_value = "all")]
    pub topic: String,
    #[arg(long, value_enum, default_value_t = DirectionArg::SourceToTarget)]
    pub direction: DirectionArg,
}

#[derive(Debug, Subcommand, Clone)]
pub enum ExportCmd {
    Json { path: PathBuf },
    Csv {
        path: PathBuf,
        #[arg(long)]
        topic: Option<String>,
    },
}

#[derive(Debug, Subcommand, Clone)]
pub enum ImportCmd {
    Json { path: PathBuf },
    Csv {
        path: PathBuf,
        /// File every row under this topic instead of the topic column
        #[arg(long)]
        topic: Option<String>,
    },
}

#[derive(Debug, Args, Clone)]
pub struct ApiCmd {
    /// Bind address (host:port), overrides config
    #[arg(long)]
    pub addr: Option<String>,
}

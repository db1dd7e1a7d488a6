use crate::history::*;
use crate::reduction::*;
use crate::session::*;
use crate::store::*;
use crate::util::*;
use crate::visualize::*;
use clap::builder::{StringValueParser, TypedValueParser, ValueParser};
use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::{Parser, Subcommand};
use rand::{thread_rng, Rng, SeedableRng};
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use thiserror::Error;

#[derive(Parser, Clone)]
#[clap(author = clap::crate_authors!(", "))]
#[clap(version = env!("CARGO_PKG_VERSION"))]
#[clap(about = "Gaussian row reduction with a recorded ledger of every row operation")]
#[clap(color = clap::ColorChoice::Auto)]
#[clap(propagate_version = true)]
#[clap(subcommand_required = true)]
#[clap(arg_required_else_help = true)]
pub struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Clone)]
enum Commands {
    /// reduce a matrix to row echelon form and record it in the history
    Apply(ApplyParameters),
    /// inspect or clear the recorded history
    History {
        #[clap(subcommand)]
        command: HistoryCommands,
        /// directory of the history file, defaults to the user config directory
        #[clap(long, global = true)]
        store_dir: Option<PathBuf>,
    },
    /// print an empty grid of the given size
    Grid {
        /// grid size, e.g. 3x4
        #[clap(value_parser)]
        size: GridSize,
        /// print plain space separated text instead of a table
        #[clap(long, action)]
        plain: bool,
    },
}

#[derive(Parser, Clone)]
pub struct ApplyParameters {
    /// matrix as text: one row per line, cells separated by whitespace
    #[clap(short = 't', long, conflicts_with_all = ["input", "random"])]
    text: Option<String>,
    /// read the matrix text from a file; stdin is read when no input is given
    #[clap(short = 'i', long, conflicts_with = "random")]
    input: Option<PathBuf>,
    /// fill a random matrix of the given size, e.g. 3x4
    #[clap(short = 'r', long)]
    random: Option<GridSize>,
    /// smallest random value
    #[clap(long, default_value_t = 0, allow_negative_numbers = true)]
    min: i64,
    /// largest random value
    #[clap(long, default_value_t = 9, allow_negative_numbers = true)]
    max: i64,
    /// seed of the random fill, for reproducible matrices
    #[clap(long)]
    seed: Option<u64>,
    /// numeric strategy of the reduction
    #[clap(short = 's', long, value_enum)]
    strategy: Option<Strategy>,
    /// shorthand for `--strategy integer-exact`
    #[clap(long, action, conflicts_with = "strategy")]
    integer_exact: bool,
    /// magnitudes below this are zero for the floating point strategy
    #[clap(short = 'e', long)]
    epsilon: Option<Cell>,
    /// the reduction configuration, e.g. {"strategy":"integer-exact"}; flags override it
    #[clap(long, default_value_t = json!({}), value_parser = ValueParser::new(SerdeJsonParser))]
    config: serde_json::Value,
    /// print every recorded step
    #[clap(long, action)]
    steps: bool,
    /// print the result as JSON instead of a table
    #[clap(long, action)]
    json: bool,
    /// directory of the history file, defaults to the user config directory
    #[clap(long)]
    store_dir: Option<PathBuf>,
}

#[derive(Subcommand, Clone, Debug)]
pub enum HistoryCommands {
    /// print the recorded reductions, newest first
    Show {
        /// print the raw entries as JSON
        #[clap(long, action)]
        json: bool,
    },
    /// forget every recorded reduction
    Clear,
}

/// `ROWSxCOLS`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSize {
    pub rows: usize,
    pub columns: usize,
}

impl FromStr for GridSize {
    type Err = String;
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (rows, columns) = value
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected ROWSxCOLS, got {value:?}"))?;
        let parse = |text: &str| {
            text.trim()
                .parse::<usize>()
                .map_err(|error| format!("invalid size {text:?}: {error}"))
        };
        Ok(Self {
            rows: parse(rows)?,
            columns: parse(columns)?,
        })
    }
}

#[derive(Clone)]
struct SerdeJsonParser;
impl TypedValueParser for SerdeJsonParser {
    type Value = serde_json::Value;
    fn parse_ref(
        &self,
        cmd: &clap::Command,
        arg: Option<&clap::Arg>,
        value: &std::ffi::OsStr,
    ) -> Result<Self::Value, clap::Error> {
        let inner = StringValueParser::new();
        let val = inner.parse_ref(cmd, arg, value)?;
        match serde_json::from_str::<serde_json::Value>(&val) {
            Ok(vector) => Ok(vector),
            Err(error) => {
                let mut err = clap::Error::new(ErrorKind::ValueValidation).with_cmd(cmd);
                if let Some(arg) = arg {
                    err.insert(ContextKind::InvalidArg, ContextValue::String(arg.to_string()));
                }
                err.insert(
                    ContextKind::InvalidValue,
                    ContextValue::String(format!("should be like {{\"a\":1}}, parse error: {error}")),
                );
                Err(err)
            }
        }
    }
}

/// failures before a reduction even starts
#[derive(Debug, Error)]
pub enum CliError {
    #[error("cannot read the matrix: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("invalid reduction config: {0}")]
    Config(#[from] serde_json::Error),
    #[error(transparent)]
    Reduction(#[from] ReductionError),
}

impl ApplyParameters {
    /// `--config` first, then the individual flags on top
    pub fn reduction_config(&self) -> Result<ReductionConfig, CliError> {
        let mut config: ReductionConfig = serde_json::from_value(self.config.clone())?;
        if self.integer_exact {
            config.strategy = Strategy::IntegerExact;
        } else if let Some(strategy) = self.strategy {
            config.strategy = strategy;
        }
        if let Some(epsilon) = self.epsilon {
            config.epsilon = epsilon;
        }
        Ok(config)
    }

    pub fn read_matrix(&self) -> Result<Matrix, CliError> {
        if let Some(GridSize { rows, columns }) = self.random {
            let seed = self.seed.unwrap_or_else(|| thread_rng().gen());
            tracing::debug!(seed, rows, columns, "random matrix");
            let mut rng = DeterministicRng::seed_from_u64(seed);
            return Ok(random_matrix(rows, columns, self.min, self.max, &mut rng));
        }
        let text = match (&self.text, &self.input) {
            (Some(text), _) => text.clone(),
            (None, Some(path)) => std::fs::read_to_string(path)?,
            (None, None) => std::io::read_to_string(std::io::stdin())?,
        };
        Ok(parse_matrix_text(&text)?)
    }

    fn apply(&self) -> Result<ApplyOutcome, CliError> {
        let config = self.reduction_config()?;
        let input = self.read_matrix()?;
        let store = open_store(self.store_dir.as_ref());
        let mut history = HistoryStore::load(store.as_ref());
        Ok(ReductionSession::new(config).apply(&input, &mut history)?)
    }

    fn print(&self, outcome: &ApplyOutcome) {
        if self.json {
            let value = json!({
                "input": outcome.input,
                "output": outcome.output,
                "changed": outcome.changed_cells(),
                "entry": outcome.entry,
            });
            println!("{value}");
            return;
        }
        if self.steps {
            for (index, step) in outcome.entry.steps.iter().enumerate() {
                println!("Step {}: {}", index + 1, step.description);
                step.after.printstd();
            }
        }
        outcome.printstd();
        println!("changed cells: {}", outcome.changed_cells().len());
    }
}

/// the file store, or an in-memory one when the config directory is unusable
pub fn open_store(store_dir: Option<&PathBuf>) -> Box<dyn BlobStore> {
    let store = match store_dir {
        Some(dir) => DirStore::open(dir),
        None => DirStore::in_config_dir(),
    };
    match store {
        Ok(store) => {
            tracing::debug!(dir = %store.dir().display(), "history store");
            Box::new(store)
        }
        Err(error) => {
            tracing::warn!(%error, "history will not be persisted");
            Box::new(MemoryStore::new())
        }
    }
}

impl Cli {
    pub fn run(self) -> ExitCode {
        match self.command {
            Commands::Apply(parameters) => {
                let result = parameters.apply();
                if let Ok(outcome) = &result {
                    parameters.print(outcome);
                }
                let status = StatusLine::from(&result);
                if status.is_error() {
                    eprintln!("{status}");
                    return ExitCode::FAILURE;
                }
                if !parameters.json {
                    println!("{status}");
                }
                ExitCode::SUCCESS
            }
            Commands::History { command, store_dir } => {
                let store = open_store(store_dir.as_ref());
                let mut history = HistoryStore::load(store.as_ref());
                match command {
                    HistoryCommands::Show { json } => {
                        if json {
                            println!("{}", json!(history.items()));
                        } else {
                            print!("{}", render_history(history.items()));
                        }
                    }
                    HistoryCommands::Clear => {
                        history.clear();
                        println!("{}", StatusLine::Done);
                    }
                }
                ExitCode::SUCCESS
            }
            Commands::Grid { size, plain } => {
                let grid = zero_matrix(size.rows, size.columns);
                if plain {
                    println!("{}", matrix_to_string(&grid));
                } else {
                    grid.printstd();
                }
                ExitCode::SUCCESS
            }
        }
    }
}

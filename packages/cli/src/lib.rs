//! The `storeview` command: project a storage snapshot file through a
//! selector file and print the result as JSON.

use std::path::{Path, PathBuf};
use std::time::Duration;

use storeview_core::{selector, BigIntPolicy, NormalizeOptions, Selector, StorageValue};
use storeview_engine::{Projector, ProjectorOptions};
use storeview_http::{IndexerConfig, IndexerResolver};

#[derive(thiserror::Error, Debug)]
pub enum CliError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{} is not valid JSON: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid selectors in {}: {source}", path.display())]
    Selectors {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("indexer: {0}")]
    Indexer(#[from] storeview_http::Error),

    #[error(transparent)]
    Storage(#[from] storeview_core::Error),

    #[error("cannot write output: {0}")]
    Output(serde_json::Error),
}

/// Everything one invocation needs.
#[derive(Clone, Debug)]
pub struct RunOptions {
    pub storage: PathBuf,
    /// Without selectors the whole storage is rendered.
    pub selectors: Option<PathBuf>,
    pub indexer: IndexerConfig,
    pub big_int: BigIntPolicy,
    pub pretty: bool,
}

impl RunOptions {
    pub fn new(storage: impl Into<PathBuf>) -> Self {
        Self {
            storage: storage.into(),
            selectors: None,
            indexer: IndexerConfig::default(),
            big_int: BigIntPolicy::default(),
            pretty: false,
        }
    }
}

/// Indexer settings given on the command line. Each one that is set wins
/// over the environment and the defaults.
#[derive(Clone, Debug, Default)]
pub struct IndexerOverrides {
    pub base_url: Option<String>,
    pub timeout_ms: Option<u64>,
    pub retry_attempts: Option<u32>,
}

impl IndexerOverrides {
    pub fn apply(self, mut config: IndexerConfig) -> IndexerConfig {
        if let Some(base_url) = self.base_url {
            config.base_url = base_url;
        }
        if let Some(ms) = self.timeout_ms {
            config.timeout = Duration::from_millis(ms);
        }
        if let Some(retry_attempts) = self.retry_attempts {
            config.retry_attempts = retry_attempts;
        }
        config
    }
}

fn read_json(path: &Path) -> Result<serde_json::Value, CliError> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CliError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn read_selectors(path: &Path) -> Result<Vec<Selector>, CliError> {
    let json = read_json(path)?;
    selector::from_value(json).map_err(|source| CliError::Selectors {
        path: path.to_path_buf(),
        source,
    })
}

/// Run one projection and return the JSON text to print.
pub async fn run(options: &RunOptions) -> Result<String, CliError> {
    let span = tracing::info_span!("storeview", storage = %options.storage.display());

    let resolver = IndexerResolver::new(&options.indexer)?;
    let document = read_json(&options.storage)?;
    let storage = StorageValue::from_json(document, Some(&resolver))?;

    let projector = Projector::new(ProjectorOptions {
        normalize: NormalizeOptions::default().with_big_int(options.big_int),
    })
    .with_span(span);

    let output = match &options.selectors {
        Some(path) => {
            let selectors = read_selectors(path)?;
            tracing::info!(count = selectors.len(), "projecting storage");
            let projection = projector.project(&selectors, &storage).await?;
            to_text(&projection, options.pretty)?
        }
        None => {
            tracing::info!("no selectors given, rendering the whole storage");
            to_text(&projector.render(&storage)?, options.pretty)?
        }
    };
    Ok(output)
}

fn to_text<T: serde::Serialize>(value: &T, pretty: bool) -> Result<String, CliError> {
    let text = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    text.map_err(CliError::Output)
}

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use subtagger_core::backend::{ClassifierBackend, ModelMeta, META_FILE};
use subtagger_core::{DocumentFile, SubjectCorpus, SubjectIndex, TrainParams};
use tracing_subscriber::{fmt, EnvFilter};

/// Subject index file kept alongside the model inside the data directory.
const SUBJECTS_FILE: &str = "subjects.tsv";

const BACKEND_ID: &str = "centroid";

#[derive(Parser)]
#[command(name = "subtagger")]
#[command(about = "Train and query a subject classification backend", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the subject index and train the classifier
    Train {
        /// Subject vocabulary: a TSV file or a directory of subject files
        #[arg(long)]
        subjects: PathBuf,
        /// Training documents, JSONL with {"text": ..., "subjects": [...]}
        #[arg(long)]
        docs: PathBuf,
        /// Data directory for the index, training file and model
        #[arg(long)]
        datadir: PathBuf,
        /// Hyperparameter overrides as key=value, may repeat
        #[arg(long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,
    },
    /// Suggest subjects for a document
    Suggest {
        /// Data directory of a trained model
        #[arg(long)]
        datadir: PathBuf,
        /// Maximum number of suggestions
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Document text file; stdin when omitted
        input: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Train { subjects, docs, datadir, params } => train(&subjects, &docs, &datadir, &params),
        Commands::Suggest { datadir, limit, input } => suggest(&datadir, limit, input.as_deref()),
    }
}

fn train(subjects: &Path, docs: &Path, datadir: &Path, raw_params: &[String]) -> Result<()> {
    let corpus = if subjects.is_dir() {
        SubjectCorpus::Directory(subjects.to_path_buf())
    } else {
        SubjectCorpus::TsvFile(subjects.to_path_buf())
    };
    let index = SubjectIndex::from_corpus(&corpus)
        .with_context(|| format!("reading subject corpus {}", subjects.display()))?;
    tracing::info!(subjects = index.len(), "built subject index");

    std::fs::create_dir_all(datadir)?;
    index.save(&datadir.join(SUBJECTS_FILE))?;

    let params = TrainParams::from_config(&parse_params(raw_params)?)?;
    let mut backend: ClassifierBackend = ClassifierBackend::new(BACKEND_ID, datadir, index, params);
    let documents = DocumentFile::new(docs).documents()
        .with_context(|| format!("reading document corpus {}", docs.display()))?;
    backend.train(documents)?;
    tracing::info!(datadir = %datadir.display(), "training complete");
    Ok(())
}

fn suggest(datadir: &Path, limit: usize, input: Option<&Path>) -> Result<()> {
    let index = SubjectIndex::load(&datadir.join(SUBJECTS_FILE))
        .with_context(|| format!("no subject index in {}", datadir.display()))?;
    let params = stored_params(datadir).unwrap_or_default();
    let mut backend: ClassifierBackend = ClassifierBackend::new(BACKEND_ID, datadir, index, params);
    backend.initialize()?;

    let text = match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    for suggestion in backend.suggest(&text, limit)? {
        println!("{}\t{}\t{:.4}", suggestion.uri, suggestion.label, suggestion.score);
    }
    Ok(())
}

/// Re-use the parameters the model was trained with, chunksize included,
/// so suggestion-time chunking matches training.
fn stored_params(datadir: &Path) -> Option<TrainParams> {
    let raw = std::fs::read_to_string(datadir.join(META_FILE)).ok()?;
    let meta: ModelMeta = serde_json::from_str(&raw).ok()?;
    Some(meta.params)
}

fn parse_params(raw: &[String]) -> Result<HashMap<String, String>> {
    let mut config = HashMap::new();
    for pair in raw {
        match pair.split_once('=') {
            Some((key, value)) => {
                config.insert(key.to_string(), value.to_string());
            }
            None => bail!("invalid --param {pair:?}, expected KEY=VALUE"),
        }
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_parse_as_pairs() {
        let config = parse_params(&["lr=0.5".into(), "loss=ns".into()]).unwrap();
        assert_eq!(config["lr"], "0.5");
        assert_eq!(config["loss"], "ns");
    }

    #[test]
    fn malformed_param_is_rejected() {
        assert!(parse_params(&["nonsense".into()]).is_err());
    }
}

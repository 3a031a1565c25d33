use crate::chunk::chunk_text;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::model::{CentroidModel, SupervisedModel};
use crate::params::TrainParams;
use crate::subject::SubjectIndex;
use crate::tokenizer::normalize;
use crate::train::{label_to_id, TrainingCorpusBuilder};
use crate::util::atomic_write;
use crate::SubjectId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const MODEL_FILE: &str = "model.bin";
pub const TRAIN_FILE: &str = "train.txt";
pub const META_FILE: &str = "meta.json";

/// One ranked classification result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub uri: String,
    pub label: String,
    pub score: f32,
}

/// Sidecar written next to the model file.
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelMeta {
    pub version: u32,
    pub trained_at: String,
    pub num_subjects: usize,
    pub params: TrainParams,
}

/// Owns the lifecycle of one classifier model and its label space.
///
/// The subject index is owned, not shared: a backend instance maps its
/// model's labels through exactly one index. Training replaces the live
/// model reference once; callers must not interleave `train` with
/// in-flight `suggest` calls on the same instance.
pub struct ClassifierBackend<M: SupervisedModel = CentroidModel> {
    backend_id: String,
    datadir: PathBuf,
    subjects: SubjectIndex,
    params: TrainParams,
    model: Option<M>,
}

impl<M: SupervisedModel> ClassifierBackend<M> {
    pub fn new(
        backend_id: impl Into<String>,
        datadir: impl Into<PathBuf>,
        subjects: SubjectIndex,
        params: TrainParams,
    ) -> Self {
        Self {
            backend_id: backend_id.into(),
            datadir: datadir.into(),
            subjects,
            params,
            model: None,
        }
    }

    pub fn subjects(&self) -> &SubjectIndex {
        &self.subjects
    }

    pub fn params(&self) -> &TrainParams {
        &self.params
    }

    pub fn model_path(&self) -> PathBuf {
        self.datadir.join(MODEL_FILE)
    }

    fn meta_path(&self) -> PathBuf {
        self.datadir.join(META_FILE)
    }

    /// Load the persisted model. Fails with [`Error::NotInitialized`] when
    /// no model file exists yet, the standard signal that training has to
    /// run first.
    pub fn initialize(&mut self) -> Result<()> {
        if self.model.is_some() {
            return Ok(());
        }
        let path = self.model_path();
        if !path.exists() {
            return Err(Error::NotInitialized {
                backend_id: self.backend_id.clone(),
                path,
            });
        }
        tracing::debug!(backend_id = %self.backend_id, path = %path.display(), "loading model");
        self.model = Some(M::load(&path)?);
        self.check_meta();
        Ok(())
    }

    fn check_meta(&self) {
        let Ok(raw) = std::fs::read_to_string(self.meta_path()) else {
            return;
        };
        match serde_json::from_str::<ModelMeta>(&raw) {
            Ok(meta) if meta.num_subjects != self.subjects.len() => {
                tracing::warn!(
                    backend_id = %self.backend_id,
                    model_subjects = meta.num_subjects,
                    index_subjects = self.subjects.len(),
                    "model was trained against a different subject index"
                );
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(backend_id = %self.backend_id, error = %e, "unreadable model metadata"),
        }
    }

    /// Build the training file from `docs` and train a fresh model,
    /// persisting it at the canonical path. The previous in-memory model,
    /// if any, is replaced only after training succeeds.
    pub fn train<I>(&mut self, docs: I) -> Result<()>
    where
        I: IntoIterator<Item = Result<Document>>,
    {
        tracing::info!(backend_id = %self.backend_id, "creating training file");
        let builder = TrainingCorpusBuilder::new(&self.backend_id, &self.subjects);
        let train_path = builder.build(docs, &self.datadir, TRAIN_FILE)?;

        tracing::info!(backend_id = %self.backend_id, "training model");
        let model = M::train(&train_path, &self.params)?;
        model.save(&self.model_path())?;
        self.write_meta()?;
        self.model = Some(model);
        Ok(())
    }

    fn write_meta(&self) -> Result<()> {
        let meta = ModelMeta {
            version: 1,
            trained_at: time::OffsetDateTime::now_utc()
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_default(),
            num_subjects: self.subjects.len(),
            params: self.params.clone(),
        };
        atomic_write(&self.datadir, META_FILE, |writer| {
            let json = serde_json::to_string_pretty(&meta)?;
            writer.write_all(json.as_bytes())?;
            Ok(())
        })?;
        Ok(())
    }

    /// Suggest up to `limit` subjects for a document of any length.
    ///
    /// The document is split into bounded chunks, each non-empty chunk is
    /// classified separately, and per-label scores are summed and divided
    /// by the number of chunks actually classified. A label seen in only
    /// one of many chunks is diluted by the full denominator; truncation
    /// to `limit` happens once, after aggregation. Ties rank by ascending
    /// subject id.
    pub fn suggest(&self, text: &str, limit: usize) -> Result<Vec<Suggestion>> {
        let model = self.model.as_ref().ok_or_else(|| Error::NotInitialized {
            backend_id: self.backend_id.clone(),
            path: self.model_path(),
        })?;

        let chunktexts: Vec<String> = chunk_text(text, self.params.chunksize)
            .iter()
            .map(|chunk| normalize(chunk))
            .filter(|chunk| !chunk.is_empty())
            .collect();
        if chunktexts.is_empty() {
            tracing::warn!(backend_id = %self.backend_id, "no usable text in document");
            return Ok(Vec::new());
        }

        let mut label_scores: HashMap<SubjectId, f32> = HashMap::new();
        for chunktext in &chunktexts {
            for (label, score) in model.predict(chunktext, limit) {
                match label_to_id(&label) {
                    Some(id) if (id as usize) < self.subjects.len() => {
                        *label_scores.entry(id).or_insert(0.0) += score;
                    }
                    _ => tracing::warn!(label = %label, "prediction outside the subject index"),
                }
            }
        }

        let denom = chunktexts.len() as f32;
        let mut ranked: Vec<(SubjectId, f32)> = label_scores
            .into_iter()
            .map(|(id, sum)| (id, sum / denom))
            .collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        ranked.truncate(limit);

        Ok(ranked
            .into_iter()
            .map(|(id, score)| {
                let (uri, label) = self.subjects.get(id);
                Suggestion {
                    uri: uri.to_string(),
                    label: label.to_string(),
                    score,
                }
            })
            .collect())
    }
}

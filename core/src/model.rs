use crate::error::Result;
use crate::params::TrainParams;
use crate::train::label_to_id;
use crate::util::atomic_write;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Contract the chunk aggregator and backend rely on: a supervised
/// multi-label text classifier with a persistent model.
///
/// `predict` takes one normalized text and returns at most `limit`
/// `(label, score)` pairs ranked by the model's own confidence, highest
/// first. Labels are the `__label__<id>` tokens of the training file.
pub trait SupervisedModel: Sized {
    fn train(train_path: &Path, params: &TrainParams) -> Result<Self>;
    fn load(path: &Path) -> Result<Self>;
    fn save(&self, path: &Path) -> Result<()>;
    fn predict(&self, text: &str, limit: usize) -> Vec<(String, f32)>;
}

type TermId = u32;
type LabelId = u32;

/// Bag-of-words classifier scoring texts by cosine similarity against one
/// tf-idf centroid vector per label.
///
/// Training is closed-form, so the optimizer knobs in [`TrainParams`]
/// (`lr`, `epoch`, `dim`, `loss`, `thread`) are accepted and unused;
/// `minCount` prunes the vocabulary and `wordNgrams` controls n-gram
/// features.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CentroidModel {
    dictionary: HashMap<String, TermId>,
    idf: Vec<f32>,
    centroids: HashMap<LabelId, HashMap<TermId, f32>>,
    word_ngrams: usize,
}

impl CentroidModel {
    fn features(&self, text: &str) -> Vec<String> {
        ngram_features(text, self.word_ngrams)
    }

    /// Sparse normalized tf-idf vector for one text, restricted to known
    /// vocabulary.
    fn vectorize(&self, text: &str) -> HashMap<TermId, f32> {
        let mut tf_raw: HashMap<TermId, u32> = HashMap::new();
        for feature in self.features(text) {
            if let Some(&tid) = self.dictionary.get(&feature) {
                *tf_raw.entry(tid).or_insert(0) += 1;
            }
        }
        let mut vec: HashMap<TermId, f32> = HashMap::new();
        for (tid, tf_raw) in tf_raw {
            let tf = 1.0 + (tf_raw as f32).ln();
            vec.insert(tid, tf * self.idf[tid as usize]);
        }
        normalize_vector(&mut vec);
        vec
    }
}

fn ngram_features(text: &str, word_ngrams: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut features: Vec<String> = words.iter().map(|w| w.to_string()).collect();
    for n in 2..=word_ngrams.max(1) {
        for window in words.windows(n) {
            features.push(window.join("_"));
        }
    }
    features
}

fn normalize_vector(vec: &mut HashMap<TermId, f32>) {
    let mut norm = 0.0f32;
    for w in vec.values() {
        norm += w * w;
    }
    norm = norm.sqrt();
    if norm == 0.0 {
        norm = 1.0;
    }
    for w in vec.values_mut() {
        *w /= norm;
    }
}

/// One parsed training example: leading `__label__<id>` tokens, then text.
fn parse_example(line: &str) -> (Vec<LabelId>, &str) {
    let mut labels = Vec::new();
    let mut rest = line;
    while let Some(token_end) = rest.find(' ') {
        let (token, tail) = rest.split_at(token_end);
        match label_to_id(token) {
            Some(id) => {
                labels.push(id);
                rest = tail.trim_start();
            }
            None => break,
        }
    }
    // a line may also be a single bare label or bare text
    if let Some(id) = label_to_id(rest) {
        labels.push(id);
        rest = "";
    }
    (labels, rest)
}

impl SupervisedModel for CentroidModel {
    fn train(train_path: &Path, params: &TrainParams) -> Result<Self> {
        let word_ngrams = params.word_ngrams.max(1);

        // Pass 1: vocabulary with document frequencies and term counts.
        let mut examples: Vec<(Vec<LabelId>, String)> = Vec::new();
        let reader = BufReader::new(File::open(train_path)?);
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let (labels, text) = parse_example(&line);
            examples.push((labels, text.to_string()));
        }

        let mut term_count: HashMap<String, u32> = HashMap::new();
        let mut df_raw: HashMap<String, u32> = HashMap::new();
        for (_, text) in &examples {
            let features = ngram_features(text, word_ngrams);
            for feature in &features {
                *term_count.entry(feature.clone()).or_insert(0) += 1;
            }
            let mut distinct = features;
            distinct.sort();
            distinct.dedup();
            for feature in distinct {
                *df_raw.entry(feature).or_insert(0) += 1;
            }
        }

        let mut dictionary: HashMap<String, TermId> = HashMap::new();
        let mut df: Vec<u32> = Vec::new();
        let mut terms: Vec<&String> = df_raw.keys().collect();
        terms.sort();
        for term in terms {
            if term_count.get(term).copied().unwrap_or(0) < params.min_count as u32 {
                continue;
            }
            let tid = dictionary.len() as TermId;
            dictionary.insert(term.clone(), tid);
            df.push(df_raw[term]);
        }

        let n = examples.len().max(1) as f32;
        // Smoothed idf keeps terms present in every example from vanishing.
        let idf: Vec<f32> = df.iter().map(|&df_t| (1.0 + n / df_t.max(1) as f32).ln()).collect();

        let mut model = CentroidModel {
            dictionary,
            idf,
            centroids: HashMap::new(),
            word_ngrams,
        };

        // Pass 2: accumulate normalized example vectors into label centroids.
        for (labels, text) in &examples {
            if labels.is_empty() {
                continue;
            }
            let vec = model.vectorize(text);
            if vec.is_empty() {
                continue;
            }
            for label in labels {
                let centroid = model.centroids.entry(*label).or_default();
                for (tid, w) in &vec {
                    *centroid.entry(*tid).or_insert(0.0) += w;
                }
            }
        }
        for centroid in model.centroids.values_mut() {
            normalize_vector(centroid);
        }

        tracing::debug!(
            examples = examples.len(),
            terms = model.dictionary.len(),
            labels = model.centroids.len(),
            "trained centroid model"
        );
        Ok(model)
    }

    fn load(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(bincode::deserialize_from(reader)?)
    }

    fn save(&self, path: &Path) -> Result<()> {
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("model.bin");
        atomic_write(dir, filename, |writer| {
            bincode::serialize_into(writer, self)?;
            Ok(())
        })?;
        Ok(())
    }

    fn predict(&self, text: &str, limit: usize) -> Vec<(String, f32)> {
        let query = self.vectorize(text);
        if query.is_empty() {
            return Vec::new();
        }
        let mut scored: Vec<(LabelId, f32)> = self
            .centroids
            .iter()
            .map(|(label, centroid)| {
                let mut score = 0.0f32;
                for (tid, qw) in &query {
                    if let Some(cw) = centroid.get(tid) {
                        score += qw * cw;
                    }
                }
                (*label, score)
            })
            .filter(|(_, score)| *score > 0.0)
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored
            .into_iter()
            .take(limit)
            .map(|(label, score)| (crate::train::id_to_label(label), score))
            .collect()
    }
}

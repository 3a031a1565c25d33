use crate::document::Document;
use crate::error::{Error, Result};
use crate::subject::SubjectIndex;
use crate::tokenizer::normalize;
use crate::util::atomic_write;
use crate::SubjectId;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Encode a subject id as a classifier label token.
pub fn id_to_label(subject_id: SubjectId) -> String {
    format!("__label__{}", subject_id)
}

/// Decode a classifier label token back to a subject id.
pub fn label_to_id(label: &str) -> Option<SubjectId> {
    label.strip_prefix("__label__")?.parse().ok()
}

/// Builds the label-encoded training file consumed by the classifier.
///
/// Documents with identical normalized text are collapsed into a single
/// training example whose label set is the union of the duplicates'
/// subject ids. Output is deterministic: examples are ordered by
/// normalized text, labels by ascending id.
pub struct TrainingCorpusBuilder<'a> {
    backend_id: &'a str,
    subjects: &'a SubjectIndex,
}

impl<'a> TrainingCorpusBuilder<'a> {
    pub fn new(backend_id: &'a str, subjects: &'a SubjectIndex) -> Self {
        Self { backend_id, subjects }
    }

    /// Aggregate `docs` and atomically write the training file `filename`
    /// under `datadir`. Fails with [`Error::EmptyCorpus`] when the corpus
    /// holds zero documents; in that case nothing is written.
    pub fn build<I>(&self, docs: I, datadir: &Path, filename: &str) -> Result<PathBuf>
    where
        I: IntoIterator<Item = Result<Document>>,
    {
        let mut seen_docs = 0usize;
        let mut doc_subjects: BTreeMap<String, BTreeSet<SubjectId>> = BTreeMap::new();

        for doc in docs {
            let doc = doc?;
            seen_docs += 1;
            let text = normalize(&doc.text);
            if text.is_empty() {
                continue;
            }
            let ids = doc_subjects.entry(text).or_default();
            for uri in &doc.subject_uris {
                // unresolved URIs are warned about by the index and dropped
                if let Some(subject_id) = self.subjects.by_uri(uri) {
                    ids.insert(subject_id);
                }
            }
        }

        if seen_docs == 0 {
            return Err(Error::EmptyCorpus {
                backend_id: self.backend_id.to_string(),
            });
        }
        tracing::info!(
            backend_id = %self.backend_id,
            documents = seen_docs,
            examples = doc_subjects.len(),
            "writing training file"
        );

        atomic_write(datadir, filename, |writer| {
            for (text, subject_ids) in &doc_subjects {
                if subject_ids.is_empty() {
                    tracing::warn!(text = %text, "no resolvable subjects for document");
                    writeln!(writer, "{}", text)?;
                    continue;
                }
                let labels: Vec<String> =
                    subject_ids.iter().map(|id| id_to_label(*id)).collect();
                writeln!(writer, "{} {}", labels.join(" "), text)?;
            }
            Ok(())
        })
    }
}

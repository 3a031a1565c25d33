use crate::document::Document;
use crate::error::{Error, Result};
use crate::util::{cleanup_uri, localname};
use crate::SubjectId;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A controlled-vocabulary concept. `text` carries the concatenated
/// descriptive text when the corpus is directory-backed; TSV corpora leave
/// it empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub uri: String,
    pub label: String,
    pub text: Option<String>,
}

/// A source of subjects. Closed variant set: new sources become new
/// variants, never runtime type inspection.
#[derive(Debug, Clone)]
pub enum SubjectCorpus {
    /// Directory of `.txt` files, one per subject: first line `<uri> <label>`,
    /// remaining lines are descriptive text.
    Directory(PathBuf),
    /// TSV file, one subject per line: `<uri><whitespace><label>`.
    TsvFile(PathBuf),
}

impl SubjectCorpus {
    /// Lazily enumerate the corpus. Each call starts a fresh pass; no
    /// cursor state is carried between calls.
    pub fn subjects(&self) -> Result<SubjectIter> {
        match self {
            SubjectCorpus::Directory(path) => {
                let mut filenames: Vec<PathBuf> = WalkDir::new(path)
                    .min_depth(1)
                    .max_depth(1)
                    .into_iter()
                    .filter_map(|e| e.ok())
                    .map(|e| e.into_path())
                    .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("txt"))
                    .collect();
                // Lexicographic order makes id assignment deterministic.
                filenames.sort();
                Ok(SubjectIter::Directory(filenames.into_iter()))
            }
            SubjectCorpus::TsvFile(path) => {
                let reader = BufReader::new(File::open(path)?);
                Ok(SubjectIter::Tsv {
                    lines: reader.lines(),
                    path: path.clone(),
                })
            }
        }
    }

    /// Regenerate a directory corpus from annotated documents: the target
    /// directory is cleared and one file per subject is written, containing
    /// the texts of every document annotated with that subject's URI.
    /// URIs missing from `index` are skipped (warned, not fatal).
    pub fn from_documents<I>(subjectdir: &Path, docs: I, index: &SubjectIndex) -> Result<SubjectCorpus>
    where
        I: IntoIterator<Item = Result<Document>>,
    {
        if subjectdir.exists() {
            std::fs::remove_dir_all(subjectdir)?;
        }
        std::fs::create_dir_all(subjectdir)?;

        for doc in docs {
            let doc = doc?;
            for uri in &doc.subject_uris {
                add_subject_text(subjectdir, uri, &doc.text, index)?;
            }
        }
        Ok(SubjectCorpus::Directory(subjectdir.to_path_buf()))
    }
}

/// Lazy cursor over a [`SubjectCorpus`].
pub enum SubjectIter {
    Directory(std::vec::IntoIter<PathBuf>),
    Tsv {
        lines: Lines<BufReader<File>>,
        path: PathBuf,
    },
}

impl Iterator for SubjectIter {
    type Item = Result<Subject>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            SubjectIter::Directory(filenames) => {
                let filename = filenames.next()?;
                Some(read_subject_file(&filename))
            }
            SubjectIter::Tsv { lines, path } => loop {
                let line = match lines.next()? {
                    Ok(line) => line,
                    Err(e) => return Some(Err(e.into())),
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                return Some(split_entry(line, path).map(|(uri, label)| Subject {
                    uri: cleanup_uri(&uri).to_string(),
                    label,
                    text: None,
                }));
            },
        }
    }
}

fn read_subject_file(filename: &Path) -> Result<Subject> {
    let reader = BufReader::new(File::open(filename)?);
    let mut lines = reader.lines();
    let header = lines.next().transpose()?.unwrap_or_default();
    let (uri, label) = split_entry(header.trim(), filename)?;
    let mut text_lines = Vec::new();
    for line in lines {
        text_lines.push(line?);
    }
    Ok(Subject {
        uri,
        label,
        text: Some(text_lines.join(" ")),
    })
}

fn split_entry(entry: &str, path: &Path) -> Result<(String, String)> {
    match entry.split_once(char::is_whitespace) {
        Some((uri, label)) => Ok((uri.to_string(), label.trim().to_string())),
        None => Err(Error::MalformedSubject {
            entry: entry.to_string(),
            path: path.to_path_buf(),
        }),
    }
}

fn add_subject_text(subjectdir: &Path, uri: &str, text: &str, index: &SubjectIndex) -> Result<()> {
    let path = subjectdir.join(format!("{}.txt", localname(uri)));
    if !path.exists() {
        let Some(subject_id) = index.by_uri(uri) else {
            return Ok(());
        };
        let (_, label) = index.get(subject_id);
        let mut f = BufWriter::new(File::create(&path)?);
        writeln!(f, "{} {}", uri, label)?;
        f.flush()?;
    }
    let mut f = OpenOptions::new().append(true).open(&path)?;
    writeln!(f, "{}", text)?;
    Ok(())
}

/// Bidirectional mapping between dense subject ids and (URI, label) pairs.
/// Ids are assigned in corpus iteration order and stay stable for the life
/// of the index.
#[derive(Debug, Default)]
pub struct SubjectIndex {
    uris: Vec<String>,
    labels: Vec<String>,
    uri_idx: HashMap<String, SubjectId>,
}

impl SubjectIndex {
    /// Build the index by consuming a subject corpus exactly once. I/O
    /// errors from the corpus propagate.
    pub fn from_corpus(corpus: &SubjectCorpus) -> Result<Self> {
        let mut index = SubjectIndex::default();
        for subject in corpus.subjects()? {
            let subject = subject?;
            index.push(subject.uri, subject.label);
        }
        Ok(index)
    }

    fn push(&mut self, uri: String, label: String) {
        let subject_id = self.uris.len() as SubjectId;
        self.uri_idx.insert(uri.clone(), subject_id);
        self.uris.push(uri);
        self.labels.push(label);
    }

    pub fn len(&self) -> usize {
        self.uris.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uris.is_empty()
    }

    /// URI and label for a subject id. An out-of-range id is a caller bug
    /// and panics.
    pub fn get(&self, subject_id: SubjectId) -> (&str, &str) {
        (&self.uris[subject_id as usize], &self.labels[subject_id as usize])
    }

    /// Resolve a URI to its subject id. Unknown URIs yield `None` with a
    /// warning so batch operations can carry on.
    pub fn by_uri(&self, uri: &str) -> Option<SubjectId> {
        match self.uri_idx.get(uri) {
            Some(id) => Some(*id),
            None => {
                tracing::warn!(uri, "unknown subject URI");
                None
            }
        }
    }

    /// Write the index as a TSV file, one `<uri>\tlabel` line per subject in
    /// id order. Line position is the id on reload, so the order written
    /// here is load-bearing.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut f = BufWriter::new(File::create(path)?);
        for subject_id in 0..self.len() {
            writeln!(f, "<{}>\t{}", self.uris[subject_id], self.labels[subject_id])?;
        }
        f.flush()?;
        Ok(())
    }

    /// Rebuild an index from a file written by [`SubjectIndex::save`].
    /// `load(save(index))` reproduces identical id assignments.
    pub fn load(path: &Path) -> Result<Self> {
        Self::from_corpus(&SubjectCorpus::TsvFile(path.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn tiny_index() -> SubjectIndex {
        let mut index = SubjectIndex::default();
        index.push("http://example.org/s1".into(), "Cats".into());
        index.push("http://example.org/s2".into(), "Dogs".into());
        index
    }

    #[test]
    fn ids_follow_insertion_order() {
        let index = tiny_index();
        assert_eq!(index.len(), 2);
        assert_eq!(index.get(0), ("http://example.org/s1", "Cats"));
        assert_eq!(index.get(1), ("http://example.org/s2", "Dogs"));
        assert_eq!(index.by_uri("http://example.org/s2"), Some(1));
    }

    #[test]
    fn unknown_uri_is_none_not_panic() {
        let index = tiny_index();
        assert_eq!(index.by_uri("http://example.org/nope"), None);
    }

    #[test]
    fn save_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("subjects.tsv");
        let index = tiny_index();
        index.save(&path).unwrap();

        let reloaded = SubjectIndex::load(&path).unwrap();
        assert_eq!(reloaded.len(), index.len());
        for id in 0..index.len() as SubjectId {
            assert_eq!(reloaded.get(id), index.get(id));
            let (uri, _) = index.get(id);
            assert_eq!(reloaded.by_uri(uri), Some(id));
        }
    }

    #[test]
    fn tsv_corpus_cleans_bracketed_uris() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("subjects.tsv");
        fs::write(&path, "<http://example.org/s1>\tCats\nhttp://example.org/s2\tDogs\n").unwrap();

        let subjects: Vec<Subject> = SubjectCorpus::TsvFile(path)
            .subjects()
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(subjects[0].uri, "http://example.org/s1");
        assert_eq!(subjects[1].uri, "http://example.org/s2");
        assert_eq!(subjects[0].text, None);
    }

    #[test]
    fn directory_corpus_reads_sorted_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "http://example.org/s2 Dogs\nbark woof\n").unwrap();
        fs::write(dir.path().join("a.txt"), "http://example.org/s1 Cats\nmeow purr\nfelines\n").unwrap();
        fs::write(dir.path().join("ignore.dat"), "not a subject").unwrap();

        let corpus = SubjectCorpus::Directory(dir.path().to_path_buf());
        let subjects: Vec<Subject> = corpus.subjects().unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(subjects.len(), 2);
        assert_eq!(subjects[0].label, "Cats");
        assert_eq!(subjects[0].text.as_deref(), Some("meow purr felines"));
        assert_eq!(subjects[1].label, "Dogs");

        // restartable: a second enumeration sees the same thing
        let again: Vec<Subject> = corpus.subjects().unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(again, subjects);
    }

    #[test]
    fn from_documents_regenerates_directory() {
        let dir = tempdir().unwrap();
        let subjectdir = dir.path().join("subjects");
        let index = tiny_index();
        let docs = vec![
            Ok(Document {
                text: "cats purr".into(),
                subject_uris: vec!["http://example.org/s1".into()],
            }),
            Ok(Document {
                text: "dogs bark".into(),
                subject_uris: vec![
                    "http://example.org/s2".into(),
                    "http://example.org/unknown".into(),
                ],
            }),
            Ok(Document {
                text: "cats nap".into(),
                subject_uris: vec!["http://example.org/s1".into()],
            }),
        ];

        let corpus = SubjectCorpus::from_documents(&subjectdir, docs, &index).unwrap();
        let subjects: Vec<Subject> = corpus.subjects().unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(subjects.len(), 2);
        assert_eq!(subjects[0].uri, "http://example.org/s1");
        assert_eq!(subjects[0].text.as_deref(), Some("cats purr cats nap"));
        assert_eq!(subjects[1].text.as_deref(), Some("dogs bark"));
    }
}

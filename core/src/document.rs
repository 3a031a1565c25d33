use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

/// One training document: free text plus the URIs of the subjects it was
/// annotated with.
#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    pub text: String,
    #[serde(rename = "subjects")]
    pub subject_uris: Vec<String>,
}

/// Document corpus stored as JSONL: one `{"text": ..., "subjects": [...]}`
/// object per line. Blank lines are skipped.
#[derive(Debug, Clone)]
pub struct DocumentFile {
    path: PathBuf,
}

impl DocumentFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    /// Lazily iterate the documents. Each call re-opens the file, so the
    /// corpus can be walked multiple times.
    pub fn documents(&self) -> Result<DocumentIter> {
        let reader = BufReader::new(File::open(&self.path)?);
        Ok(DocumentIter {
            lines: reader.lines(),
            path: self.path.clone(),
            lineno: 0,
        })
    }
}

pub struct DocumentIter {
    lines: Lines<BufReader<File>>,
    path: PathBuf,
    lineno: usize,
}

impl Iterator for DocumentIter {
    type Item = Result<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.lineno += 1;
            if line.trim().is_empty() {
                continue;
            }
            return Some(serde_json::from_str(&line).map_err(|source| {
                Error::MalformedDocument {
                    path: self.path.clone(),
                    line: self.lineno,
                    source,
                }
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn reads_jsonl_documents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("docs.jsonl");
        fs::write(
            &path,
            concat!(
                r#"{"text": "cats purr", "subjects": ["http://x/1"]}"#,
                "\n\n",
                r#"{"text": "dogs bark", "subjects": ["http://x/2", "http://x/3"]}"#,
                "\n",
            ),
        )
        .unwrap();

        let corpus = DocumentFile::new(&path);
        let docs: Vec<Document> = corpus.documents().unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].text, "cats purr");
        assert_eq!(docs[1].subject_uris.len(), 2);

        // restartable
        assert_eq!(corpus.documents().unwrap().count(), 2);
    }

    #[test]
    fn malformed_line_reports_position() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("docs.jsonl");
        fs::write(&path, "{\"text\": \"ok\", \"subjects\": []}\nnot json\n").unwrap();

        let mut iter = DocumentFile::new(&path).documents().unwrap();
        assert!(iter.next().unwrap().is_ok());
        match iter.next().unwrap() {
            Err(Error::MalformedDocument { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected malformed document error, got {other:?}"),
        }
    }
}

use crate::error::Result;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Write `filename` under `dir` atomically: the content is produced into a
/// temp file in the same directory and renamed over the final path only on
/// success, so a crash mid-write never leaves a partial file visible.
pub fn atomic_write<F>(dir: &Path, filename: &str, write_fn: F) -> Result<PathBuf>
where
    F: FnOnce(&mut BufWriter<&mut File>) -> Result<()>,
{
    std::fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        write_fn(&mut writer)?;
        writer.flush()?;
    }
    let target = dir.join(filename);
    tmp.persist(&target).map_err(|e| e.error)?;
    Ok(target)
}

/// Strip the angle brackets RDF-style notation wraps URIs in.
pub fn cleanup_uri(uri: &str) -> &str {
    let uri = uri.trim();
    if uri.starts_with('<') && uri.ends_with('>') && uri.len() >= 2 {
        &uri[1..uri.len() - 1]
    } else {
        uri
    }
}

/// Last path segment of a URI, used to derive subject file names.
pub fn localname(uri: &str) -> &str {
    let tail = uri.rsplit('/').next().unwrap_or(uri);
    tail.rsplit('#').next().unwrap_or(tail)
}

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use flate2::read::GzDecoder;

use crate::error::KiraError;

/// Opens a file for reading, decompressing it when the name ends in `.gz`.
pub fn open_input(path: &Path) -> Result<Box<dyn BufRead>, KiraError> {
    let file = fs::File::open(path)
        .map_err(|err| KiraError::Filesystem(format!("open {}: {err}", path.display())))?;
    let is_gzip = path.extension().map(|ext| ext == "gz").unwrap_or(false);
    if is_gzip {
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Writes `content` to a new file at `path`; an existing file is never replaced.
pub fn write_new_file_atomic(path: &Path, content: &[u8]) -> Result<(), KiraError> {
    if path.exists() {
        return Err(KiraError::OutputExists(path.to_path_buf()));
    }
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|err| KiraError::Filesystem(err.to_string()))?;
    let mut temp = tempfile::Builder::new()
        .prefix("kira-gp-out")
        .tempfile_in(parent)
        .map_err(|err| KiraError::Filesystem(err.to_string()))?;
    temp.write_all(content)
        .map_err(|err| KiraError::Filesystem(err.to_string()))?;
    temp.persist_noclobber(path).map_err(|err| {
        if err.error.kind() == std::io::ErrorKind::AlreadyExists {
            KiraError::OutputExists(path.to_path_buf())
        } else {
            KiraError::Filesystem(err.to_string())
        }
    })?;
    Ok(())
}

/// Replaces the file at `path` with `content` through a temporary sibling.
pub fn replace_file_atomic(path: &Path, content: &[u8]) -> Result<(), KiraError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|err| KiraError::Filesystem(err.to_string()))?;
    let mut temp = tempfile::Builder::new()
        .prefix("kira-gp-file")
        .tempfile_in(parent)
        .map_err(|err| KiraError::Filesystem(err.to_string()))?;
    temp.write_all(content)
        .map_err(|err| KiraError::Filesystem(err.to_string()))?;
    temp.persist(path)
        .map_err(|err| KiraError::Filesystem(err.to_string()))?;
    Ok(())
}

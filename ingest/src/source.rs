//! Reading corpus files from disk, optionally packed in a zip archive.

use std::env;
use std::fs::{self, File};
use std::io;
use std::path::Path;

use log::{debug, warn};
use zip::ZipArchive;

use crate::error::IngestError;

/// Extensions of archive members that are treated as corpus text.
const TEXT_EXTENSIONS: [&str; 4] = ["txt", "tsv", "csv", "text"];

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Reads a corpus file as text.
///
/// `.zip` files are unpacked: the first member with a text extension is
/// extracted to a scratch directory and read from there. The scratch
/// directory is removed before returning, whether or not reading worked.
pub fn open(path: &Path) -> Result<String, IngestError> {
    open_in(path, &env::temp_dir())
}

/// Like [open], with the zip scratch directory created under `scratch_root`.
pub(crate) fn open_in(path: &Path, scratch_root: &Path) -> Result<String, IngestError> {
    if is_zip(path) {
        return open_zip(path, scratch_root);
    }

    let bytes = fs::read(path).map_err(|e| IngestError::file_format(path, e))?;
    Ok(decode(&bytes, path))
}

fn is_zip(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("zip"))
        .unwrap_or(false)
}

fn has_text_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| TEXT_EXTENSIONS.iter().any(|t| ext.eq_ignore_ascii_case(t)))
        .unwrap_or(false)
}

fn open_zip(path: &Path, scratch_root: &Path) -> Result<String, IngestError> {
    let file = File::open(path).map_err(|e| IngestError::file_format(path, e))?;
    let mut archive = ZipArchive::new(file).map_err(|e| IngestError::file_format(path, e))?;

    let mut member = None;
    for i in 0..archive.len() {
        let entry = archive
            .by_index(i)
            .map_err(|e| IngestError::file_format(path, e))?;
        if !entry.is_dir() && has_text_extension(entry.name()) {
            member = Some(i);
            break;
        }
    }
    let index = member.ok_or_else(|| {
        IngestError::file_format(path, "archive contains no text member")
    })?;

    let scratch = tempfile::Builder::new()
        .prefix("corpus-")
        .tempdir_in(scratch_root)
        .map_err(|e| IngestError::file_format(path, e))?;
    let mut entry = archive
        .by_index(index)
        .map_err(|e| IngestError::file_format(path, e))?;
    let target = scratch.path().join(
        entry
            .enclosed_name()
            .and_then(|name| name.file_name().map(|n| n.to_owned()))
            .unwrap_or_else(|| "member.txt".into()),
    );
    debug!("Extracting '{}' from {}", entry.name(), path.display());

    let mut out = File::create(&target).map_err(|e| IngestError::file_format(path, e))?;
    io::copy(&mut entry, &mut out).map_err(|e| IngestError::file_format(path, e))?;
    drop(out);

    let bytes = fs::read(&target).map_err(|e| IngestError::file_format(path, e))?;
    Ok(decode(&bytes, path))
}

/// Decodes UTF-8, dropping a byte-order mark, replacing invalid bytes
/// and normalizing line endings to `\n`.
fn decode(bytes: &[u8], path: &Path) -> String {
    let bytes = bytes.strip_prefix(&UTF8_BOM[..]).unwrap_or(bytes);

    let text = match String::from_utf8(bytes.to_vec()) {
        Ok(text) => text,
        Err(_) => {
            warn!(
                "{} is not valid UTF-8; undecodable bytes were replaced",
                path.display()
            );
            String::from_utf8_lossy(bytes).into_owned()
        }
    };

    if text.contains('\r') {
        text.replace("\r\n", "\n")
    } else {
        text
    }
}

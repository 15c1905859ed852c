//! Artifact assembly — orders fetched pages and writes one CBZ
//!
//! The artifact is a comic book archive: a ZIP whose entries are the page
//! images, named by zero-padded index so any reader pages them in sequence
//! order. Images are stored uncompressed; they are already compressed
//! formats. Pages that failed to fetch are skipped, never padded or
//! substituted — the caller gets the sorted missing-index list instead.

use crate::error::{Error, Result};
use crate::types::FetchReport;
use std::io::{Seek, Write};
use std::path::Path;
use zip::CompressionMethod;
use zip::write::{FileOptions, ZipWriter};

/// Write all successful pages of `report` as a CBZ into `writer`,
/// strictly ascending by index.
///
/// Fails with [`Error::NothingToAssemble`] before touching the writer when
/// the success set is empty. Returns the sorted indices missing from the
/// artifact.
pub fn assemble<W: Write + Seek>(report: &FetchReport, writer: W) -> Result<Vec<u32>> {
    if report.successes.is_empty() {
        return Err(Error::NothingToAssemble);
    }

    let options = FileOptions::default().compression_method(CompressionMethod::Stored);
    let mut archive = ZipWriter::new(writer);
    for (index, page) in &report.successes {
        let name = format!("{:03}{}", index, page.format.extension());
        archive.start_file(name, options)?;
        archive.write_all(&page.bytes)?;
    }
    archive.finish()?;

    let missing = report.missing_indices();
    tracing::info!(
        pages = report.successes.len(),
        missing = missing.len(),
        "assembled artifact"
    );
    Ok(missing)
}

/// [`assemble`] into a freshly created file at `path`.
///
/// When there is nothing to assemble, no file is created and no parent
/// directory is touched.
pub fn assemble_to_path(report: &FetchReport, path: &Path) -> Result<Vec<u32>> {
    if report.successes.is_empty() {
        return Err(Error::NothingToAssemble);
    }

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    assemble(report, file)
}

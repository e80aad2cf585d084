//! Response packaging.
//!
//! A batch with exactly one result is returned as raw bytes with an
//! attachment disposition. Larger batches stream a ZIP archive straight
//! into the response body through a duplex pipe: entries are compressed and
//! flushed as they are written, so the whole archive never sits in memory
//! at once.
//!
//! Entry names derive from the original basename with the source extension
//! replaced by the target extension. Two inputs collapsing onto the same
//! output name get a deterministic `_N` suffix in submission order.

use std::collections::HashSet;

use async_zip::tokio::write::ZipFileWriter;
use async_zip::{Compression, DeflateOption, ZipEntryBuilder};
use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::Response;
use tokio::io::AsyncWrite;
use tokio_util::io::ReaderStream;
use tracing::error;

use crate::convert::{ConversionResult, TargetFormat};

/// Fixed filename for multi-file archive downloads.
pub const ARCHIVE_FILENAME: &str = "converted_images.zip";

/// Default ZIP compression level (0 = store, 9 = maximum).
pub const DEFAULT_ZIP_COMPRESSION: u32 = 3;

/// Buffer size for the archive duplex pipe.
const ARCHIVE_PIPE_BUFFER: usize = 64 * 1024;

// =============================================================================
// Naming
// =============================================================================

/// Strip the final extension from a file name.
///
/// Falls back to the full name when stripping would leave nothing (e.g.
/// dotfiles like ".png").
pub fn basename(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

/// Derive archive entry names, resolving collisions deterministically.
///
/// Names are assigned in submission order; when `<basename>.<ext>` is
/// already taken, `_1`, `_2`, ... suffixes are tried in order.
pub fn entry_names(results: &[ConversionResult], format: TargetFormat) -> Vec<String> {
    let ext = format.extension();
    let mut taken = HashSet::new();
    let mut names = Vec::with_capacity(results.len());

    for result in results {
        let base = basename(&result.original_name);
        let mut candidate = format!("{base}.{ext}");
        let mut counter = 1;
        while !taken.insert(candidate.clone()) {
            candidate = format!("{base}_{counter}.{ext}");
            counter += 1;
        }
        names.push(candidate);
    }

    names
}

// =============================================================================
// Single-File Response
// =============================================================================

/// Package a single result as a raw binary response.
pub fn single_response(result: ConversionResult, format: TargetFormat) -> Response {
    let filename = format!(
        "{}.{}",
        urlencoding::encode(basename(&result.original_name)),
        format.extension()
    );

    match Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, format.mime_type())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )
        .body(Body::from(result.bytes))
    {
        Ok(response) => response,
        Err(e) => {
            error!("failed to build single-file response: {e}");
            Response::new(Body::empty())
        }
    }
}

// =============================================================================
// Archive Response
// =============================================================================

/// Package multiple results as a streamed ZIP archive.
///
/// The archive writer runs on its own task and feeds the response body
/// through a duplex pipe. A write failure after streaming has begun cannot
/// change the status code anymore; the stream is truncated and the error
/// logged.
pub fn archive_response(
    results: Vec<ConversionResult>,
    format: TargetFormat,
    compression_level: u32,
) -> Response {
    let names = entry_names(&results, format);
    let entries: Vec<(String, Vec<u8>)> = names
        .into_iter()
        .zip(results)
        .map(|(name, result)| (name, result.bytes))
        .collect();

    let (writer, reader) = tokio::io::duplex(ARCHIVE_PIPE_BUFFER);

    tokio::spawn(async move {
        if let Err(e) = write_archive(writer, entries, compression_level).await {
            error!("archive streaming failed: {e}");
        }
    });

    match Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/zip")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename={ARCHIVE_FILENAME}"),
        )
        .body(Body::from_stream(ReaderStream::new(reader)))
    {
        Ok(response) => response,
        Err(e) => {
            error!("failed to build archive response: {e}");
            Response::new(Body::empty())
        }
    }
}

/// Write all entries into a ZIP stream.
///
/// Entry buffers are consumed one at a time, freeing each as soon as it has
/// been compressed into the output.
async fn write_archive<W>(
    writer: W,
    entries: Vec<(String, Vec<u8>)>,
    compression_level: u32,
) -> Result<(), async_zip::error::ZipError>
where
    W: AsyncWrite + Unpin,
{
    let mut zip = ZipFileWriter::with_tokio(writer);

    for (name, bytes) in entries {
        let builder = entry_builder(name, compression_level);
        zip.write_entry_whole(builder, &bytes).await?;
        drop(bytes);
    }

    zip.close().await?;
    Ok(())
}

/// Map the numeric compression level onto the archive writer's options.
///
/// Level 0 stores entries uncompressed; 1-9 select the exact deflate level
/// (the named `DeflateOption` presets all collapse to the codec default, so
/// the numeric form is the only one that honors the knob).
fn entry_builder(name: String, level: u32) -> ZipEntryBuilder {
    if level == 0 {
        return ZipEntryBuilder::new(name.into(), Compression::Stored);
    }

    ZipEntryBuilder::new(name.into(), Compression::Deflate)
        .deflate_option(DeflateOption::Other(level.min(9) as i32))
}

// =============================================================================
// Tests
// =============================================================================

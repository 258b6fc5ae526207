//! Export and import of site content as a TOML archive.

use std::path::Path;

use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::{
    application::{
        error::AppError,
        sync::{ContentSynchronizer, ContentView, SaveOutcome},
    },
    domain::content::SiteContent,
    infra::error::InfraError,
};

/// Archive layout version written by [`export_content`].
pub const ARCHIVE_FORMAT: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct ContentArchive {
    format: u32,
    exported_at: String,
    content: SiteContent,
}

/// Write the merged content of `view` to `path`.
pub async fn export_content(view: &ContentView, path: &Path) -> Result<(), AppError> {
    let exported_at = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(|err| AppError::unexpected(format!("failed to format timestamp: {err}")))?;
    let archive = ContentArchive {
        format: ARCHIVE_FORMAT,
        exported_at,
        content: view.content.as_ref().clone(),
    };

    let encoded = toml::to_string_pretty(&archive)
        .map_err(|err| AppError::unexpected(format!("failed to encode archive: {err}")))?;
    tokio::fs::write(path, encoded)
        .await
        .map_err(|err| AppError::from(InfraError::Io(err)))?;
    Ok(())
}

/// Read an archive from `path` and persist it through the save path.
pub async fn import_content(
    synchronizer: &ContentSynchronizer,
    path: &Path,
) -> Result<SaveOutcome, AppError> {
    let data = tokio::fs::read_to_string(path)
        .await
        .map_err(|err| AppError::from(InfraError::Io(err)))?;
    let archive: ContentArchive = toml::from_str(&data)
        .map_err(|err| AppError::validation(format!("invalid archive: {err}")))?;

    if archive.format != ARCHIVE_FORMAT {
        return Err(AppError::validation(format!(
            "unsupported archive format {} (expected {ARCHIVE_FORMAT})",
            archive.format
        )));
    }

    synchronizer
        .save(archive.content)
        .await
        .map_err(AppError::from)
}

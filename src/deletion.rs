//! # Deletion Policy
//!
//! Rimuove il file sorgente dopo una conversione riuscita, solo quando tutte le
//! condizioni sono vere: `--delete`, `--commit`, destinazione presente su disco e
//! conversione riuscita. In tutti gli altri casi è un no-op silenzioso.
//!
//! Gli errori di rimozione NON vengono mascherati: tornano al chiamante come
//! `ConvertError::Deletion`.

use crate::config::Policy;
use crate::error::ConvertError;
use console::style;
use std::path::Path;

/// Delete `source` if the policy and the conversion result allow it.
///
/// Returns `Ok(true)` when the file was removed.
pub async fn maybe_delete(
    source: &Path,
    destination_exists: bool,
    succeeded: bool,
    policy: Policy,
) -> Result<bool, ConvertError> {
    if !(policy.delete && policy.commit && destination_exists && succeeded) {
        return Ok(false);
    }

    println!("{}", style(format!("Delete: {}", source.display())).red());

    tokio::fs::remove_file(source)
        .await
        .map_err(|e| ConvertError::Deletion {
            path: source.to_path_buf(),
            source: e,
        })?;

    Ok(true)
}

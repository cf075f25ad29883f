//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce `ConvertError` enum per categorizzare gli errori possibili
//! - Fornisce messaggi di errore descrittivi e strutturati
//! - Integra con `thiserror` per automatic error conversion
//!
//! ## Categorie di errori:
//! - `Deletion`: Cancellazione del file sorgente fallita
//! - `MissingPath`: Nessuna directory specificata sulla command line
//! - `MissingDependency`: Tool esterno mancante
//! - `Validation`: Errori di validazione della configurazione
//!
//! ## Nota:
//! Gli errori riportati dal motore durante la conversione NON passano da qui:
//! vengono assorbiti dal converter e riportati come `succeeded = false`.
//!
//! ## Esempio:
//! ```rust,ignore
//! if !engine_available {
//!     return Err(ConvertError::MissingDependency("HandBrakeCLI".to_string()));
//! }
//! ```

use std::path::PathBuf;

/// Custom error types for batch conversion
#[derive(thiserror::Error, Debug)]
pub enum ConvertError {
    #[error("Failed to delete {path}: {source}")]
    Deletion {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Path required!")]
    MissingPath,

    #[error("Dependency missing: {0}")]
    MissingDependency(String),

    #[error("Configuration error: {0}")]
    Validation(String),
}

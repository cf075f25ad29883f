//! # Mp4 Encoder Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Configurazione della run e policy commit/force/delete
//! - `error`: Tipi di errore custom
//! - `scanner`: Discovery dei file (`FileEntry`) nella directory radice
//! - `filter`: Allow-list delle estensioni sorgente
//! - `engine`: Contratto del motore di transcodifica e implementazione HandBrakeCLI
//! - `platform`: Risoluzione e verifica dell'eseguibile del motore
//! - `converter`: Conversione di un singolo file
//! - `deletion`: Cancellazione condizionale del sorgente
//! - `pipeline`: Consumo seriale della coda
//! - `progress`: Riga di progresso e statistiche della run
//!
//! ## Utilizzo:
//! ```rust,ignore
//! use mp4_encoder::{Config, Converter, HandBrakeEngine, Pipeline};
//! use mp4_encoder::progress::ConsoleProgress;
//!
//! let config = Config::default();
//! let engine = Arc::new(HandBrakeEngine::new(config.engine_binary.clone()));
//! let converter = Converter::new(engine, Arc::new(ConsoleProgress::new()), config.preset.clone());
//! let stats = Pipeline::new(&config, converter).scan_and_run().await;
//! ```

pub mod config;
pub mod converter;
pub mod deletion;
pub mod engine;
pub mod error;
pub mod filter;
pub mod pipeline;
pub mod platform;
pub mod progress;
pub mod scanner;

pub use config::{Config, Policy};
pub use converter::{ConversionOutcome, Converter};
pub use engine::{EncodeJob, EngineEvent, HandBrakeEngine, TranscodeEngine};
pub use error::ConvertError;
pub use pipeline::Pipeline;
pub use progress::RunStats;
pub use scanner::{FileEntry, Scanner};

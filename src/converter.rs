//! # Conversion Orchestrator Module
//!
//! Questo modulo gestisce la conversione di un singolo file tramite il motore
//! di transcodifica esterno.
//!
//! ## Responsabilità:
//! - Controlla se la destinazione esiste già e avvisa l'utente
//! - Applica la policy di commit (dry run) e di force (sovrascrittura)
//! - Avvia il motore e consuma il suo stream di eventi fino a `Complete`
//! - Inoltra i campioni di progresso all'observer senza alterarli
//!
//! ## Macchina a stati:
//! 1. **CheckDestination**: avviso (rosso se verrà sovrascritta con `--force`)
//! 2. **Decide**:
//!    - `commit = false` → `DryRun`, nessun effetto collaterale
//!    - destinazione esistente senza `force` → `Skipped`
//!    - altrimenti → **Invoke**
//! 3. **Invoke**: gli errori del motore vengono assorbiti qui e diventano
//!    `Failed`; non interrompono mai la pipeline.
//!
//! ## Successo:
//! Una conversione è `Converted` solo se il motore ha segnalato `Begin`, non ha
//! riportato errori ed è arrivato a `Complete`. Un `Complete` senza `Begin`
//! viene loggato con l'output grezzo del motore e conta come fallimento.

use crate::config::Policy;
use crate::engine::{EncodeJob, EngineEvent, TranscodeEngine};
use crate::progress::ProgressObserver;
use console::style;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of a single conversion attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionOutcome {
    /// Commit disabled, nothing was done
    DryRun,
    /// Destination exists and force is disabled
    Skipped,
    Converted,
    Failed,
}

impl ConversionOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Converted)
    }
}

/// Runs one conversion at a time through a transcoding engine
pub struct Converter {
    engine: Arc<dyn TranscodeEngine>,
    observer: Arc<dyn ProgressObserver>,
    preset: String,
}

impl Converter {
    pub fn new(
        engine: Arc<dyn TranscodeEngine>,
        observer: Arc<dyn ProgressObserver>,
        preset: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            observer,
            preset: preset.into(),
        }
    }

    /// Convert `source` into `destination` under `policy`
    pub async fn convert(&self, source: &Path, destination: &Path, policy: Policy) -> ConversionOutcome {
        info!("Transcoding...");
        info!("src: {}", source.display());
        info!("dst: {}", destination.display());

        if source == destination {
            println!("src and dst are the same file ...skipping.");
            return ConversionOutcome::Skipped;
        }

        let destination_exists = tokio::fs::try_exists(destination).await.unwrap_or(false);
        if destination_exists {
            let notice = format!("dst exists: {}", destination.display());
            if policy.force {
                println!("{}", style(notice).red());
            } else {
                println!("{}", notice);
            }
        }

        if !policy.commit {
            debug!("Dry run, not converting {}", source.display());
            return ConversionOutcome::DryRun;
        }

        if destination_exists && !policy.force {
            println!("...skipping.");
            return ConversionOutcome::Skipped;
        }

        self.invoke(source, destination).await
    }

    async fn invoke(&self, source: &Path, destination: &Path) -> ConversionOutcome {
        let job = EncodeJob {
            preset: self.preset.clone(),
            input: source.to_path_buf(),
            output: destination.to_path_buf(),
        };

        let mut events = match self.engine.spawn(job) {
            Ok(events) => events,
            Err(e) => {
                warn!("Failed to start engine for {}: {}", source.display(), e);
                return ConversionOutcome::Failed;
            }
        };

        let mut began = false;
        let mut errors = Vec::new();
        let mut engine_output = None;

        while let Some(event) = events.recv().await {
            match event {
                EngineEvent::Begin => {
                    began = true;
                    self.observer.begin();
                }
                EngineEvent::Progress(progress) => self.observer.progress(&progress),
                EngineEvent::Error(cause) => {
                    debug!("Engine reported an error for {}: {}", source.display(), cause);
                    errors.push(cause);
                }
                EngineEvent::Complete { output } => {
                    engine_output = Some(output);
                    break;
                }
            }
        }

        self.observer.finish();

        let Some(output) = engine_output else {
            warn!("Engine stopped without completing: {}", destination.display());
            return ConversionOutcome::Failed;
        };

        if !began {
            warn!("Engine never started encoding {}:\n{}", source.display(), output.trim_end());
        }
        for cause in &errors {
            warn!("Transcoding {} failed: {}", source.display(), cause);
        }

        info!("finished transcoding: {}", destination.display());

        if began && errors.is_empty() {
            ConversionOutcome::Converted
        } else {
            ConversionOutcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{Script, ScriptedEngine};
    use crate::progress::testing::RecordingProgress;
    use anyhow::Result;
    use std::fs;
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    const COMMIT: Policy = Policy { commit: true, force: false, delete: false };
    const FORCE: Policy = Policy { commit: true, force: true, delete: false };
    const DRY_RUN: Policy = Policy { commit: false, force: true, delete: true };

    fn converter(engine: &ScriptedEngine, observer: &Arc<RecordingProgress>) -> Converter {
        Converter::new(Arc::new(engine.clone()), observer.clone(), "Normal")
    }

    fn source(temp_dir: &TempDir) -> (std::path::PathBuf, std::path::PathBuf) {
        let src = temp_dir.path().join("movie.avi");
        fs::write(&src, b"source").unwrap();
        (src, temp_dir.path().join("movie.mp4"))
    }

    #[tokio::test]
    async fn test_dry_run_has_no_side_effects() {
        let temp_dir = TempDir::new().unwrap();
        let (src, dst) = source(&temp_dir);
        let engine = ScriptedEngine::new(Script::Succeed);
        let observer = Arc::new(RecordingProgress::default());

        let outcome = converter(&engine, &observer).convert(&src, &dst, DRY_RUN).await;

        assert_eq!(outcome, ConversionOutcome::DryRun);
        assert!(!outcome.succeeded());
        assert!(engine.inputs().is_empty());
        assert!(!dst.exists());
        assert!(observer.events().is_empty());
    }

    #[tokio::test]
    async fn test_existing_destination_is_skipped_without_force() {
        let temp_dir = TempDir::new().unwrap();
        let (src, dst) = source(&temp_dir);
        fs::write(&dst, b"previous output").unwrap();
        let engine = ScriptedEngine::new(Script::Succeed);
        let observer = Arc::new(RecordingProgress::default());

        let outcome = converter(&engine, &observer).convert(&src, &dst, COMMIT).await;

        assert_eq!(outcome, ConversionOutcome::Skipped);
        assert!(engine.inputs().is_empty());
        assert_eq!(fs::read(&dst).unwrap(), b"previous output");
    }

    #[tokio::test]
    async fn test_source_as_destination_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("movie.mp4");
        fs::write(&src, b"source").unwrap();
        let engine = ScriptedEngine::new(Script::Succeed);
        let observer = Arc::new(RecordingProgress::default());

        let outcome = converter(&engine, &observer).convert(&src, &src, FORCE).await;

        assert_eq!(outcome, ConversionOutcome::Skipped);
        assert!(!outcome.succeeded());
        assert!(engine.inputs().is_empty());
        assert_eq!(fs::read(&src).unwrap(), b"source");
    }

    #[tokio::test]
    async fn test_force_overwrites_existing_destination() {
        let temp_dir = TempDir::new().unwrap();
        let (src, dst) = source(&temp_dir);
        fs::write(&dst, b"previous output").unwrap();
        let engine = ScriptedEngine::new(Script::Succeed);
        let observer = Arc::new(RecordingProgress::default());

        let outcome = converter(&engine, &observer).convert(&src, &dst, FORCE).await;

        assert_eq!(outcome, ConversionOutcome::Converted);
        assert_eq!(engine.inputs(), vec![src]);
        assert_eq!(fs::read(&dst).unwrap(), b"converted");
    }

    #[tokio::test]
    async fn test_successful_conversion_reports_progress() {
        let temp_dir = TempDir::new().unwrap();
        let (src, dst) = source(&temp_dir);
        let engine = ScriptedEngine::new(Script::Succeed);
        let observer = Arc::new(RecordingProgress::default());

        let outcome = converter(&engine, &observer).convert(&src, &dst, COMMIT).await;

        assert!(outcome.succeeded());
        assert!(dst.exists());
        assert_eq!(observer.events(), vec!["begin", "progress 50.00", "finish"]);

        let jobs = engine.jobs.lock().unwrap().clone();
        assert_eq!(jobs[0].preset, "Normal");
        assert_eq!(jobs[0].output, dst);
    }

    #[tokio::test]
    async fn test_engine_error_is_swallowed_as_failure() {
        let temp_dir = TempDir::new().unwrap();
        let (src, dst) = source(&temp_dir);
        let engine = ScriptedEngine::new(Script::Fail);
        let observer = Arc::new(RecordingProgress::default());

        let outcome = converter(&engine, &observer).convert(&src, &dst, COMMIT).await;

        assert_eq!(outcome, ConversionOutcome::Failed);
        assert!(!dst.exists());
    }

    #[tokio::test]
    async fn test_complete_without_begin_is_failure() {
        let temp_dir = TempDir::new().unwrap();
        let (src, dst) = source(&temp_dir);
        let engine = ScriptedEngine::new(Script::SucceedWithoutBegin);
        let observer = Arc::new(RecordingProgress::default());

        let outcome = converter(&engine, &observer).convert(&src, &dst, COMMIT).await;

        assert_eq!(outcome, ConversionOutcome::Failed);
        assert_eq!(observer.events(), vec!["progress 50.00", "finish"]);
    }

    struct BrokenEngine;

    impl TranscodeEngine for BrokenEngine {
        fn spawn(&self, _job: EncodeJob) -> Result<mpsc::UnboundedReceiver<EngineEvent>> {
            Err(anyhow::anyhow!("cannot start"))
        }
    }

    struct SilentEngine;

    impl TranscodeEngine for SilentEngine {
        fn spawn(&self, _job: EncodeJob) -> Result<mpsc::UnboundedReceiver<EngineEvent>> {
            let (tx, rx) = mpsc::unbounded_channel();
            tx.send(EngineEvent::Begin).unwrap();
            Ok(rx)
        }
    }

    #[tokio::test]
    async fn test_engine_start_failure_is_failure() {
        let temp_dir = TempDir::new().unwrap();
        let (src, dst) = source(&temp_dir);
        let observer = Arc::new(RecordingProgress::default());
        let converter = Converter::new(Arc::new(BrokenEngine), observer.clone(), "Normal");

        assert_eq!(converter.convert(&src, &dst, COMMIT).await, ConversionOutcome::Failed);
        assert!(observer.events().is_empty());
    }

    #[tokio::test]
    async fn test_stream_closed_without_complete_is_failure() {
        let temp_dir = TempDir::new().unwrap();
        let (src, dst) = source(&temp_dir);
        let observer = Arc::new(RecordingProgress::default());
        let converter = Converter::new(Arc::new(SilentEngine), observer.clone(), "Normal");

        assert_eq!(converter.convert(&src, &dst, COMMIT).await, ConversionOutcome::Failed);
        assert_eq!(observer.events(), vec!["begin", "finish"]);
    }
}

//! # Pipeline Driver
//!
//! Orchestratore principale della run: consuma la coda prodotta dallo scanner
//! un elemento alla volta e per ciascuno applica filtro, conversione e policy
//! di cancellazione.
//!
//! ## Garanzie:
//! - Ordine FIFO stretto sulla coda di discovery
//! - Una sola conversione attiva: il passo n+1 parte solo dopo che la
//!   conversione del passo n ha segnalato il completamento
//! - Coda vuota → terminazione immediata senza effetti collaterali
//!
//! ## Errori:
//! Gli errori di cancellazione vengono loggati, contati in `RunStats` e la run
//! prosegue con il file successivo; `main` li trasforma in exit code non zero.

use crate::{
    config::Config,
    converter::{ConversionOutcome, Converter},
    deletion,
    filter::ExtensionFilter,
    progress::RunStats,
    scanner::{FileEntry, Scanner},
};
use std::collections::VecDeque;
use tracing::{debug, error, info, warn};

/// Serial consumer of the work queue
pub struct Pipeline<'a> {
    config: &'a Config,
    converter: Converter,
    filter: ExtensionFilter,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a Config, converter: Converter) -> Self {
        Self {
            config,
            converter,
            filter: ExtensionFilter::parse(&config.extensions),
        }
    }

    /// Scan the configured root, then process the resulting queue
    pub async fn scan_and_run(&self) -> RunStats {
        let root = self.config.root();
        info!("Scanning {}{}", root.display(), if self.config.recursive { " (recursive)" } else { "" });
        if self.filter.is_empty() {
            warn!("Extension list is empty: no file will be converted");
        } else {
            debug!("Eligible extensions: {}", self.filter.extensions().join(", "));
        }

        let queue = Scanner::scan(Some(root), self.config.recursive);
        info!("Found {} files", queue.len());

        self.run(queue).await
    }

    /// Process `queue` front to back, one conversion at a time
    pub async fn run(&self, queue: Vec<FileEntry>) -> RunStats {
        let mut stats = RunStats::new();
        stats.files_discovered = queue.len();

        let mut queue = VecDeque::from(queue);
        while let Some(file) = queue.pop_front() {
            self.step(&file, &mut stats).await;
        }

        stats
    }

    async fn step(&self, file: &FileEntry, stats: &mut RunStats) {
        if !self.filter.is_eligible(&file.extension) {
            debug!("Ignoring {}", file.absolute_path.display());
            return;
        }
        stats.files_eligible += 1;

        let policy = self.config.policy();
        let destination = file.destination(&self.config.target_extension);

        // Same parent and base name: the destination can only differ from the
        // source by extension case, which is the same file on case-insensitive
        // filesystems.
        if file.extension.eq_ignore_ascii_case(&self.config.target_extension) {
            println!(
                "src is already .{}: {} ...skipping.",
                self.config.target_extension,
                file.absolute_path.display()
            );
            stats.add_skipped();
            return;
        }

        let outcome = self
            .converter
            .convert(&file.absolute_path, &destination, policy)
            .await;

        match outcome {
            ConversionOutcome::Converted => stats.add_converted(file.metadata.size),
            ConversionOutcome::DryRun | ConversionOutcome::Skipped => stats.add_skipped(),
            ConversionOutcome::Failed => stats.add_failed(),
        }

        let destination_exists = tokio::fs::try_exists(&destination).await.unwrap_or(false);
        match deletion::maybe_delete(&file.absolute_path, destination_exists, outcome.succeeded(), policy).await {
            Ok(true) => stats.add_deleted(),
            Ok(false) => {}
            Err(e) => {
                error!("{}", e);
                stats.add_deletion_failure();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_EXTENSIONS;
    use crate::engine::testing::{Script, ScriptedEngine};
    use crate::progress::testing::RecordingProgress;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("a.avi"), b"a").unwrap();
        fs::write(root.join("b.mpg"), b"b").unwrap();
        fs::write(root.join("c.txt"), b"c").unwrap();
        fs::create_dir(root.join("sub")).unwrap();
        fs::write(root.join("sub").join("d.avi"), b"d").unwrap();
        temp_dir
    }

    fn config(root: &Path, recursive: bool, commit: bool) -> Config {
        Config {
            path: Some(root.to_path_buf()),
            recursive,
            commit,
            force: false,
            delete: true,
            ..Default::default()
        }
    }

    async fn run(config: &Config, engine: &ScriptedEngine) -> RunStats {
        let converter = Converter::new(
            Arc::new(engine.clone()),
            Arc::new(RecordingProgress::default()),
            config.preset.clone(),
        );
        Pipeline::new(config, converter).scan_and_run().await
    }

    fn snapshot(root: &Path) -> Vec<(PathBuf, Vec<u8>)> {
        let mut files: Vec<_> = walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| {
                let content = if e.file_type().is_file() { fs::read(e.path()).unwrap() } else { Vec::new() };
                (e.path().to_path_buf(), content)
            })
            .collect();
        files.sort();
        files
    }

    #[tokio::test]
    async fn test_non_recursive_end_to_end() {
        let temp_dir = fixture();
        let root = temp_dir.path().canonicalize().unwrap();
        let engine = ScriptedEngine::new(Script::Succeed);

        let stats = run(&config(&root, false, true), &engine).await;

        let mut inputs = engine.inputs();
        inputs.sort();
        assert_eq!(inputs, vec![root.join("a.avi"), root.join("b.mpg")]);

        assert!(root.join("a.mp4").exists());
        assert!(root.join("b.mp4").exists());
        assert!(!root.join("a.avi").exists());
        assert!(!root.join("b.mpg").exists());
        assert!(root.join("c.txt").exists());
        assert!(root.join("sub").join("d.avi").exists());
        assert!(!root.join("sub").join("d.mp4").exists());

        assert_eq!(stats.files_discovered, 3);
        assert_eq!(stats.files_eligible, 2);
        assert_eq!(stats.files_converted, 2);
        assert_eq!(stats.files_deleted, 2);
    }

    #[tokio::test]
    async fn test_recursive_end_to_end() {
        let temp_dir = fixture();
        let root = temp_dir.path().canonicalize().unwrap();
        let engine = ScriptedEngine::new(Script::Succeed);

        let filter = ExtensionFilter::parse(DEFAULT_EXTENSIONS);
        let expected: Vec<PathBuf> = Scanner::scan(Some(&root), true)
            .into_iter()
            .filter(|f| filter.is_eligible(&f.extension))
            .map(|f| f.absolute_path)
            .collect();

        let stats = run(&config(&root, true, true), &engine).await;

        assert_eq!(expected.len(), 3);
        assert_eq!(engine.inputs(), expected);
        assert!(root.join("sub").join("d.mp4").exists());
        assert!(!root.join("sub").join("d.avi").exists());
        assert_eq!(stats.files_deleted, 3);
    }

    #[tokio::test]
    async fn test_conversions_follow_queue_order_without_overlap() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().canonicalize().unwrap();
        for i in 0..6 {
            fs::write(root.join(format!("clip{}.avi", i)), b"x").unwrap();
        }
        let config = config(&root, false, true);
        let engine = ScriptedEngine::new(Script::Succeed);
        let converter = Converter::new(
            Arc::new(engine.clone()),
            Arc::new(RecordingProgress::default()),
            "Normal",
        );

        let queue = Scanner::scan(Some(&root), false);
        let expected: Vec<PathBuf> = queue.iter().map(|f| f.absolute_path.clone()).collect();
        Pipeline::new(&config, converter).run(queue).await;

        assert_eq!(engine.inputs(), expected);
        assert_eq!(engine.max_active.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dry_run_touches_nothing() {
        let temp_dir = fixture();
        let root = temp_dir.path().canonicalize().unwrap();
        fs::write(root.join("b.mp4"), b"old").unwrap();
        let before = snapshot(&root);
        let engine = ScriptedEngine::new(Script::Succeed);

        let stats = run(&Config { force: true, ..config(&root, true, false) }, &engine).await;

        assert!(engine.inputs().is_empty());
        assert_eq!(snapshot(&root), before);
        assert_eq!(stats.files_skipped, 3);
        assert_eq!(stats.files_deleted, 0);
    }

    #[tokio::test]
    async fn test_failed_conversion_keeps_source() {
        let temp_dir = fixture();
        let root = temp_dir.path().canonicalize().unwrap();
        let engine = ScriptedEngine::new(Script::Fail);

        let stats = run(&config(&root, false, true), &engine).await;

        assert!(root.join("a.avi").exists());
        assert!(root.join("b.mpg").exists());
        assert_eq!(stats.files_failed, 2);
        assert_eq!(stats.files_deleted, 0);
    }

    #[tokio::test]
    async fn test_skipped_collision_keeps_source() {
        let temp_dir = fixture();
        let root = temp_dir.path().canonicalize().unwrap();
        fs::write(root.join("a.mp4"), b"previous").unwrap();
        let engine = ScriptedEngine::new(Script::Succeed);

        let stats = run(&config(&root, false, true), &engine).await;

        assert_eq!(engine.inputs(), vec![root.join("b.mpg")]);
        assert_eq!(fs::read(root.join("a.mp4")).unwrap(), b"previous");
        assert!(root.join("a.avi").exists());
        assert!(!root.join("b.mpg").exists());
        assert_eq!(stats.files_skipped, 1);
    }

    #[tokio::test]
    async fn test_source_already_in_target_format_is_left_alone() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().canonicalize().unwrap();
        fs::write(root.join("clip.mp4"), b"original").unwrap();
        fs::write(root.join("other.MP4"), b"upper").unwrap();
        let config = Config {
            extensions: "mp4,avi".to_string(),
            force: true,
            ..config(&root, false, true)
        };
        let engine = ScriptedEngine::new(Script::Succeed);

        let stats = run(&config, &engine).await;

        assert!(engine.inputs().is_empty());
        assert_eq!(fs::read(root.join("clip.mp4")).unwrap(), b"original");
        assert_eq!(fs::read(root.join("other.MP4")).unwrap(), b"upper");
        assert_eq!(stats.files_skipped, 2);
        assert_eq!(stats.files_converted, 0);
        assert_eq!(stats.files_deleted, 0);
    }

    #[tokio::test]
    async fn test_empty_queue_completes_immediately() {
        let temp_dir = TempDir::new().unwrap();
        let config = config(temp_dir.path(), true, true);
        let engine = ScriptedEngine::new(Script::Succeed);
        let converter = Converter::new(
            Arc::new(engine.clone()),
            Arc::new(RecordingProgress::default()),
            "Normal",
        );

        let stats = Pipeline::new(&config, converter).run(Vec::new()).await;

        assert_eq!(stats, RunStats::default());
        assert!(engine.inputs().is_empty());
    }
}

//! # Progress Tracking and Statistics Module
//!
//! Questo modulo gestisce il feedback visivo durante le conversioni e le
//! statistiche aggregate della run.
//!
//! ## Responsabilità:
//! - `ProgressObserver`: riceve begin/progress/finish dal converter
//! - `ConsoleProgress`: riga di stato singola, sovrascritta in place, con `indicatif`
//! - `RunStats`: conteggi di file convertiti, saltati, falliti e cancellati
//!
//! ## Layout della riga di stato:
//! ```text
//! Task      % done     FPS       Avg FPS   ETA
//! Encoding  42.17      87.31     90.02     00h01m10s
//! ```
//! Le colonne partono a 1, 11, 22, 32 e 42. I valori vengono mostrati così come
//! arrivano dal motore, senza buffering: l'ultimo campione prima del termine
//! non è necessariamente al 100%.

use crate::engine::EncodeProgress;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;

const HEADER: &str = "Task      % done     FPS       Avg FPS   ETA";

/// Receives the progress signals of one conversion at a time
pub trait ProgressObserver: Send + Sync {
    /// The engine started real work
    fn begin(&self);
    fn progress(&self, progress: &EncodeProgress);
    /// The conversion reached its terminal signal
    fn finish(&self);
}

/// Render a progress sample in the fixed-column layout
pub fn format_columns(progress: &EncodeProgress) -> String {
    format!(
        "{:<10}{:<11}{:<10}{:<10}{}",
        progress.task,
        format!("{:.2}", progress.percent_complete),
        format!("{:.2}", progress.fps),
        format!("{:.2}", progress.avg_fps),
        progress.eta
    )
}

/// Single overwritten status line on the terminal
#[derive(Default)]
pub struct ConsoleProgress {
    bar: Mutex<Option<ProgressBar>>,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self::default()
    }

    fn create_bar() -> ProgressBar {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{msg}")
                .unwrap(),
        );
        bar
    }
}

impl ProgressObserver for ConsoleProgress {
    fn begin(&self) {
        println!("{}", style(HEADER).bold());
        if let Ok(mut bar) = self.bar.lock() {
            *bar = Some(Self::create_bar());
        }
    }

    fn progress(&self, progress: &EncodeProgress) {
        if let Ok(mut bar) = self.bar.lock() {
            let bar = bar.get_or_insert_with(Self::create_bar);
            bar.set_position(progress.percent_complete.clamp(0.0, 100.0) as u64);
            bar.set_message(format_columns(progress));
        }
    }

    fn finish(&self) {
        if let Ok(mut bar) = self.bar.lock() {
            if let Some(bar) = bar.take() {
                bar.finish();
            }
        }
        println!();
    }
}

/// Statistics for a single run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    pub files_discovered: usize,
    pub files_eligible: usize,
    pub files_converted: usize,
    /// Dry run or destination collision
    pub files_skipped: usize,
    pub files_failed: usize,
    pub files_deleted: usize,
    pub deletion_failures: usize,
    pub bytes_converted: u64,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_converted(&mut self, source_size: u64) {
        self.files_converted += 1;
        self.bytes_converted += source_size;
    }

    pub fn add_skipped(&mut self) {
        self.files_skipped += 1;
    }

    pub fn add_failed(&mut self) {
        self.files_failed += 1;
    }

    pub fn add_deleted(&mut self) {
        self.files_deleted += 1;
    }

    pub fn add_deletion_failure(&mut self) {
        self.deletion_failures += 1;
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Discovered: {} files | Eligible: {} | Converted: {} ({}) | Skipped: {} | Failed: {} | Deleted: {} | Delete errors: {}",
            self.files_discovered,
            self.files_eligible,
            self.files_converted,
            format_size(self.bytes_converted),
            self.files_skipped,
            self.files_failed,
            self.files_deleted,
            self.deletion_failures
        )
    }
}

/// Get human-readable file size
pub fn format_size(size: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = size as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", size as u64, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

//! # Transcoding Engine Module
//!
//! Questo modulo definisce il contratto con il motore di transcodifica esterno
//! e la sua implementazione basata su HandBrakeCLI.
//!
//! ## Responsabilità:
//! - `EncodeJob`: preset + sorgente + destinazione di una conversione
//! - `EngineEvent`: i quattro segnali del motore (begin, progress, error, complete)
//! - `TranscodeEngine`: trait implementabile da qualsiasi motore che rispetti il contratto
//! - `HandBrakeEngine`: lancia `HandBrakeCLI` e traduce il suo output in eventi
//!
//! ## Contratto degli eventi:
//! Gli eventi arrivano su un canale `mpsc` con un solo subscriber, nell'ordine
//! `Begin` → `Progress`* → `Error`? → `Complete`. `Complete` è sempre l'ultimo
//! evento e porta con sé l'output grezzo del motore per la diagnostica.
//!
//! ## Output di HandBrakeCLI:
//! ```text
//! Encoding: task 1 of 1, 42.17 % (87.31 fps, avg 90.02 fps, ETA 00h01m10s)
//! Muxing: this may take awhile...
//! ```
//! Le righe di progresso sono separate da `\r`, quindi lo stdout viene diviso
//! sia su `\r` che su `\n`.

use anyhow::Result;
use regex::Regex;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::OnceLock;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::debug;

use crate::platform::PlatformCommands;

/// Parameters of a single engine invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeJob {
    pub preset: String,
    pub input: PathBuf,
    pub output: PathBuf,
}

/// A progress sample reported by the engine
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeProgress {
    pub task: String,
    pub percent_complete: f64,
    pub fps: f64,
    pub avg_fps: f64,
    pub eta: String,
}

/// Signals emitted by an engine while a job runs
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Real work started
    Begin,
    Progress(EncodeProgress),
    /// Engine-side failure (bad input, no decodable stream, ...)
    Error(String),
    /// Terminal signal, carries the raw engine output
    Complete { output: String },
}

/// An external transcoder honoring the begin/progress/error/complete contract
pub trait TranscodeEngine: Send + Sync {
    /// Start `job` and return the receiving end of its event stream
    fn spawn(&self, job: EncodeJob) -> Result<mpsc::UnboundedReceiver<EngineEvent>>;
}

/// Drives `HandBrakeCLI`
#[derive(Debug, Clone)]
pub struct HandBrakeEngine {
    binary: String,
}

impl HandBrakeEngine {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Executable actually launched on this platform
    pub fn command(&self) -> &str {
        PlatformCommands::instance().get_command(&self.binary)
    }

    /// Check that the engine can be launched
    pub async fn is_available(&self) -> bool {
        PlatformCommands::instance()
            .is_command_available(&self.binary)
            .await
    }

    fn build_command(&self, job: &EncodeJob) -> Command {
        let mut cmd = Command::new(self.command());
        cmd.arg("--preset")
            .arg(&job.preset)
            .arg("-i")
            .arg(&job.input)
            .arg("-o")
            .arg(&job.output)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

impl TranscodeEngine for HandBrakeEngine {
    fn spawn(&self, job: EncodeJob) -> Result<mpsc::UnboundedReceiver<EngineEvent>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut cmd = self.build_command(&job);
        let program = self.command().to_string();

        tokio::spawn(async move {
            debug!("Spawning {} for {}", program, job.input.display());

            let mut child = match cmd.spawn() {
                Ok(child) => child,
                Err(e) => {
                    let _ = tx.send(EngineEvent::Error(format!("Failed to execute {}: {}", program, e)));
                    let _ = tx.send(EngineEvent::Complete { output: String::new() });
                    return;
                }
            };

            let stderr = child.stderr.take();
            let stderr_task = tokio::spawn(async move {
                let mut captured = String::new();
                if let Some(mut stderr) = stderr {
                    let _ = stderr.read_to_string(&mut captured).await;
                }
                captured
            });

            let mut output = String::new();
            if let Some(stdout) = child.stdout.take() {
                let mut reader = BufReader::new(stdout);
                let mut parser = ProgressParser::default();
                let mut segment = Vec::new();

                loop {
                    segment.clear();
                    match read_segment(&mut reader, &mut segment).await {
                        Ok(0) => break,
                        Ok(_) => {}
                        Err(e) => {
                            debug!("Stopped reading engine output: {}", e);
                            break;
                        }
                    }

                    let line = String::from_utf8_lossy(&segment);
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }

                    match parser.parse(line) {
                        Some(progress) => {
                            if parser.take_begin() {
                                let _ = tx.send(EngineEvent::Begin);
                            }
                            let _ = tx.send(EngineEvent::Progress(progress));
                        }
                        None => {
                            output.push_str(line);
                            output.push('\n');
                        }
                    }
                }
            }

            let status = child.wait().await;
            output.push_str(&stderr_task.await.unwrap_or_default());

            match status {
                Ok(status) if status.success() => {}
                Ok(status) => {
                    let _ = tx.send(EngineEvent::Error(format!("{} exited with {}", program, status)));
                }
                Err(e) => {
                    let _ = tx.send(EngineEvent::Error(format!("Failed to wait for {}: {}", program, e)));
                }
            }

            let _ = tx.send(EngineEvent::Complete { output });
        });

        Ok(rx)
    }
}

/// Read up to the next `\r` or `\n`, returning the number of bytes consumed
async fn read_segment<R: AsyncBufRead + Unpin>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<usize> {
    let mut consumed = 0;
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(consumed);
        }

        match available.iter().position(|b| *b == b'\r' || *b == b'\n') {
            Some(i) => {
                buf.extend_from_slice(&available[..i]);
                reader.consume(i + 1);
                return Ok(consumed + i + 1);
            }
            None => {
                let len = available.len();
                buf.extend_from_slice(available);
                reader.consume(len);
                consumed += len;
            }
        }
    }
}

fn progress_regex() -> &'static Regex {
    static PROGRESS: OnceLock<Regex> = OnceLock::new();
    PROGRESS.get_or_init(|| {
        Regex::new(
            r"^(?P<task>\w+): task \d+ of \d+, (?P<percent>[\d.]+) %(?: \((?P<fps>[\d.]+) fps, avg (?P<avg>[\d.]+) fps, ETA (?P<eta>[\dhms]+)\))?",
        )
        .expect("progress pattern is valid")
    })
}

/// Turns HandBrakeCLI status lines into progress samples
#[derive(Debug, Default)]
pub struct ProgressParser {
    last_percent: f64,
    began: bool,
    begin_pending: bool,
}

impl ProgressParser {
    pub fn parse(&mut self, line: &str) -> Option<EncodeProgress> {
        if let Some(caps) = progress_regex().captures(line) {
            let number = |name: &str| {
                caps.name(name)
                    .and_then(|m| m.as_str().parse::<f64>().ok())
                    .unwrap_or(0.0)
            };

            let progress = EncodeProgress {
                task: caps["task"].to_string(),
                percent_complete: number("percent"),
                fps: number("fps"),
                avg_fps: number("avg"),
                eta: caps.name("eta").map(|m| m.as_str().to_string()).unwrap_or_default(),
            };
            self.last_percent = progress.percent_complete;
            self.mark_started();
            return Some(progress);
        }

        if line.starts_with("Muxing:") {
            self.mark_started();
            return Some(EncodeProgress {
                task: "Muxing".to_string(),
                percent_complete: self.last_percent,
                fps: 0.0,
                avg_fps: 0.0,
                eta: String::new(),
            });
        }

        None
    }

    /// True exactly once, right after the first progress line
    pub fn take_begin(&mut self) -> bool {
        std::mem::take(&mut self.begin_pending)
    }

    fn mark_started(&mut self) {
        if !self.began {
            self.began = true;
            self.begin_pending = true;
        }
    }
}

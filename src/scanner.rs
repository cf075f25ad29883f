//! # Directory Scanner Module
//!
//! Questo modulo gestisce la discovery dei file da convertire.
//!
//! ## Responsabilità:
//! - Definisce `FileEntry`, il record di un file scoperto con i suoi metadata
//! - Scansione (opzionalmente ricorsiva) di una directory radice
//! - Estrazione di nome base ed estensione dal filename
//!
//! ## Ordine dei risultati:
//! La coda prodotta è un appiattimento depth-first in pre-ordine: i file di
//! una sottodirectory vengono inseriti nel punto in cui la sottodirectory
//! compare nel listing del padre, prima dei fratelli successivi. Non viene
//! applicato nessun ordinamento oltre a quello del listing del filesystem.
//!
//! ## Errori tollerati:
//! - File spariti o non leggibili tra listing e stat: saltati
//! - Directory non listabili: contributo vuoto
//! - Filename senza estensione estraibile (`README`, `.bashrc`, `video.`): saltati
//!
//! ## Esempio:
//! ```rust,ignore
//! let queue = Scanner::scan(Some(Path::new("/media/videos")), true);
//! for entry in &queue {
//!     println!("{} ({})", entry.absolute_path.display(), entry.extension);
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;
use walkdir::WalkDir;

/// Filesystem attributes captured at discovery time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub size: u64,
    pub modified: Option<SystemTime>,
    pub accessed: Option<SystemTime>,
    pub created: Option<SystemTime>,
    pub readonly: bool,
    /// Inode number (unix only)
    pub inode: Option<u64>,
    /// Permission bits (unix only)
    pub mode: Option<u32>,
    /// Hard link count (unix only)
    pub nlink: Option<u64>,
}

impl From<&std::fs::Metadata> for FileMetadata {
    fn from(metadata: &std::fs::Metadata) -> Self {
        #[cfg(unix)]
        let (inode, mode, nlink) = {
            use std::os::unix::fs::MetadataExt;
            (Some(metadata.ino()), Some(metadata.mode()), Some(metadata.nlink()))
        };
        #[cfg(not(unix))]
        let (inode, mode, nlink) = (None, None, None);

        Self {
            size: metadata.len(),
            modified: metadata.modified().ok(),
            accessed: metadata.accessed().ok(),
            created: metadata.created().ok(),
            readonly: metadata.permissions().readonly(),
            inode,
            mode,
            nlink,
        }
    }
}

/// One discovered plain file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub absolute_path: PathBuf,
    pub parent_directory: PathBuf,
    /// Name including extension
    pub filename: String,
    /// Filename without its final extension
    pub base_name: String,
    /// Final dot-delimited suffix, case preserved
    pub extension: String,
    pub metadata: FileMetadata,
}

impl FileEntry {
    /// Build an entry from an absolute path, `None` if the name has no usable extension
    pub fn new(absolute_path: PathBuf, metadata: FileMetadata) -> Option<Self> {
        let filename = absolute_path.file_name()?.to_str()?.to_string();
        let (base_name, extension) = split_name(&filename)?;
        let (base_name, extension) = (base_name.to_string(), extension.to_string());
        let parent_directory = absolute_path.parent()?.to_path_buf();

        Some(Self {
            absolute_path,
            parent_directory,
            filename,
            base_name,
            extension,
            metadata,
        })
    }

    /// `parent_directory/base_name.<target_extension>`
    pub fn destination(&self, target_extension: &str) -> PathBuf {
        self.parent_directory
            .join(format!("{}.{}", self.base_name, target_extension))
    }
}

/// Split a filename into `(name, extension)` at the last dot.
///
/// Both halves must be non-empty, so `.hidden`, `noext` and `trailing.` yield `None`.
pub fn split_name(filename: &str) -> Option<(&str, &str)> {
    match filename.rsplit_once('.') {
        Some((name, ext)) if !name.is_empty() && !ext.is_empty() => Some((name, ext)),
        _ => None,
    }
}

/// Discovers files below a root directory
pub struct Scanner;

impl Scanner {
    /// Enumerate `path` (current directory if `None`) into an ordered queue
    pub fn scan(path: Option<&Path>, recursive: bool) -> Vec<FileEntry> {
        let root = path.unwrap_or_else(|| Path::new("."));

        let root = match root.canonicalize() {
            Ok(root) => root,
            Err(e) => {
                debug!("Cannot resolve {}: {}", root.display(), e);
                return Vec::new();
            }
        };

        let mut walker = WalkDir::new(&root).min_depth(1).follow_links(true);
        if !recursive {
            walker = walker.max_depth(1);
        }

        let mut files = Vec::new();

        for entry in walker.into_iter() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(metadata) => FileMetadata::from(&metadata),
                Err(e) => {
                    debug!("Skipping {}: {}", entry.path().display(), e);
                    continue;
                }
            };

            match FileEntry::new(entry.path().to_path_buf(), metadata) {
                Some(file) => files.push(file),
                None => debug!("Skipping file without extension: {}", entry.path().display()),
            }
        }

        debug!("Discovered {} files under {}", files.len(), root.display());
        files
    }
}

//! # Extension Filter
//!
//! Decide se un file è idoneo alla conversione confrontando la sua estensione
//! con la allow-list configurata (`--extensions`), senza distinzione tra
//! maiuscole e minuscole.

/// Parsed allow-list of source extensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionFilter {
    extensions: Vec<String>,
}

impl ExtensionFilter {
    /// Parse a comma separated list, trimming whitespace and dropping empty tokens
    pub fn parse(allow_list: &str) -> Self {
        let extensions = allow_list
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect();
        Self { extensions }
    }

    pub fn is_eligible(&self, extension: &str) -> bool {
        self.extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(extension))
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

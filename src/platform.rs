//! # Platform-specific utilities
//!
//! Questo modulo centralizza la logica per la gestione cross-platform del
//! motore di transcodifica esterno: nome dell'eseguibile per sistema operativo
//! e verifica della sua presenza prima di una esecuzione con `--commit`.

use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

/// Platform-specific command manager
pub struct PlatformCommands {
    commands: HashMap<&'static str, &'static str>,
    which_command: &'static str,
}

impl PlatformCommands {
    /// Get the singleton instance
    pub fn instance() -> &'static Self {
        static INSTANCE: OnceLock<PlatformCommands> = OnceLock::new();
        INSTANCE.get_or_init(Self::new)
    }

    fn new() -> Self {
        let mut commands = HashMap::new();
        let which_command = if cfg!(windows) {
            commands.insert("HandBrakeCLI", "HandBrakeCLI.exe");
            "where"
        } else {
            commands.insert("HandBrakeCLI", "HandBrakeCLI");
            "which"
        };

        Self {
            commands,
            which_command,
        }
    }

    /// Get the platform-specific command name
    pub fn get_command<'a>(&self, base_name: &'a str) -> &'a str {
        self.commands.get(base_name).copied().unwrap_or(base_name)
    }

    /// Get the command used to check if a program exists
    pub fn which_command(&self) -> &str {
        self.which_command
    }

    /// Check if a command is available on the system.
    ///
    /// Names containing a path separator are checked directly on disk.
    pub async fn is_command_available(&self, base_name: &str) -> bool {
        let command_name = self.get_command(base_name);

        if command_name.contains(std::path::MAIN_SEPARATOR) || command_name.contains('/') {
            return Path::new(command_name).is_file();
        }

        let result = tokio::process::Command::new(self.which_command())
            .arg(command_name)
            .output()
            .await;

        match result {
            Ok(output) => output.status.success(),
            Err(_) => false,
        }
    }
}

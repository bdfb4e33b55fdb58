//! Non-PV activations: related displays and shell commands.

use bitflags::bitflags;
use core_model::{RelatedDisplayConfig, RelatedDisplayMode, ShellCommandConfig};
use tracing::{info, warn};

bitflags! {
    /// Keyboard modifiers active at activation time.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ActivationModifiers: u8 {
        const CTRL  = 0b01;
        const SHIFT = 0b10;
    }
}

/// What a related-display activation asks the window layer to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayRequest {
    pub display_file: String,
    /// Macro substitutions in `NAME=value,...` form.
    pub args: String,
    pub mode: RelatedDisplayMode,
}

/// Related displays never write PVs; an activation resolves to a
/// request the window layer executes.
pub struct RelatedDisplayRuntime {
    config: RelatedDisplayConfig,
}

impl RelatedDisplayRuntime {
    pub fn new(config: RelatedDisplayConfig) -> Self {
        Self { config }
    }

    pub fn entry_count(&self) -> usize {
        self.config.entries.len()
    }

    /// Resolve a button activation. Ctrl forces replace-current,
    /// shift forces a fresh window, otherwise the entry's configured
    /// mode stands.
    pub fn activate(
        &self,
        entry_index: usize,
        modifiers: ActivationModifiers,
    ) -> Option<DisplayRequest> {
        let entry = self.config.entries.get(entry_index)?;
        if entry.display_file.trim().is_empty() {
            return None;
        }
        let mode = if modifiers.contains(ActivationModifiers::CTRL) {
            RelatedDisplayMode::Replace
        } else if modifiers.contains(ActivationModifiers::SHIFT) {
            RelatedDisplayMode::NewWindow
        } else {
            entry.mode
        };
        Some(DisplayRequest {
            display_file: entry.display_file.trim().to_string(),
            args: entry.args.clone(),
            mode,
        })
    }
}

/// Shell commands spawn a detached subprocess; there is no PV
/// interaction and no tracking of the child beyond the spawn result.
pub struct ShellCommandRuntime {
    config: ShellCommandConfig,
}

impl ShellCommandRuntime {
    pub fn new(config: ShellCommandConfig) -> Self {
        Self { config }
    }

    pub fn entry_count(&self) -> usize {
        self.config.entries.len()
    }

    /// Launch the configured command for `entry_index`. Returns
    /// whether a child was spawned.
    pub fn activate(&self, entry_index: usize) -> bool {
        let Some(entry) = self.config.entries.get(entry_index) else {
            return false;
        };
        let command_line = if entry.args.trim().is_empty() {
            entry.command.trim().to_string()
        } else {
            format!("{} {}", entry.command.trim(), entry.args.trim())
        };
        if command_line.is_empty() {
            return false;
        }
        match std::process::Command::new("/bin/sh")
            .arg("-c")
            .arg(&command_line)
            .spawn()
        {
            Ok(child) => {
                info!(target: "runtime.shell", command = %command_line, pid = child.id(),
                    "spawned shell command");
                true
            }
            Err(error) => {
                warn!(target: "runtime.shell", command = %command_line, %error,
                    "failed to spawn shell command");
                false
            }
        }
    }
}

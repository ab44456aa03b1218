use colored::*;

/// User-facing console output, handed to each component that talks to the
/// user. Diagnostics go through `log` instead.
#[derive(Debug, Clone, Copy)]
pub struct Reporter {
    enabled: bool,
}

impl Reporter {
    pub fn new() -> Self {
        Self { enabled: true }
    }

    /// Swallows everything; used by tests.
    pub fn quiet() -> Self {
        Self { enabled: false }
    }

    pub fn command(&self, command: &str) {
        if self.enabled {
            println!("{}", command.blue());
        }
    }

    pub fn resolved(&self, template: &str, resolved: &str) {
        if !self.enabled {
            return;
        }
        println!("{}", template.blue());
        println!("{} {}", "=>".green().bold(), resolved.bright_white());
    }

    pub fn rule(&self) {
        if self.enabled {
            println!("{}", "─".repeat(50).bright_black());
        }
    }

    pub fn success(&self, message: &str) {
        if self.enabled {
            println!("{} {}", "✓".green().bold(), message);
        }
    }

    pub fn failure(&self, message: &str) {
        if self.enabled {
            println!("{} {}", "✗".red().bold(), message);
        }
    }

    pub fn notice(&self, message: &str) {
        if self.enabled {
            println!("{} {}", "⚠".yellow().bold(), message);
        }
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}

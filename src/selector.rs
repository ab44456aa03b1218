use dialoguer::{theme::ColorfulTheme, FuzzySelect};
use log::debug;
use std::fs::{self, File};
use std::io;
use std::path::PathBuf;
use std::process::Stdio;

use crate::config::ConfigSet;
use crate::error::Error;
use crate::executor::shell;
use crate::report::Reporter;
use crate::Result;

/// `tool` value that keeps the pick inside this process.
pub const BUILTIN_TOOL: &str = "builtin";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Picker {
    /// A fuzzy finder fed rows on stdin, answering with one row on stdout.
    External { tool: String, flags: String },
    Builtin,
}

impl Picker {
    pub fn from_config(config: &ConfigSet) -> Self {
        match config.tool() {
            BUILTIN_TOOL => Picker::Builtin,
            tool => Picker::External {
                tool: tool.to_string(),
                flags: config.flags().to_string(),
            },
        }
    }
}

/// One `title<pad>:command` row per listed entry, titles padded to the
/// widest title plus two spaces.
pub fn format_rows(config: &ConfigSet) -> Vec<String> {
    let listed: Vec<_> = config
        .commands()
        .filter(|entry| {
            let has_command = entry.command.is_some();
            if !has_command {
                debug!("[{}] has no command, not listed", entry.title);
            }
            has_command
        })
        .collect();

    let width = listed
        .iter()
        .map(|entry| entry.title.chars().count())
        .max()
        .unwrap_or(0)
        + 2;

    listed
        .iter()
        .map(|entry| format!("{:<width$}:{}", entry.title, entry.command_str().trim()))
        .collect()
}

/// Title part of a picked row, or `None` when the row is unusable.
pub fn parse_selection(row: &str) -> Option<String> {
    let (title, _) = row.trim().split_once(':')?;
    let title = title.trim();
    (!title.is_empty()).then(|| title.to_string())
}

pub struct Selector {
    picker: Picker,
    reporter: Reporter,
    scratch_root: Option<PathBuf>,
}

impl Selector {
    pub fn new(picker: Picker, reporter: Reporter) -> Self {
        Self {
            picker,
            reporter,
            scratch_root: None,
        }
    }

    /// Create the picker's temp directory under `root` instead of the system default.
    #[cfg(test)]
    pub(crate) fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    /// Let the user choose a title. `Ok(None)` means the pick was cancelled.
    pub fn pick_title(&self, config: &ConfigSet) -> Result<Option<String>> {
        let rows = format_rows(config);
        if rows.is_empty() {
            self.reporter.notice("No commands available.");
            return Ok(None);
        }

        let picked = match &self.picker {
            Picker::External { tool, flags } => self.run_external(&rows, tool, flags)?,
            Picker::Builtin => Self::run_builtin(&rows)?,
        };

        match &picked {
            Some(title) => debug!("picked `{title}`"),
            None => debug!("nothing picked"),
        }
        Ok(picked)
    }

    fn run_external(&self, rows: &[String], tool: &str, flags: &str) -> Result<Option<String>> {
        let picker_error = |source: io::Error| Error::Picker {
            tool: tool.to_string(),
            source,
        };

        // Removed when dropped, whichever way this function returns.
        let mut builder = tempfile::Builder::new();
        builder.prefix("hcmd");
        let workdir = match &self.scratch_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(picker_error)?;

        let input_path = workdir.path().join("command.txt");
        let output_path = workdir.path().join("output.txt");

        let mut contents = rows.join("\n");
        contents.push('\n');
        fs::write(&input_path, contents).map_err(picker_error)?;

        let input = File::open(&input_path).map_err(picker_error)?;
        let output = File::create(&output_path).map_err(picker_error)?;

        let command_line = format!("{tool} {flags}");
        debug!("running picker: {command_line}");
        let status = shell(command_line.trim_end())
            .stdin(Stdio::from(input))
            .stdout(Stdio::from(output))
            .stderr(Stdio::inherit())
            .status()
            .map_err(picker_error)?;

        if !status.success() {
            debug!("picker exited with {status}");
            return Ok(None);
        }

        let chosen = fs::read_to_string(&output_path).map_err(picker_error)?;
        Ok(parse_selection(&chosen))
    }

    fn run_builtin(rows: &[String]) -> Result<Option<String>> {
        let selection = FuzzySelect::with_theme(&ColorfulTheme::default())
            .with_prompt("Search and select command")
            .default(0)
            .items(rows)
            .interact_opt()?;

        Ok(selection.and_then(|index| parse_selection(&rows[index])))
    }
}

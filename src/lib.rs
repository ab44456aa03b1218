//! # hcmd - Command Launcher
//!
//! Named shortcuts to shell command templates, picked from a fuzzy finder or
//! named on the command line, with `$(?name[:default])` parameters filled in
//! before the command runs.
//!
//! ## Features
//!
//! - INI-style config with per-field merging across include files
//! - Parameters bound by name, by position, or by prompting
//! - External picker (fzf by default) or a built-in fuzzy selector
//!
//! ## Usage
//!
//! ```rust
//! use hcmd::{Bindings, ConfigSet, ScriptedPrompt, VariableResolver};
//! # fn main() -> hcmd::Result<()> {
//! let config = ConfigSet::parse("[greet]\ncommand = echo hi $(?who:world)\n")?;
//! let template = config.get("greet").unwrap().command_str();
//!
//! let mut prompt = ScriptedPrompt::default();
//! let resolution = VariableResolver::new(&mut prompt)
//!     .resolve(template, &Bindings::new().named("who", "alice"))?;
//! assert_eq!(resolution.command, "echo hi alice");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod paths;
pub mod report;
pub mod selector;
pub mod variables;

pub use config::{ConfigSet, ConfigStore, Entry};
pub use dispatcher::{Dispatch, Dispatcher, Request, Run};
pub use error::Error;
pub use executor::{CommandExecutor, Execute, Outcome};
pub use report::Reporter;
pub use selector::{Picker, Selector};
pub use variables::{
    Binding, Bindings, Prompt, Resolution, ScriptedPrompt, TerminalPrompt, Variable,
    VariableResolver,
};

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

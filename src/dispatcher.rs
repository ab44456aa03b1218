use log::{debug, warn};

use crate::config::ConfigSet;
use crate::error::Error;
use crate::executor::{Execute, Outcome};
use crate::report::Reporter;
use crate::selector::{Picker, Selector};
use crate::variables::{Bindings, Prompt, Resolution, VariableResolver};
use crate::Result;

/// What the caller asked for: a named title, or an interactive pick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Title { title: String, bindings: Bindings },
    Pick,
}

impl Request {
    pub fn title(title: &str, bindings: Bindings) -> Self {
        Request::Title {
            title: title.to_string(),
            bindings,
        }
    }
}

/// What happened to the resolved command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Run {
    DryRun,
    Completed(Outcome),
    /// The shell could not be started. Logged, not raised.
    SpawnFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    NoSelection,
    Finished {
        title: String,
        resolution: Resolution,
        run: Run,
    },
}

enum State {
    Idle(Request),
    EntryLookup {
        title: String,
        bindings: Bindings,
    },
    VariableResolution {
        title: String,
        template: String,
        bindings: Bindings,
    },
    Execution {
        title: String,
        resolution: Resolution,
    },
    Done(Dispatch),
}

/// Owns the loaded config for one run and drives a request to completion.
pub struct Dispatcher {
    config: ConfigSet,
    selector: Selector,
    reporter: Reporter,
    dry_run: bool,
}

impl Dispatcher {
    pub fn new(config: ConfigSet, reporter: Reporter) -> Self {
        let selector = Selector::new(Picker::from_config(&config), reporter);
        Self {
            config,
            selector,
            reporter,
            dry_run: false,
        }
    }

    pub fn with_selector(mut self, selector: Selector) -> Self {
        self.selector = selector;
        self
    }

    /// Resolve and echo the command but never hand it to the shell.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn config(&self) -> &ConfigSet {
        &self.config
    }

    /// Errors cover picking, lookup and resolution only; the launched
    /// command's own exit status is returned in [`Run`], never as `Err`.
    pub fn dispatch(
        &self,
        request: Request,
        prompt: &mut dyn Prompt,
        executor: &dyn Execute,
    ) -> Result<Dispatch> {
        let mut state = State::Idle(request);

        loop {
            state = match state {
                State::Idle(Request::Title { title, bindings }) => {
                    State::EntryLookup { title, bindings }
                }
                State::Idle(Request::Pick) => match self.selector.pick_title(&self.config)? {
                    Some(title) => State::EntryLookup {
                        title,
                        bindings: Bindings::new(),
                    },
                    None => State::Done(Dispatch::NoSelection),
                },
                State::EntryLookup { title, bindings } => {
                    let template = self.lookup(&title)?.to_string();
                    State::VariableResolution {
                        title,
                        template,
                        bindings,
                    }
                }
                State::VariableResolution {
                    title,
                    template,
                    bindings,
                } => {
                    let resolution =
                        VariableResolver::new(&mut *prompt).resolve(&template, &bindings)?;
                    if resolution.command != template {
                        self.reporter.resolved(&template, &resolution.command);
                    } else {
                        self.reporter.command(&resolution.command);
                    }

                    if self.dry_run {
                        State::Done(Dispatch::Finished {
                            title,
                            resolution,
                            run: Run::DryRun,
                        })
                    } else {
                        State::Execution { title, resolution }
                    }
                }
                State::Execution { title, resolution } => {
                    let run = match executor.execute(&resolution.command) {
                        Ok(outcome) => {
                            debug!("[{title}] finished: {outcome:?}");
                            Run::Completed(outcome)
                        }
                        Err(e) => {
                            warn!("[{title}] {e:#}");
                            self.reporter.failure(&format!("{e:#}"));
                            Run::SpawnFailed(format!("{e:#}"))
                        }
                    };
                    State::Done(Dispatch::Finished {
                        title,
                        resolution,
                        run,
                    })
                }
                State::Done(dispatch) => return Ok(dispatch),
            };
        }
    }

    /// Command template for a listed title. The settings entry and entries
    /// that never set `command` are not dispatchable.
    fn lookup(&self, title: &str) -> Result<&str> {
        self.config
            .get(title)
            .filter(|entry| !entry.is_settings())
            .and_then(|entry| entry.command.as_deref())
            .ok_or_else(|| Error::TitleNotFound(title.to_string()))
    }
}

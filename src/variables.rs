use dialoguer::{theme::ColorfulTheme, Input};
use indexmap::IndexMap;
use log::debug;
use std::collections::VecDeque;
use std::io::{self, BufRead, IsTerminal, Write};

use crate::Result;

pub const MARK_OPEN: &str = "$(?";
pub const MARK_CLOSE: char = ')';

/// A `$(?name[:default])` marker found in a command template.
///
/// Several markers may share a name (`$(?env:dev) ... $(?env)`); they form a
/// single variable and every literal is replaced by the same value. The
/// default and the prompt text come from the last occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub default: Option<String>,
    pub marker: String,
    markers: Vec<String>,
}

impl Variable {
    fn new(name: &str, default: Option<String>, marker: &str) -> Self {
        Self {
            name: name.to_string(),
            default,
            marker: marker.to_string(),
            markers: vec![marker.to_string()],
        }
    }

    fn observe(&mut self, default: Option<String>, marker: &str) {
        self.default = default;
        self.marker = marker.to_string();
        if !self.markers.iter().any(|m| m == marker) {
            self.markers.push(marker.to_string());
        }
    }

    pub fn default_value(&self) -> &str {
        self.default.as_deref().unwrap_or("")
    }

    fn substitute(&self, command: &str, value: &str) -> String {
        self.markers
            .iter()
            .fold(command.to_string(), |acc, marker| acc.replace(marker, value))
    }
}

/// Collect the variables of `template` keyed by name, in first-seen order.
/// An opening `$(?` with no closing `)` is left as plain text.
pub fn scan(template: &str) -> IndexMap<String, Variable> {
    let mut variables: IndexMap<String, Variable> = IndexMap::new();
    let mut rest = template;

    while let Some(start) = rest.find(MARK_OPEN) {
        let after = &rest[start + MARK_OPEN.len()..];
        let Some(end) = after.find(MARK_CLOSE) else {
            break;
        };

        let marker = &rest[start..start + MARK_OPEN.len() + end + 1];
        let interior = after[..end].trim();
        let (name, default) = match interior.split_once(':') {
            Some((name, default)) => (name.trim(), Some(default.trim().to_string())),
            None => (interior, None),
        };

        match variables.get_mut(name) {
            Some(variable) => variable.observe(default, marker),
            None => {
                variables.insert(name.to_string(), Variable::new(name, default, marker));
            }
        }
        rest = &after[end + 1..];
    }

    variables
}

/// A caller-supplied value, addressed either by variable name or by the
/// zero-based position of a bare argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Named { name: String, value: String },
    Positional { index: usize, value: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings(Vec<Binding>);

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// `key=value` becomes a named binding; anything else is positional,
    /// numbered among the bare arguments only.
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut bindings = Self::new();
        let mut index = 0;

        for arg in args {
            let arg = arg.as_ref();
            match arg.split_once('=') {
                Some((name, value))
                    if !name.is_empty() && !name.contains(char::is_whitespace) =>
                {
                    bindings = bindings.named(name, value);
                }
                _ => {
                    bindings.0.push(Binding::Positional {
                        index,
                        value: arg.to_string(),
                    });
                    index += 1;
                }
            }
        }

        bindings
    }

    pub fn named(mut self, name: &str, value: &str) -> Self {
        self.0.push(Binding::Named {
            name: name.to_string(),
            value: value.to_string(),
        });
        self
    }

    pub fn positional(mut self, index: usize, value: &str) -> Self {
        self.0.push(Binding::Positional {
            index,
            value: value.to_string(),
        });
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.0.iter()
    }
}

impl FromIterator<Binding> for Bindings {
    fn from_iter<T: IntoIterator<Item = Binding>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Source of answers for variables nobody bound.
pub trait Prompt {
    fn ask(&mut self, variable: &Variable) -> Result<String>;
}

/// Asks on the terminal, or reads a plain line when stdin is not a tty.
#[derive(Debug, Default)]
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn ask(&mut self, variable: &Variable) -> Result<String> {
        let label = format!("Input argument ({})", variable.marker);

        if io::stdin().is_terminal() {
            let value = Input::<String>::with_theme(&ColorfulTheme::default())
                .with_prompt(label)
                .allow_empty(true)
                .interact_text()?;
            return Ok(value);
        }

        eprint!("{label}: ");
        io::stderr().flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

/// Replays canned answers in order; runs dry as empty responses.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: VecDeque<String>,
    asked: Vec<String>,
}

impl ScriptedPrompt {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            asked: Vec::new(),
        }
    }

    /// Marker text of every question asked so far.
    pub fn asked(&self) -> &[String] {
        &self.asked
    }
}

impl Prompt for ScriptedPrompt {
    fn ask(&mut self, variable: &Variable) -> Result<String> {
        self.asked.push(variable.marker.clone());
        Ok(self.answers.pop_front().unwrap_or_default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub command: String,
    pub prompts: usize,
}

impl Resolution {
    pub fn interacted(&self) -> bool {
        self.prompts > 0
    }
}

/// Fills markers by name, then by position, then by asking.
pub struct VariableResolver<'a, P: Prompt + ?Sized> {
    prompt: &'a mut P,
}

impl<'a, P: Prompt + ?Sized> VariableResolver<'a, P> {
    pub fn new(prompt: &'a mut P) -> Self {
        Self { prompt }
    }

    pub fn resolve(&mut self, template: &str, bindings: &Bindings) -> Result<Resolution> {
        let mut pending = scan(template);
        let mut command = template.to_string();

        // A repeated name keeps its last value.
        let mut named: IndexMap<&str, &str> = IndexMap::new();
        let mut positional: Vec<(usize, &str)> = Vec::new();
        for binding in bindings.iter() {
            match binding {
                Binding::Named { name, value } => {
                    named.insert(name.as_str(), value.as_str());
                }
                Binding::Positional { index, value } => positional.push((*index, value.as_str())),
            }
        }

        for (name, value) in named {
            match pending.shift_remove(name) {
                Some(variable) => command = variable.substitute(&command, value),
                None => debug!("binding `{name}` matches no marker"),
            }
        }

        positional.sort_by_key(|(index, _)| *index);
        for (index, value) in positional {
            let Some((_, variable)) = pending.shift_remove_index(0) else {
                debug!("positional argument #{index} left over");
                break;
            };
            debug!("positional argument #{index} binds `{}`", variable.name);
            command = variable.substitute(&command, value);
        }

        let mut prompts = 0;
        for (_, variable) in pending.drain(..) {
            let answer = self.prompt.ask(&variable)?;
            prompts += 1;
            let value = if answer.is_empty() {
                variable.default_value()
            } else {
                answer.as_str()
            };
            command = variable.substitute(&command, value);
        }

        Ok(Resolution { command, prompts })
    }
}

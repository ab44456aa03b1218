//! Path helpers shared by the config loader and the CLI.

use std::env;
use std::path::PathBuf;

/// Expand `$NAME` / `${NAME}` from the environment, then a leading `~`.
///
/// Unset variables are left untouched, matching what a shell user would
/// expect to see in an error message.
pub fn expand(raw: &str) -> PathBuf {
    expand_home(&expand_env(raw))
}

pub fn expand_env(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        let (name, consumed) = if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            }
        } else {
            let end = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            (&after[..end], end)
        };

        match is_var_name(name).then(|| env::var(name).ok()).flatten() {
            Some(value) => out.push_str(&value),
            None => out.push_str(&rest[pos..pos + 1 + consumed]),
        }
        rest = &after[consumed..];
    }

    out.push_str(rest);
    out
}

fn is_var_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn expand_home(path: &str) -> PathBuf {
    let tail = if path == "~" {
        Some("")
    } else {
        path.strip_prefix("~/")
    };

    match (tail, dirs::home_dir()) {
        (Some(tail), Some(home)) if tail.is_empty() => home,
        (Some(tail), Some(home)) => home.join(tail),
        _ => PathBuf::from(path),
    }
}

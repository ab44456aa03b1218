use encoding_rs::{Encoding, GBK, UTF_8, WINDOWS_1252};
use indexmap::IndexMap;
use log::debug;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::paths;
use crate::Result;

/// Reserved section holding picker and include settings. Never listed.
pub const SETTINGS_TITLE: &str = "__SETTINGS__";

pub const DEFAULT_TOOL: &str = "fzf";
pub const DEFAULT_FLAGS: &str = "--nth=1 --reverse +s --inline-info --height 35% --no-mouse";

/// Environment variable consulted when no `--file` is given.
pub const CONFIG_ENV: &str = "HCMD_CONFIG";

/// One `[title]` section. Fields stay `None` until a file assigns them, so a
/// later declaration only overrides what it actually sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entry {
    pub title: String,
    pub command: Option<String>,
    pub tool: Option<String>,
    pub flags: Option<String>,
    pub includes: Option<Vec<PathBuf>>,
}

impl Entry {
    fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Self::default()
        }
    }

    pub fn command_str(&self) -> &str {
        self.command.as_deref().unwrap_or("")
    }

    pub fn is_settings(&self) -> bool {
        self.title == SETTINGS_TITLE
    }
}

/// Every title merged from the root file and its includes, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigSet {
    entries: IndexMap<String, Entry>,
}

impl ConfigSet {
    /// Parse a single in-memory document. Includes are recorded but not followed.
    pub fn parse(text: &str) -> Result<Self> {
        let mut config = Self::default();
        config.merge_text(text, Path::new("<inline>"))?;
        Ok(config)
    }

    pub fn get(&self, title: &str) -> Option<&Entry> {
        self.entries.get(title)
    }

    pub fn settings(&self) -> Option<&Entry> {
        self.entries.get(SETTINGS_TITLE)
    }

    /// User-visible entries, settings excluded.
    pub fn commands(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values().filter(|entry| !entry.is_settings())
    }

    pub fn tool(&self) -> &str {
        self.settings()
            .and_then(|s| s.tool.as_deref())
            .unwrap_or(DEFAULT_TOOL)
    }

    pub fn flags(&self) -> &str {
        self.settings()
            .and_then(|s| s.flags.as_deref())
            .unwrap_or(DEFAULT_FLAGS)
    }

    fn section(&mut self, title: &str) -> &mut Entry {
        self.entries
            .entry(title.to_string())
            .or_insert_with(|| Entry::new(title))
    }

    fn merge_file(&mut self, path: &Path) -> Result<()> {
        let text = read_text(path)?;
        self.merge_text(&text, path)
    }

    fn merge_text(&mut self, text: &str, file: &Path) -> Result<()> {
        let base = file.parent().unwrap_or_else(|| Path::new(""));
        let mut section = SETTINGS_TITLE.to_string();

        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(header) = line.strip_prefix('[') {
                let title = header
                    .strip_suffix(']')
                    .map(str::trim)
                    .filter(|title| !title.is_empty())
                    .ok_or_else(|| Error::ConfigSyntax {
                        file: file.to_path_buf(),
                        line: index + 1,
                    })?;
                section = title.to_string();
                self.section(&section);
                continue;
            }

            let Some((field, value)) = line.split_once('=') else {
                debug!("{}:{}: skipping line without `=`", file.display(), index + 1);
                continue;
            };
            let value = value.trim();
            let entry = self.section(&section);

            match field.trim() {
                "command" => entry.command = Some(value.to_string()),
                "tool" => entry.tool = Some(value.to_string()),
                "flags" => entry.flags = Some(value.to_string()),
                "includes" => {
                    entry.includes = Some(
                        value
                            .split(',')
                            .map(str::trim)
                            .filter(|p| !p.is_empty())
                            .map(|p| base.join(paths::expand(p)))
                            .collect(),
                    )
                }
                other => debug!(
                    "{}:{}: ignoring unknown field `{other}`",
                    file.display(),
                    index + 1
                ),
            }
        }

        Ok(())
    }
}

/// Loads a root config file and its includes into a [`ConfigSet`].
pub struct ConfigStore {
    root: PathBuf,
}

impl ConfigStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Pick the config path from an explicit value, `$HCMD_CONFIG`, or the
    /// platform config directory, expanding `$VAR` and `~` in the first two.
    pub fn locate(explicit: Option<&str>) -> Self {
        let root = match explicit.map(str::to_string).or_else(|| env::var(CONFIG_ENV).ok()) {
            Some(raw) => paths::expand(&raw),
            None => dirs::config_dir()
                .map(|dir| dir.join("h_command").join("config.ini"))
                .unwrap_or_else(|| paths::expand("~/.config/h_command/config.ini")),
        };
        Self::new(root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn load(&self) -> Result<ConfigSet> {
        let mut config = ConfigSet::default();
        config.merge_file(&self.root)?;

        // Only the root's list is followed; includes inside includes are not chased.
        let includes = config
            .settings()
            .and_then(|s| s.includes.clone())
            .unwrap_or_default();
        for include in &includes {
            debug!("merging include {}", include.display());
            config.merge_file(include)?;
        }

        debug!(
            "loaded {} commands from {} (+{} includes)",
            config.commands().count(),
            self.root.display(),
            includes.len()
        );
        Ok(config)
    }
}

fn read_text(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(Error::ConfigNotFound(path.to_path_buf()));
    }

    let bytes = fs::read(path).map_err(|source| Error::ConfigUnreadable {
        path: path.to_path_buf(),
        source,
    })?;

    decode(&bytes).ok_or_else(|| Error::ConfigUnreadable {
        path: path.to_path_buf(),
        source: io::Error::new(io::ErrorKind::InvalidData, "no supported text encoding"),
    })
}

fn decode(bytes: &[u8]) -> Option<String> {
    // Latin-1 accepts any byte sequence, so it goes last.
    let encodings: [&'static Encoding; 3] = [UTF_8, GBK, WINDOWS_1252];
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    encodings.iter().find_map(|encoding| {
        let text = encoding.decode_without_bom_handling_and_without_replacement(bytes)?;
        debug!("decoded config as {}", encoding.name());
        Some(text.into_owned())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_parse_sections_and_comments() {
        let config = ConfigSet::parse(
            "tool = sk\n\
             # comment\n\
             ; another\n\
             \n\
             [greet]\n\
             command = echo hi $(?who:world)\n\
             color = red\n\
             [ list ]\n\
             command=ls -la\n",
        )
        .unwrap();

        assert_eq!(config.tool(), "sk");
        assert_eq!(config.flags(), DEFAULT_FLAGS);
        assert_eq!(
            config.get("greet").unwrap().command_str(),
            "echo hi $(?who:world)"
        );
        assert_eq!(config.get("list").unwrap().command_str(), "ls -la");

        let titles: Vec<_> = config.commands().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, ["greet", "list"]);
    }

    #[test]
    fn test_value_split_on_first_equals() {
        let config = ConfigSet::parse("[env]\ncommand = FOO=bar env | grep FOO\n").unwrap();
        assert_eq!(config.get("env").unwrap().command_str(), "FOO=bar env | grep FOO");
    }

    #[test]
    fn test_redeclared_title_merges_per_field() {
        let config = ConfigSet::parse(
            "[a]\ncommand = one\ntool = x\n[b]\ncommand = two\n[a]\ncommand = three\n",
        )
        .unwrap();

        let a = config.get("a").unwrap();
        assert_eq!(a.command.as_deref(), Some("three"));
        assert_eq!(a.tool.as_deref(), Some("x"));
        let titles: Vec<_> = config.commands().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, ["a", "b"]);
    }

    #[test]
    fn test_unterminated_header_reports_line() {
        let err = ConfigSet::parse("[ok]\ncommand = x\n\n[broken\n").unwrap_err();
        match err {
            Error::ConfigSyntax { line, .. } => assert_eq!(line, 4),
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(
            ConfigSet::parse("[]\n"),
            Err(Error::ConfigSyntax { line: 1, .. })
        ));
    }

    #[test]
    fn test_missing_root_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let store = ConfigStore::new(temp_dir.path().join("nope.ini"));
        assert!(matches!(store.load(), Err(Error::ConfigNotFound(_))));
    }

    #[test]
    fn test_includes_merge_fields_in_order() {
        let temp_dir = TempDir::new().unwrap();
        write(&temp_dir, "a.ini", b"[deploy]\ncommand = make deploy\n[only-a]\ncommand = a\n");
        write(&temp_dir, "b.ini", b"[deploy]\nflags = -v\n[only-b]\ncommand = b\n");
        write(&temp_dir, "c.ini", b"[deploy]\ncommand = make deploy-v2\n");
        let root = write(
            &temp_dir,
            "root.ini",
            b"[__SETTINGS__]\nincludes = a.ini, b.ini ,c.ini\n[deploy]\ncommand = root\n",
        );

        let config = ConfigStore::new(root).load().unwrap();
        let deploy = config.get("deploy").unwrap();
        assert_eq!(deploy.command.as_deref(), Some("make deploy-v2"));
        assert_eq!(deploy.flags.as_deref(), Some("-v"));

        let titles: Vec<_> = config.commands().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, ["deploy", "only-a", "only-b"]);
    }

    #[test]
    fn test_include_paths_expand_env() {
        let temp_dir = TempDir::new().unwrap();
        let extra = write(&temp_dir, "extra.ini", b"[extra]\ncommand = true\n");
        env::set_var("HCMD_CONFIG_TEST_DIR", temp_dir.path());
        let root = write(
            &temp_dir,
            "root.ini",
            b"includes = $HCMD_CONFIG_TEST_DIR/extra.ini\n",
        );

        let config = ConfigStore::new(root).load().unwrap();
        assert_eq!(config.settings().unwrap().includes.as_ref().unwrap(), &[extra]);
        assert!(config.get("extra").is_some());
    }

    #[test]
    fn test_missing_include_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let root = write(&temp_dir, "root.ini", b"includes = gone.ini\n");
        match ConfigStore::new(root).load() {
            Err(Error::ConfigNotFound(path)) => assert!(path.ends_with("gone.ini")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_directory_root_is_unreadable() {
        let temp_dir = TempDir::new().unwrap();
        match ConfigStore::new(temp_dir.path()).load() {
            Err(Error::ConfigUnreadable { path, .. }) => assert_eq!(path, temp_dir.path()),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_encoding_fallback() {
        let temp_dir = TempDir::new().unwrap();
        let (gbk, _, _) = GBK.encode("[中文]\ncommand = echo 你好\n");
        let path = write(&temp_dir, "gbk.ini", &gbk);
        let config = ConfigStore::new(path).load().unwrap();
        assert_eq!(config.get("中文").unwrap().command_str(), "echo 你好");

        let path = write(&temp_dir, "bom.ini", b"\xEF\xBB\xBF[x]\ncommand = y\n");
        let config = ConfigStore::new(path).load().unwrap();
        assert_eq!(config.get("x").unwrap().command_str(), "y");
    }

    #[test]
    fn test_locate_prefers_explicit_path() {
        let store = ConfigStore::locate(Some("/tmp/hcmd-explicit.ini"));
        assert_eq!(store.root(), Path::new("/tmp/hcmd-explicit.ini"));
    }
}

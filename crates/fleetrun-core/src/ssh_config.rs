//! Read-only SSH client-config resolution
//!
//! Minimal parser for the subset of `~/.ssh/config` consulted while
//! building host specs: `Host` blocks with `HostName`, `User`, `Port`,
//! and `IdentityFile`. Matching follows OpenSSH semantics for the
//! supported subset: `*` and `?` wildcards in host patterns, and the
//! first obtained value wins per option.

use std::path::{Path, PathBuf};

use tracing::warn;

/// Per-alias connection parameters supplied by an external config
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostParams {
    /// Real hostname to connect to (may differ from the alias)
    pub hostname: Option<String>,
    /// Username
    pub user: Option<String>,
    /// Port
    pub port: Option<u16>,
    /// Identity file, `~` already expanded
    pub identity_file: Option<PathBuf>,
}

impl HostParams {
    fn merge_missing_from(&mut self, other: &HostParams) {
        if self.hostname.is_none() {
            self.hostname = other.hostname.clone();
        }
        if self.user.is_none() {
            self.user = other.user.clone();
        }
        if self.port.is_none() {
            self.port = other.port;
        }
        if self.identity_file.is_none() {
            self.identity_file = other.identity_file.clone();
        }
    }
}

/// Read-only source of per-alias connection parameters
pub trait ConfigResolver: Send + Sync {
    /// Look up parameters for one host alias; unknown aliases yield
    /// defaults
    fn lookup(&self, alias: &str) -> HostParams;
}

struct Block {
    patterns: Vec<String>,
    params: HostParams,
}

/// Parsed SSH client configuration file
#[derive(Default)]
pub struct SshConfigFile {
    blocks: Vec<Block>,
}

impl SshConfigFile {
    /// Empty configuration (every lookup yields defaults)
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load from a file; a missing or unreadable file yields an empty
    /// configuration, matching client behavior when no config exists
    #[must_use]
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content, home_dir().as_deref()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::empty(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not read ssh config");
                Self::empty()
            }
        }
    }

    /// Parse config text; `home` is used to expand `~` in identity paths
    #[must_use]
    pub fn parse(content: &str, home: Option<&Path>) -> Self {
        let mut blocks: Vec<Block> = Vec::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (key, value) = match split_keyword(line) {
                Some(kv) => kv,
                None => continue,
            };

            if key.eq_ignore_ascii_case("host") {
                blocks.push(Block {
                    patterns: value.split_whitespace().map(str::to_string).collect(),
                    params: HostParams::default(),
                });
                continue;
            }

            // Options before the first Host block apply to nothing we
            // support; skip them
            let Some(block) = blocks.last_mut() else {
                continue;
            };
            let params = &mut block.params;

            if key.eq_ignore_ascii_case("hostname") {
                params.hostname.get_or_insert_with(|| value.to_string());
            } else if key.eq_ignore_ascii_case("user") {
                params.user.get_or_insert_with(|| value.to_string());
            } else if key.eq_ignore_ascii_case("port") {
                if let Ok(port) = value.parse::<u16>() {
                    params.port.get_or_insert(port);
                }
            } else if key.eq_ignore_ascii_case("identityfile") {
                params
                    .identity_file
                    .get_or_insert_with(|| expand_tilde(value, home));
            }
        }

        Self { blocks }
    }
}

impl ConfigResolver for SshConfigFile {
    fn lookup(&self, alias: &str) -> HostParams {
        let mut resolved = HostParams::default();

        for block in &self.blocks {
            if block
                .patterns
                .iter()
                .any(|p| pattern_matches(p, alias))
            {
                resolved.merge_missing_from(&block.params);
            }
        }

        resolved
    }
}

/// Split `Key value` or `Key=value` into keyword and remainder
fn split_keyword(line: &str) -> Option<(&str, &str)> {
    let idx = line.find([' ', '\t', '='])?;
    let key = &line[..idx];
    let value = line[idx + 1..].trim().trim_matches('"');
    if value.is_empty() { None } else { Some((key, value)) }
}

/// Glob match with `*` and `?`, the wildcards OpenSSH host patterns use
fn pattern_matches(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    glob_match(&p, &t)
}

fn glob_match(p: &[char], t: &[char]) -> bool {
    match p.first() {
        None => t.is_empty(),
        Some('*') => {
            // '*' matches any run, including empty
            (0..=t.len()).any(|i| glob_match(&p[1..], &t[i..]))
        }
        Some('?') => !t.is_empty() && glob_match(&p[1..], &t[1..]),
        Some(c) => t.first() == Some(c) && glob_match(&p[1..], &t[1..]),
    }
}

fn expand_tilde(value: &str, home: Option<&Path>) -> PathBuf {
    if let Some(rest) = value.strip_prefix("~/")
        && let Some(home) = home
    {
        return home.join(rest);
    }
    PathBuf::from(value)
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

//! Filesystem path completion.
//!
//! When the current line ends in something that looks like a path, the
//! engine offers the directory's entries. Detection follows the historic
//! heuristic — a drive-letter colon preceded by nothing or an opener
//! character — plus a portable branch for rooted and home-relative tokens.
//! Enumeration is non-recursive and bounded by a wall-clock budget so a slow
//! network share can't stall the caller.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::debug;

fn allowed_before_drive(c: char) -> bool {
    matches!(c, '\'' | '/' | '"' | '(' | '{' | '[') || c.is_whitespace()
}

/// The trailing path-like token of `line`, if any.
///
/// Drive rule: the last `:` must be preceded by an alphabetic character
/// which in turn is preceded by nothing, whitespace, a quote or an opening
/// bracket. Portable rule: the trailing whitespace-delimited token starts
/// with `/` or `~/`.
pub(crate) fn raw_path_token(line: &str) -> Option<String> {
    let chars: Vec<char> = line.chars().collect();
    if let Some(colon) = chars.iter().rposition(|&c| c == ':') {
        if colon >= 1
            && chars[colon - 1].is_alphabetic()
            && (colon < 2 || allowed_before_drive(chars[colon - 2]))
        {
            return Some(chars[colon - 1..].iter().collect());
        }
    }
    let start = chars
        .iter()
        .rposition(|&c| c.is_whitespace() || c == '"' || c == '\'')
        .map(|i| i + 1)
        .unwrap_or(0);
    let token: String = chars[start..].iter().collect();
    if token.starts_with('/') || token.starts_with("~/") {
        return Some(token);
    }
    None
}

/// Resolve the token to the directory that should be listed: the token
/// itself when it names a directory, otherwise its parent.
pub(crate) fn paths_for_completion(line: &str) -> Option<(String, PathBuf)> {
    let raw = raw_path_token(line)?;
    let path = Path::new(&raw);
    if path.is_dir() {
        let dir = PathBuf::from(&raw);
        return Some((raw, dir));
    }
    let sep = raw.rfind(['/', '\\'])?;
    let dir = if sep == 0 { "/" } else { &raw[..sep] };
    if dir.is_empty() {
        return None;
    }
    let dir = PathBuf::from(dir);
    Some((raw, dir))
}

/// List `dir`, spelling each entry with the raw token's own prefix so the
/// completion text matches what the user typed. Stops once `budget` is
/// exhausted; entries are sorted for a stable popup.
pub(crate) fn enumerate(dir: &Path, raw: &str, budget: Duration) -> Vec<String> {
    let started = Instant::now();
    let sep = if raw.contains('\\') { '\\' } else { '/' };
    let prefix = if Path::new(raw).is_dir() {
        if raw.ends_with(['/', '\\']) {
            raw.to_string()
        } else {
            format!("{raw}{sep}")
        }
    } else {
        match raw.rfind(['/', '\\']) {
            Some(i) => raw[..=i].to_string(),
            None => format!("{raw}{sep}"),
        }
    };

    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut items = Vec::new();
    for entry in entries.flatten() {
        items.push(format!("{prefix}{}", entry.file_name().to_string_lossy()));
        if started.elapsed() > budget {
            debug!(dir = %dir.display(), listed = items.len(), "path scan budget exhausted");
            break;
        }
    }
    items.sort();
    items
}

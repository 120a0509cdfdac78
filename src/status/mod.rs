// ===========================================================================
// status - Porcelain Status Parsing
// ===========================================================================

use serde::Serialize;

/// One file's status as reported by `git status --porcelain`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEntry {
    pub path: String,
    pub original_path: Option<String>,
    pub index_code: char,
    pub tree_code: char,
}

impl StatusEntry {
    pub fn new(index_code: char, tree_code: char, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            original_path: None,
            index_code,
            tree_code,
        }
    }

    pub fn is_staged(&self) -> bool {
        self.index_code != ' ' && self.index_code != '?'
    }

    pub fn is_unstaged_modification(&self) -> bool {
        self.tree_code != ' '
    }

    pub fn is_untracked(&self) -> bool {
        self.index_code == '?' && self.tree_code == '?'
    }

    pub fn is_conflicted(&self) -> bool {
        self.index_code == 'U' || self.tree_code == 'U'
    }

    pub fn is_renamed(&self) -> bool {
        self.index_code == 'R'
    }

    pub fn is_deleted_in_index(&self) -> bool {
        self.index_code == 'D'
    }

    pub fn is_deleted_in_tree(&self) -> bool {
        self.tree_code == 'D'
    }

    /// Short label for display, e.g. "modified" or "renamed from x".
    pub fn describe(&self) -> String {
        if self.is_conflicted() {
            return "conflicted".into();
        }
        if self.is_untracked() {
            return "untracked".into();
        }
        let code = if self.is_staged() {
            self.index_code
        } else {
            self.tree_code
        };
        let label = match code {
            'M' => "modified",
            'A' => "added",
            'D' => "deleted",
            'R' => "renamed",
            'C' => "copied",
            'T' => "type changed",
            _ => "changed",
        };
        match &self.original_path {
            Some(from) => format!("{label} from {from}"),
            None => label.into(),
        }
    }
}

/// Parser output: the staged and unstaged views of one status query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusLists {
    pub staged: Vec<StatusEntry>,
    pub unstaged: Vec<StatusEntry>,
}

/// Parse the output of `git status --porcelain -uall`.
///
/// A path with both index and worktree changes yields an entry in each list.
/// Untracked files only ever land in `unstaged`.
pub fn parse(input: &str) -> StatusLists {
    let mut lists = StatusLists::default();

    for line in input.split(['\r', '\n']).filter(|l| !l.is_empty()) {
        let Some(entry) = parse_line(line) else {
            log::debug!("skipping malformed status line: {line:?}");
            continue;
        };

        if entry.is_staged() {
            lists.staged.push(entry.clone());
        }

        if (entry.is_untracked() || entry.is_unstaged_modification())
            && !lists.unstaged.iter().any(|e| e.path == entry.path)
        {
            lists.unstaged.push(entry);
        }
    }

    sort_by_path(&mut lists.staged);
    sort_by_path(&mut lists.unstaged);
    lists
}

/// Decode a single `XY payload` line. Lines under four chars are rejected.
fn parse_line(line: &str) -> Option<StatusEntry> {
    let mut chars = line.char_indices();
    let (_, index_code) = chars.next()?;
    let (_, tree_code) = chars.next()?;
    chars.next()?;
    let (start, _) = chars.next()?;
    let payload = &line[start..];

    let (original_path, path) = match index_code {
        'R' | 'C' => match payload.split_once(" -> ") {
            Some((from, to)) => (Some(unquote(from)), unquote(to)),
            None => (None, unquote(payload)),
        },
        _ => (None, unquote(payload)),
    };

    Some(StatusEntry {
        path,
        original_path,
        index_code,
        tree_code,
    })
}

/// Undo git's C-style path quoting: strip the enclosing double quotes and
/// decode the escapes inside. Unquoted paths are returned as is.
fn unquote(path: &str) -> String {
    match path.strip_prefix('"').and_then(|p| p.strip_suffix('"')) {
        Some(inner) => unescape(inner),
        None => path.to_string(),
    }
}

/// Octal escapes are raw bytes (UTF-8 split per byte), so decode into a
/// byte buffer first.
fn unescape(quoted: &str) -> String {
    let mut bytes = Vec::with_capacity(quoted.len());
    let mut rest = quoted.bytes().peekable();

    while let Some(b) = rest.next() {
        if b != b'\\' {
            bytes.push(b);
            continue;
        }
        match rest.next() {
            Some(b'n') => bytes.push(b'\n'),
            Some(b't') => bytes.push(b'\t'),
            Some(b'r') => bytes.push(b'\r'),
            Some(b'a') => bytes.push(0x07),
            Some(b'b') => bytes.push(0x08),
            Some(b'f') => bytes.push(0x0c),
            Some(b'v') => bytes.push(0x0b),
            Some(digit @ b'0'..=b'3') => {
                let mut value = digit - b'0';
                for _ in 0..2 {
                    match rest.peek() {
                        Some(&d @ b'0'..=b'7') => {
                            value = value * 8 + (d - b'0');
                            rest.next();
                        }
                        _ => break,
                    }
                }
                bytes.push(value);
            }
            // \" and \\ plus anything unknown: keep the escaped byte
            Some(other) => bytes.push(other),
            None => bytes.push(b'\\'),
        }
    }

    String::from_utf8_lossy(&bytes).into_owned()
}

fn sort_by_path(entries: &mut [StatusEntry]) {
    entries.sort_by_cached_key(|e| e.path.to_lowercase());
}

//! Unified diff generation and application.
//!
//! Diffs are produced with `similar`. Application parses the diff into
//! files and hunks, checks every context and removed line against the
//! file on disk, and only writes once every hunk of every file fits.

use crate::error::PatchError;
use regex_lite::Regex;
use similar::TextDiff;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

static HUNK_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").expect("hunk header pattern is valid")
});

/// Unified diff of `old` → `new` with `a/`/`b/` headers and 3 lines of
/// context. Identical inputs produce an empty string.
pub fn generate_patch(old: &str, new: &str, file_path: &str) -> String {
    TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(3)
        .header(&format!("a/{file_path}"), &format!("b/{file_path}"))
        .to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Context,
    Removed,
    Added,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct HunkLine {
    kind: LineKind,
    text: String,
    /// Followed by `\ No newline at end of file`.
    no_newline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    pub source_start: usize,
    pub source_len: usize,
    pub target_start: usize,
    pub target_len: usize,
    lines: Vec<HunkLine>,
}

/// One file section of a unified diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePatch {
    /// Path before the change, `None` for created files.
    pub source: Option<String>,
    /// Path after the change, `None` for deleted files.
    pub target: Option<String>,
    pub hunks: Vec<Hunk>,
}

impl FilePatch {
    /// The repository-relative path this patch touches.
    pub fn path(&self) -> &str {
        self.target
            .as_deref()
            .or(self.source.as_deref())
            .unwrap_or_default()
    }
}

/// Strip `a/` or `b/`, any trailing timestamp, and map `/dev/null` to `None`.
fn header_path(raw: &str) -> Option<String> {
    let raw = raw.split('\t').next().unwrap_or(raw).trim();
    if raw == "/dev/null" {
        return None;
    }
    let stripped = raw
        .strip_prefix("a/")
        .or_else(|| raw.strip_prefix("b/"))
        .unwrap_or(raw);
    Some(stripped.to_string())
}

/// Parse a unified diff into per-file hunks.
pub fn parse_patch(patch: &str) -> Result<Vec<FilePatch>, PatchError> {
    let lines: Vec<&str> = patch.lines().collect();
    let mut files: Vec<FilePatch> = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];

        if let Some(source) = line.strip_prefix("--- ")
            && let Some(target) = lines.get(i + 1).and_then(|l| l.strip_prefix("+++ "))
        {
            files.push(FilePatch {
                source: header_path(source),
                target: header_path(target),
                hunks: Vec::new(),
            });
            i += 2;
            continue;
        }

        if line.starts_with("@@") {
            let caps = HUNK_HEADER.captures(line).ok_or_else(|| PatchError::BadHunkHeader {
                line: i + 1,
                header: line.to_string(),
            })?;
            let number = |idx: usize, default: usize| {
                caps.get(idx)
                    .and_then(|m| m.as_str().parse().ok())
                    .unwrap_or(default)
            };
            let mut hunk = Hunk {
                source_start: number(1, 0),
                source_len: number(2, 1),
                target_start: number(3, 0),
                target_len: number(4, 1),
                lines: Vec::new(),
            };

            let file = files
                .last_mut()
                .ok_or(PatchError::OrphanHunk { line: i + 1 })?;

            let header_line = i + 1;
            let mut source_left = hunk.source_len;
            let mut target_left = hunk.target_len;
            i += 1;
            while i < lines.len() && (source_left > 0 || target_left > 0) {
                let body = lines[i];
                let (kind, text) = match body.chars().next() {
                    Some(' ') => (LineKind::Context, &body[1..]),
                    Some('-') => (LineKind::Removed, &body[1..]),
                    Some('+') => (LineKind::Added, &body[1..]),
                    Some('\\') => {
                        if let Some(last) = hunk.lines.last_mut() {
                            last.no_newline = true;
                        }
                        i += 1;
                        continue;
                    }
                    // Editors often strip the single space of blank context lines.
                    None => (LineKind::Context, ""),
                    Some(_) => break,
                };
                match kind {
                    LineKind::Context if source_left > 0 && target_left > 0 => {
                        source_left -= 1;
                        target_left -= 1;
                    }
                    LineKind::Removed if source_left > 0 => source_left -= 1,
                    LineKind::Added if target_left > 0 => target_left -= 1,
                    _ => break,
                }
                hunk.lines.push(HunkLine {
                    kind,
                    text: text.to_string(),
                    no_newline: false,
                });
                i += 1;
            }

            // A trailing marker belongs to the hunk's last line.
            if let Some(marker) = lines.get(i)
                && marker.starts_with('\\')
            {
                if let Some(last) = hunk.lines.last_mut() {
                    last.no_newline = true;
                }
                i += 1;
            }

            if source_left > 0 || target_left > 0 || continues_hunk(&lines[i..]) {
                return Err(PatchError::HunkCountMismatch {
                    line: header_line,
                    header: lines[header_line - 1].to_string(),
                });
            }

            file.hunks.push(hunk);
            continue;
        }

        // `diff --git`, `index`, and any prose around the diff.
        i += 1;
    }

    files.retain(|f| !f.hunks.is_empty());
    if files.is_empty() {
        return Err(PatchError::Empty);
    }
    Ok(files)
}

/// Whether the next line still looks like hunk body rather than a new
/// hunk, a new file, or trailing prose.
fn continues_hunk(rest: &[&str]) -> bool {
    let Some(next) = rest.first() else {
        return false;
    };
    let file_header = next.starts_with("--- ")
        && rest.get(1).is_some_and(|l| l.starts_with("+++ "));
    !file_header && next.starts_with([' ', '-', '+'])
}

/// Reject absolute paths and anything with `..`.
fn safe_join(root: &Path, relative: &str) -> Result<PathBuf, PatchError> {
    let rel = Path::new(relative);
    let safe = !relative.is_empty()
        && rel
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !safe {
        return Err(PatchError::UnsafePath(relative.to_string()));
    }
    Ok(root.join(rel))
}

/// Apply one file's hunks to its current content, last hunk first.
fn apply_hunks(path: &str, original: &str, hunks: &[Hunk]) -> Result<String, PatchError> {
    let mut lines: Vec<String> = original.split_inclusive('\n').map(String::from).collect();

    for (idx, hunk) in hunks.iter().enumerate().rev() {
        let hunk_no = idx + 1;
        // A zero-length source range names the line *after* which to insert.
        let start = if hunk.source_len == 0 {
            hunk.source_start
        } else {
            hunk.source_start.saturating_sub(1)
        };
        let end = start + hunk.source_len;
        if end > lines.len() {
            return Err(PatchError::HunkOutOfRange {
                path: path.to_string(),
                hunk: hunk_no,
                lines: lines.len(),
            });
        }

        let expected = hunk
            .lines
            .iter()
            .filter(|l| l.kind != LineKind::Added)
            .map(|l| l.text.as_str());
        for (offset, want) in expected.enumerate() {
            let Some(have) = lines.get(start + offset) else {
                return Err(PatchError::HunkOutOfRange {
                    path: path.to_string(),
                    hunk: hunk_no,
                    lines: lines.len(),
                });
            };
            if have.trim_end_matches(['\n', '\r']) != want {
                return Err(PatchError::ContextMismatch {
                    path: path.to_string(),
                    hunk: hunk_no,
                    line: start + offset + 1,
                });
            }
        }

        let replacement: Vec<String> = hunk
            .lines
            .iter()
            .filter(|l| l.kind != LineKind::Removed)
            .map(|l| {
                if l.no_newline {
                    l.text.clone()
                } else {
                    format!("{}\n", l.text)
                }
            })
            .collect();
        lines.splice(start..end, replacement);
    }

    Ok(lines.concat())
}

/// Apply a unified diff to the working tree at `repo_root`.
///
/// Returns the relative paths that were written or removed. Nothing is
/// written unless every hunk of every file applies cleanly.
pub fn apply_patch(repo_root: &Path, patch: &str) -> Result<Vec<String>, PatchError> {
    let files = parse_patch(patch)?;

    let mut planned: Vec<(PathBuf, String, Option<String>)> = Vec::with_capacity(files.len());
    for file in &files {
        let rel = file.path().to_string();
        let full = safe_join(repo_root, &rel)?;

        let original = match &file.source {
            Some(_) => std::fs::read_to_string(&full).map_err(|e| PatchError::Read {
                path: rel.clone(),
                reason: e.to_string(),
            })?,
            None => String::new(),
        };

        let patched = apply_hunks(&rel, &original, &file.hunks)?;
        let content = file.target.as_ref().map(|_| patched);
        planned.push((full, rel, content));
    }

    let mut touched = Vec::with_capacity(planned.len());
    for (full, rel, content) in planned {
        let written = match content {
            Some(content) => {
                if let Some(parent) = full.parent() {
                    std::fs::create_dir_all(parent).map_err(|e| PatchError::Write {
                        path: rel.clone(),
                        reason: e.to_string(),
                    })?;
                }
                std::fs::write(&full, content)
            }
            None => std::fs::remove_file(&full),
        };
        written.map_err(|e| PatchError::Write {
            path: rel.clone(),
            reason: e.to_string(),
        })?;
        debug!(path = %rel, "Patched file");
        touched.push(rel);
    }

    Ok(touched)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGINAL: &str = "def add(a, b):\n    return a - b\n\n\ndef sub(a, b):\n    return a - b\n";

    fn repo_with(path: &str, content: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let full = dir.path().join(path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(full, content).unwrap();
        dir
    }

    #[test]
    fn generate_patch_has_prefixed_headers() {
        let new = ORIGINAL.replacen("a - b", "a + b", 1);
        let patch = generate_patch(ORIGINAL, &new, "calc.py");
        assert!(patch.starts_with("--- a/calc.py\n+++ b/calc.py\n"));
        assert!(patch.contains("-    return a - b\n+    return a + b\n"));
    }

    #[test]
    fn identical_inputs_produce_empty_patch() {
        assert_eq!(generate_patch(ORIGINAL, ORIGINAL, "calc.py"), "");
    }

    #[test]
    fn generated_patch_applies_back() {
        let new = ORIGINAL.replacen("a - b", "a + b", 1);
        let repo = repo_with("src/calc.py", ORIGINAL);
        let patch = generate_patch(ORIGINAL, &new, "src/calc.py");

        let touched = apply_patch(repo.path(), &patch).unwrap();
        assert_eq!(touched, vec!["src/calc.py".to_string()]);
        let on_disk = std::fs::read_to_string(repo.path().join("src/calc.py")).unwrap();
        assert_eq!(on_disk, new);
    }

    #[test]
    fn hunks_apply_in_reverse_so_offsets_hold() {
        let original: String = (1..=20).map(|n| format!("line {n}\n")).collect();
        let patch = "\
--- a/f.txt
+++ b/f.txt
@@ -2,1 +2,2 @@
-line 2
+line 2a
+line 2b
@@ -15,1 +16,1 @@
-line 15
+line fifteen
";
        let repo = repo_with("f.txt", &original);
        apply_patch(repo.path(), patch).unwrap();
        let result = std::fs::read_to_string(repo.path().join("f.txt")).unwrap();
        assert!(result.contains("line 1\nline 2a\nline 2b\nline 3\n"));
        assert!(result.contains("line 14\nline fifteen\nline 16\n"));
    }

    #[test]
    fn mismatched_context_writes_nothing() {
        let repo = repo_with("calc.py", ORIGINAL);
        let patch = "\
--- a/calc.py
+++ b/calc.py
@@ -1,2 +1,2 @@
 def multiply(a, b):
-    return a - b
+    return a * b
";
        let err = apply_patch(repo.path(), patch).unwrap_err();
        assert!(matches!(err, PatchError::ContextMismatch { hunk: 1, line: 1, .. }));
        let on_disk = std::fs::read_to_string(repo.path().join("calc.py")).unwrap();
        assert_eq!(on_disk, ORIGINAL);
    }

    #[test]
    fn header_counting_fewer_source_lines_than_body_is_rejected() {
        let repo = repo_with("f.txt", "a\nb\nc\n");
        let patch = "--- a/f.txt\n+++ b/f.txt\n@@ -1,1 +1,4 @@\n a\n b\n+new\n c\n";

        let err = apply_patch(repo.path(), patch).unwrap_err();
        assert!(matches!(err, PatchError::HunkCountMismatch { line: 3, .. }));
        let on_disk = std::fs::read_to_string(repo.path().join("f.txt")).unwrap();
        assert_eq!(on_disk, "a\nb\nc\n");
    }

    #[test]
    fn hunk_longer_than_file_is_an_error_not_a_panic() {
        let repo = repo_with("f.txt", "a\n");
        let patch = "--- a/f.txt\n+++ b/f.txt\n@@ -1,1 +1,3 @@\n a\n b\n+c\n";

        let err = apply_patch(repo.path(), patch).unwrap_err();
        assert!(matches!(err, PatchError::HunkCountMismatch { .. }));
        assert_eq!(std::fs::read_to_string(repo.path().join("f.txt")).unwrap(), "a\n");
    }

    #[test]
    fn body_lines_past_the_header_counts_are_rejected() {
        let err = parse_patch("--- a/x\n+++ b/x\n@@ -1,1 +1,1 @@\n-a\n+A\n b\n").unwrap_err();
        assert!(matches!(err, PatchError::HunkCountMismatch { line: 3, .. }));
    }

    #[test]
    fn body_shorter_than_header_is_rejected() {
        let err = parse_patch("--- a/x\n+++ b/x\n@@ -1,3 +1,3 @@\n a\n-b\n+B\n").unwrap_err();
        assert!(matches!(err, PatchError::HunkCountMismatch { .. }));
    }

    #[test]
    fn exact_counts_allow_next_file_and_trailing_prose() {
        let patch = "\
--- a/x
+++ b/x
@@ -1,2 +1,2 @@
 a
-b
+B
--- a/y
+++ b/y
@@ -1 +1 @@
-c
+C

That should fix it.
";
        let files = parse_patch(patch).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].hunks[0].lines.len(), 3);
        assert_eq!(files[1].path(), "y");
    }

    #[test]
    fn new_file_from_dev_null() {
        let dir = tempfile::tempdir().unwrap();
        let patch = "\
--- /dev/null
+++ b/docs/NOTES.md
@@ -0,0 +1,2 @@
+# Notes
+hello
";
        let touched = apply_patch(dir.path(), patch).unwrap();
        assert_eq!(touched, vec!["docs/NOTES.md".to_string()]);
        let content = std::fs::read_to_string(dir.path().join("docs/NOTES.md")).unwrap();
        assert_eq!(content, "# Notes\nhello\n");
    }

    #[test]
    fn missing_newline_marker_is_respected() {
        let repo = repo_with("v.txt", "old");
        let patch = "\
--- a/v.txt
+++ b/v.txt
@@ -1 +1 @@
-old
\\ No newline at end of file
+new
\\ No newline at end of file
";
        apply_patch(repo.path(), patch).unwrap();
        assert_eq!(std::fs::read_to_string(repo.path().join("v.txt")).unwrap(), "new");
    }

    #[test]
    fn escaping_paths_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let patch = "--- a/../x\n+++ b/../x\n@@ -0,0 +1 @@\n+boom\n";
        assert!(matches!(
            apply_patch(dir.path(), patch),
            Err(PatchError::UnsafePath(_))
        ));
    }

    #[test]
    fn text_without_hunks_is_empty_patch() {
        assert!(matches!(parse_patch("just some prose"), Err(PatchError::Empty)));
        assert!(matches!(
            parse_patch("--- a/x\n+++ b/x\n"),
            Err(PatchError::Empty)
        ));
    }

    #[test]
    fn bad_hunk_header_is_reported_with_line() {
        let err = parse_patch("--- a/x\n+++ b/x\n@@ nonsense @@\n").unwrap_err();
        assert!(matches!(err, PatchError::BadHunkHeader { line: 3, .. }));
    }

    #[test]
    fn hunk_before_header_is_orphan() {
        let err = parse_patch("@@ -1 +1 @@\n-a\n+b\n").unwrap_err();
        assert!(matches!(err, PatchError::OrphanHunk { line: 1 }));
    }

    #[test]
    fn header_paths_drop_prefixes_and_timestamps() {
        assert_eq!(header_path("a/src/x.rs\t2024-01-01"), Some("src/x.rs".into()));
        assert_eq!(header_path("/dev/null"), None);
        assert_eq!(header_path("plain.txt"), Some("plain.txt".into()));
    }
}

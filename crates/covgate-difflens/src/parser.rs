use covgate_core::{ChangedLines, CovgateError, Result};

/// New-side line range announced by a hunk header.
///
/// # Examples
///
/// ```
/// use covgate_difflens::parser::{parse_hunk_header, HunkRange};
///
/// let hunk = parse_hunk_header("@@ -10,2 +10,3 @@ func main() {").unwrap();
/// assert_eq!(hunk, HunkRange { old_start: 10, old_lines: 2, new_start: 10, new_lines: 3 });
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HunkRange {
    pub old_start: u32,
    pub old_lines: u32,
    pub new_start: u32,
    pub new_lines: u32,
}

impl HunkRange {
    /// A hunk that removes lines without adding any.
    pub fn is_pure_deletion(&self) -> bool {
        self.new_lines == 0
    }
}

/// Header of a hunk in a combined (merge) diff, with one old range per parent.
///
/// Plain two-way hunks parse as a combined hunk with a single parent.
///
/// # Examples
///
/// ```
/// use covgate_difflens::parser::parse_combined_hunk_header;
///
/// let hunk = parse_combined_hunk_header("@@@ -1,2 -1,3 +1,4 @@@").unwrap();
/// assert_eq!(hunk.old, vec![(1, 2), (1, 3)]);
/// assert_eq!((hunk.new_start, hunk.new_lines), (1, 4));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedHunkRange {
    /// `(start, count)` for each parent, in parent order.
    pub old: Vec<(u32, u32)>,
    pub new_start: u32,
    pub new_lines: u32,
}

impl CombinedHunkRange {
    pub fn parents(&self) -> usize {
        self.old.len()
    }

    pub fn is_pure_deletion(&self) -> bool {
        self.new_lines == 0
    }
}

/// Remaining body lines of the hunk being read.
#[derive(Debug, Default)]
struct HunkBody {
    old: Vec<u32>,
    new: u32,
}

impl HunkBody {
    fn open(hunk: &CombinedHunkRange) -> Self {
        Self {
            old: hunk.old.iter().map(|&(_, count)| count).collect(),
            new: hunk.new_lines,
        }
    }

    fn is_open(&self) -> bool {
        self.new > 0 || self.old.iter().any(|&n| n > 0)
    }

    /// Count `line` against the hunk. Returns false if it is not body text.
    fn consume(&mut self, line: &str) -> bool {
        let bytes = line.as_bytes();
        if bytes.first() == Some(&b'\\') {
            return true;
        }
        let parents = self.old.len();
        if bytes.is_empty() {
            self.take(&vec![b' '; parents]);
            return true;
        }
        match bytes.get(..parents) {
            Some(columns) if columns.iter().all(|b| matches!(b, b' ' | b'+' | b'-')) => {
                self.take(columns);
                true
            }
            _ => false,
        }
    }

    // A `-` column marks a line lost from that parent; otherwise the line is
    // in the result and a space marks the parents that share it.
    fn take(&mut self, columns: &[u8]) {
        let removed = columns.contains(&b'-');
        let shared = if removed { b'-' } else { b' ' };
        for (pending, &column) in self.old.iter_mut().zip(columns) {
            if column == shared {
                *pending = pending.saturating_sub(1);
            }
        }
        if !removed {
            self.new = self.new.saturating_sub(1);
        }
    }
}

/// Parse unified diff text into the lines each file added or modified.
///
/// Every `+++` header opens a file entry (keyed by its path with the `b/`
/// prefix removed) and each following hunk header contributes
/// `[new_start, new_start + new_lines - 1]` to that entry. Hunks with a new
/// count of zero are pure deletions and add nothing. Deleted files
/// (`+++ /dev/null`) get no entry.
///
/// Hunk bodies are consumed by their announced line counts, so an added
/// line whose text happens to start with `++ ` is not mistaken for a header.
/// Combined diffs of merge commits (`diff --cc`, `@@@` headers) are read the
/// same way, using the result-side range.
///
/// # Errors
///
/// Returns [`CovgateError::Parse`] if a hunk header is malformed.
///
/// # Examples
///
/// ```
/// use covgate_difflens::parser::parse_changed_lines;
///
/// let diff = "diff --git a/cmd/main.go b/cmd/main.go\n\
///             --- a/cmd/main.go\n\
///             +++ b/cmd/main.go\n\
///             @@ -10,2 +10,3 @@\n\
///             -old\n\
///             -old\n\
///             +new\n\
///             +new\n\
///             +new\n";
/// let changed = parse_changed_lines(diff).unwrap();
/// assert!(changed.contains("cmd/main.go", 12));
/// assert_eq!(changed.total_lines(), 3);
///
/// assert!(parse_changed_lines("").unwrap().is_empty());
/// ```
pub fn parse_changed_lines(input: &str) -> Result<ChangedLines> {
    let mut changed = ChangedLines::new();
    let mut current: Option<String> = None;
    let mut body = HunkBody::default();

    for line in input.lines() {
        if body.is_open() {
            if body.consume(line) {
                continue;
            }
            // A truncated hunk; treat the line as a header below.
            body = HunkBody::default();
        }

        if line.starts_with("diff --git ")
            || line.starts_with("diff --cc ")
            || line.starts_with("diff --combined ")
        {
            current = None;
            continue;
        }

        if let Some(path) = line.strip_prefix("+++ ") {
            let path = parse_path(path);
            if path == "/dev/null" {
                current = None;
            } else {
                changed.touch_file(path.as_str());
                current = Some(path);
            }
            continue;
        }

        if line.starts_with("@@") {
            let hunk = parse_combined_hunk_header(line)?;
            body = HunkBody::open(&hunk);

            let Some(file) = current.as_deref() else {
                continue;
            };
            if hunk.is_pure_deletion() {
                continue;
            }
            changed.add_range(file, hunk.new_start, hunk.new_lines);
        }
    }

    tracing::debug!(
        files = changed.file_count(),
        lines = changed.total_lines(),
        "parsed diff"
    );
    Ok(changed)
}

fn parse_path(raw: &str) -> String {
    // git appends a tab before trailing metadata in some modes
    let raw = raw.split('\t').next().unwrap_or(raw);
    let normalized = match raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')) {
        Some(quoted) => unescape_c_quoted(quoted),
        None => raw.to_string(),
    };

    if normalized == "/dev/null" {
        return normalized;
    }

    normalized
        .strip_prefix("b/")
        .or_else(|| normalized.strip_prefix("a/"))
        .unwrap_or(&normalized)
        .to_string()
}

/// Undo git's C-style quoting: backslash escapes and `\NNN` octal bytes.
fn unescape_c_quoted(quoted: &str) -> String {
    let bytes = quoted.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'\\' || i + 1 == bytes.len() {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        let next = bytes[i + 1];
        let octal = bytes[i + 1..]
            .iter()
            .take(3)
            .take_while(|b| (b'0'..=b'7').contains(b))
            .count();
        if octal == 3 {
            let value = bytes[i + 1..i + 4]
                .iter()
                .fold(0u32, |acc, b| acc * 8 + u32::from(b - b'0'));
            out.push(u8::try_from(value).unwrap_or(b'?'));
            i += 4;
            continue;
        }
        let unescaped = match next {
            b'a' => 0x07,
            b'b' => 0x08,
            b'f' => 0x0c,
            b'n' => b'\n',
            b'r' => b'\r',
            b't' => b'\t',
            b'v' => 0x0b,
            b'"' => b'"',
            b'\\' => b'\\',
            other => {
                out.push(b'\\');
                other
            }
        };
        out.push(unescaped);
        i += 2;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Parse a `@@ -old[,count] +new[,count] @@` header. Omitted counts are 1.
///
/// # Errors
///
/// Returns [`CovgateError::Parse`] if the header does not have both ranges
/// or is a combined header.
pub fn parse_hunk_header(line: &str) -> Result<HunkRange> {
    let hunk = parse_combined_hunk_header(line)?;
    match hunk.old.as_slice() {
        &[(old_start, old_lines)] => Ok(HunkRange {
            old_start,
            old_lines,
            new_start: hunk.new_start,
            new_lines: hunk.new_lines,
        }),
        _ => Err(CovgateError::Parse(format!("invalid hunk header: {line}"))),
    }
}

/// Parse a hunk header with any number of parents: `@@ -a +b @@` has one,
/// `@@@ -a -b +c @@@` has two. The marker is one `@` longer than the
/// parent count.
///
/// # Errors
///
/// Returns [`CovgateError::Parse`] if the marker is unbalanced, the number
/// of old ranges does not match the marker, or a range is malformed.
pub fn parse_combined_hunk_header(line: &str) -> Result<CombinedHunkRange> {
    let invalid = || CovgateError::Parse(format!("invalid hunk header: {line}"));

    let width = line.bytes().take_while(|&b| b == b'@').count();
    if width < 2 {
        return Err(invalid());
    }
    let marker = &line[..width];
    let inner = line[width..]
        .strip_prefix(' ')
        .and_then(|s| {
            let end = s.find(&format!(" {marker}"))?;
            Some(&s[..end])
        })
        .ok_or_else(invalid)?;

    let parts: Vec<&str> = inner.split(' ').collect();
    let Some((new, olds)) = parts.split_last() else {
        return Err(invalid());
    };
    if olds.len() != width - 1 {
        return Err(invalid());
    }

    let old = olds
        .iter()
        .map(|part| {
            let range = part.strip_prefix('-').ok_or_else(|| {
                CovgateError::Parse(format!("invalid old range in hunk: {line}"))
            })?;
            parse_range(range, line)
        })
        .collect::<Result<Vec<_>>>()?;
    let new = new
        .strip_prefix('+')
        .ok_or_else(|| CovgateError::Parse(format!("invalid new range in hunk: {line}")))?;
    let (new_start, new_lines) = parse_range(new, line)?;

    Ok(CombinedHunkRange {
        old,
        new_start,
        new_lines,
    })
}

fn parse_range(range: &str, context: &str) -> Result<(u32, u32)> {
    if let Some((start, count)) = range.split_once(',') {
        let s = start
            .parse()
            .map_err(|_| CovgateError::Parse(format!("invalid range number in: {context}")))?;
        let c = count
            .parse()
            .map_err(|_| CovgateError::Parse(format!("invalid range count in: {context}")))?;
        Ok((s, c))
    } else {
        let s = range
            .parse()
            .map_err(|_| CovgateError::Parse(format!("invalid range number in: {context}")))?;
        Ok((s, 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines_of(changed: &ChangedLines, path: &str) -> Vec<u32> {
        changed
            .lines(path)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    #[test]
    fn empty_diff_returns_empty_map() {
        let changed = parse_changed_lines("").unwrap();
        assert!(changed.is_empty());
    }

    #[test]
    fn hunk_with_counts_adds_new_side_span() {
        let diff = "\
--- a/p
+++ b/p
@@ -10,2 +10,3 @@
-a
-b
+a
+b
+c
";
        let changed = parse_changed_lines(diff).unwrap();
        assert_eq!(lines_of(&changed, "p"), vec![10, 11, 12]);
    }

    #[test]
    fn omitted_count_defaults_to_one() {
        let diff = "\
+++ b/main.go
@@ -4 +4 @@
-x
+y
";
        let changed = parse_changed_lines(diff).unwrap();
        assert_eq!(lines_of(&changed, "main.go"), vec![4]);
    }

    #[test]
    fn pure_deletion_hunk_adds_no_lines() {
        let diff = "\
diff --git a/lib.go b/lib.go
--- a/lib.go
+++ b/lib.go
@@ -7,3 +6,0 @@
-one
-two
-three
";
        let changed = parse_changed_lines(diff).unwrap();
        assert!(changed.contains_file("lib.go"));
        assert!(lines_of(&changed, "lib.go").is_empty());
    }

    #[test]
    fn multiple_hunks_accumulate_into_one_set() {
        let diff = "\
diff --git a/lib.go b/lib.go
--- a/lib.go
+++ b/lib.go
@@ -1,0 +2,2 @@
+a
+b
@@ -10 +12,0 @@
-gone
@@ -20,0 +21 @@
+c
";
        let changed = parse_changed_lines(diff).unwrap();
        assert_eq!(lines_of(&changed, "lib.go"), vec![2, 3, 21]);
    }

    #[test]
    fn multiple_files_get_separate_entries() {
        let diff = "\
diff --git a/a.go b/a.go
--- a/a.go
+++ b/a.go
@@ -1 +1,2 @@
 line1
+line2
diff --git a/pkg/b.go b/pkg/b.go
--- a/pkg/b.go
+++ b/pkg/b.go
@@ -5,0 +6,3 @@
+x
+y
+z
";
        let changed = parse_changed_lines(diff).unwrap();
        assert_eq!(changed.file_count(), 2);
        assert_eq!(lines_of(&changed, "a.go"), vec![1, 2]);
        assert_eq!(lines_of(&changed, "pkg/b.go"), vec![6, 7, 8]);
    }

    #[test]
    fn deleted_file_gets_no_entry() {
        let diff = "\
diff --git a/old.go b/old.go
deleted file mode 100644
--- a/old.go
+++ /dev/null
@@ -1,3 +0,0 @@
-a
-b
-c
";
        let changed = parse_changed_lines(diff).unwrap();
        assert!(changed.is_empty());
    }

    #[test]
    fn new_file_counts_every_line() {
        let diff = "\
diff --git a/new.go b/new.go
new file mode 100644
--- /dev/null
+++ b/new.go
@@ -0,0 +1,3 @@
+package x
+
+func F() {}
";
        let changed = parse_changed_lines(diff).unwrap();
        assert_eq!(lines_of(&changed, "new.go"), vec![1, 2, 3]);
    }

    #[test]
    fn rename_without_content_change_gets_no_entry() {
        let diff = "\
diff --git a/old_name.go b/new_name.go
similarity index 100%
rename from old_name.go
rename to new_name.go
";
        let changed = parse_changed_lines(diff).unwrap();
        assert!(changed.is_empty());
    }

    #[test]
    fn rename_with_hunk_is_keyed_by_new_path() {
        let diff = "\
diff --git a/old_name.go b/new_name.go
similarity index 90%
rename from old_name.go
rename to new_name.go
--- a/old_name.go
+++ b/new_name.go
@@ -3 +3 @@
-a
+b
";
        let changed = parse_changed_lines(diff).unwrap();
        assert_eq!(lines_of(&changed, "new_name.go"), vec![3]);
        assert!(!changed.contains_file("old_name.go"));
    }

    #[test]
    fn added_line_that_looks_like_a_header_is_content() {
        let diff = "\
--- a/notes.md
+++ b/notes.md
@@ -1,0 +1,2 @@
+++ b/fake.go
+@@ -1 +1,99 @@
";
        let changed = parse_changed_lines(diff).unwrap();
        assert_eq!(changed.file_count(), 1);
        assert_eq!(lines_of(&changed, "notes.md"), vec![1, 2]);
    }

    #[test]
    fn hunk_before_any_file_header_is_ignored() {
        let diff = "@@ -1 +1,4 @@\n-a\n+a\n+b\n+c\n+d\n";
        let changed = parse_changed_lines(diff).unwrap();
        assert!(changed.is_empty());
    }

    #[test]
    fn no_newline_marker_is_skipped() {
        let diff = "\
--- a/f.go
+++ b/f.go
@@ -1 +1 @@
-old
\\ No newline at end of file
+new
\\ No newline at end of file
--- a/g.go
+++ b/g.go
@@ -2 +2 @@
-x
+y
";
        let changed = parse_changed_lines(diff).unwrap();
        assert_eq!(lines_of(&changed, "f.go"), vec![1]);
        assert_eq!(lines_of(&changed, "g.go"), vec![2]);
    }

    #[test]
    fn quoted_paths_are_unquoted() {
        let diff = "--- \"a/src/my file.go\"\n+++ \"b/src/my file.go\"\n@@ -1 +1 @@\n-a\n+b\n";
        let changed = parse_changed_lines(diff).unwrap();
        assert!(changed.contains("src/my file.go", 1));
    }

    #[test]
    fn parse_hunk_header_accepts_function_context() {
        let hunk = parse_hunk_header("@@ -3,0 +4,2 @@ func (s *Server) Start() error {").unwrap();
        assert_eq!(hunk.new_start, 4);
        assert_eq!(hunk.new_lines, 2);
        assert_eq!(hunk.old_lines, 0);
    }

    #[test]
    fn malformed_hunk_header_is_an_error() {
        let diff = "+++ b/x.go\n@@ garbage @@\n";
        let err = parse_changed_lines(diff).unwrap_err();
        assert!(matches!(err, CovgateError::Parse(_)));
    }

    #[test]
    fn parse_path_strips_b_prefix() {
        assert_eq!(parse_path("b/internal/x.go"), "internal/x.go");
        assert_eq!(parse_path("/dev/null"), "/dev/null");
        assert_eq!(parse_path("b/x.go\t2024-01-01"), "x.go");
    }

    #[test]
    fn combined_hunk_uses_result_side_range() {
        let diff = "\
diff --cc merge.go
index 1111111,2222222..3333333
--- a/merge.go
+++ b/merge.go
@@@ -1,1 -1,1 +1,2 @@@
- ours
 -theirs
++x
++y
";
        let changed = parse_changed_lines(diff).unwrap();
        assert_eq!(lines_of(&changed, "merge.go"), vec![1, 2]);
    }

    #[test]
    fn combined_body_lines_are_not_headers() {
        let diff = "\
diff --cc a.go
--- a/a.go
+++ b/a.go
@@@ -1,0 -1,0 +1,2 @@@
++@@ -1 +1,99 @@
++++ b/fake.go
diff --git a/b.go b/b.go
--- a/b.go
+++ b/b.go
@@ -3 +3 @@
-a
+b
";
        let changed = parse_changed_lines(diff).unwrap();
        assert_eq!(changed.file_count(), 2);
        assert_eq!(lines_of(&changed, "a.go"), vec![1, 2]);
        assert_eq!(lines_of(&changed, "b.go"), vec![3]);
    }

    #[test]
    fn combined_header_needs_one_range_per_parent() {
        assert!(parse_combined_hunk_header("@@@ -1 +1 @@@").is_err());
        assert!(parse_combined_hunk_header("@@@ -1 -1 +1 @@").is_err());
        assert!(parse_hunk_header("@@@ -1 -1 +1 @@@").is_err());

        let hunk = parse_combined_hunk_header("@@@@ -1 -2 -3,0 +4,5 @@@@ fn x").unwrap();
        assert_eq!(hunk.parents(), 3);
        assert_eq!(hunk.old, vec![(1, 1), (2, 1), (3, 0)]);
        assert_eq!((hunk.new_start, hunk.new_lines), (4, 5));
    }

    #[test]
    fn octal_escaped_paths_are_decoded() {
        let diff = "--- \"a/\\303\\251.go\"\n+++ \"b/\\303\\251.go\"\n@@ -1 +1 @@\n-a\n+b\n";
        let changed = parse_changed_lines(diff).unwrap();
        assert!(changed.contains("é.go", 1));
    }

    #[test]
    fn quoted_path_escapes_are_undone() {
        assert_eq!(parse_path("\"b/a\\\"q\\\"\\\\b.go\""), "a\"q\"\\b.go");
        assert_eq!(parse_path("\"b/tab\\there.go\""), "tab\there.go");
        assert_eq!(parse_path("\"b/\\346\\227\\245\\346\\234\\254.go\""), "日本.go");
    }
}

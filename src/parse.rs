//! Parsing of unified diff text into an addressable [`ParsedDiff`].
//!
//! The parser takes the plain (uncolored) `git diff` output for a single
//! file and records two ordered index lists over its lines:
//!
//! - **hunk starts**: every `@@ ... @@` header line
//! - **stageable lines**: every `+` or `-` line inside a hunk
//!
//! The `---`/`+++` file header lines precede the first hunk and so are never
//! stageable. Hunk header counts are not checked against the body here;
//! [`crate::patch`] recomputes them when it synthesizes a patch.
//!
//! # Examples
//!
//! ```
//! use git_linestage::parse::parse_patch;
//!
//! let diff = parse_patch("\
//! diff --git a/flake.nix b/flake.nix
//! --- a/flake.nix
//! +++ b/flake.nix
//! @@ -136,0 +137 @@
//! +      debug = true;
//! ").unwrap();
//! assert_eq!(diff.hunk_starts(), &[3]);
//! assert_eq!(diff.stageable_lines(), &[4]);
//! ```

use crate::diff::{HunkHeader, ParsedDiff};
use error_set::error_set;
use tracing::debug;

error_set! {
    /// Errors from parsing unified diff text
    ParseError := {
        /// No `@@` hunk header anywhere in the text
        #[display("Malformed diff: {reason}")]
        MalformedDiff { reason: String },
        /// A line starting with `@@` is not a valid hunk header
        #[display("Invalid hunk header on line {line}: '{text}'")]
        InvalidHunkHeader { line: usize, text: String },
        /// A second `diff --git` section appeared after hunks had started
        #[display("Diff covers more than one file (second file starts on line {line})")]
        MultipleFiles { line: usize },
    }
}

/// Parse the unified diff for one file.
///
/// # Errors
///
/// Returns [`ParseError`] if:
/// - The text contains no hunk header
/// - A hunk header is malformed
/// - The text describes more than one file
pub fn parse_patch(text: &str) -> Result<ParsedDiff, ParseError> {
    let lines = split_lines(text);
    let mut hunk_starts = Vec::new();
    let mut stageable_lines = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        if line.starts_with("@@") {
            if HunkHeader::parse(line).is_none() {
                return Err(ParseError::InvalidHunkHeader {
                    line: index,
                    text: line.clone(),
                });
            }
            hunk_starts.push(index);
        } else if hunk_starts.is_empty() {
            // Still in the file header
            continue;
        } else if line.starts_with("diff ") {
            return Err(ParseError::MultipleFiles { line: index });
        } else if line.starts_with('+') || line.starts_with('-') {
            stageable_lines.push(index);
        }
    }

    if hunk_starts.is_empty() {
        return Err(ParseError::MalformedDiff {
            reason: "no hunk headers found".to_string(),
        });
    }

    debug!(
        hunks = hunk_starts.len(),
        stageable = stageable_lines.len(),
        "parse:diff"
    );

    Ok(ParsedDiff::new(lines, hunk_starts, stageable_lines))
}

/// Split on `\n` only, so `\r` in CRLF files survives into the patch.
fn split_lines(text: &str) -> Vec<String> {
    let text = text.strip_suffix('\n').unwrap_or(text);
    if text.is_empty() {
        return Vec::new();
    }
    text.split('\n').map(str::to_string).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    #[test]
    fn parse_single_addition() {
        let diff = r#"diff --git a/flake.nix b/flake.nix
index abc1234..def5678 100644
--- a/flake.nix
+++ b/flake.nix
@@ -136,0 +137 @@
+      debug = true;
"#;
        let parsed = parse_patch(diff).unwrap();
        assert_eq!(parsed.hunk_starts(), &[4]);
        assert_eq!(parsed.stageable_lines(), &[5]);
        assert_eq!(parsed.line_count(), 6);
    }

    #[test]
    fn parse_two_hunks_with_context() {
        let diff = r#"diff --git a/gtk.nix b/gtk.nix
--- a/gtk.nix
+++ b/gtk.nix
@@ -1,3 +1,4 @@
 line 1
+    # Theme managed by Stylix
 line 2
 line 3
@@ -9,3 +10,2 @@ line 8
 line 9
-    gtk.theme.name = "Adwaita";
 line 11
"#;
        let parsed = parse_patch(diff).unwrap();
        assert_eq!(parsed.hunk_starts(), &[3, 8]);
        assert_eq!(parsed.stageable_lines(), &[5, 10]);
    }

    #[test]
    fn content_that_looks_like_file_headers_is_stageable() {
        let diff = "--- a/notes.md\n+++ b/notes.md\n@@ -5,0 +6,3 @@\n++++ plus\n+--- minus\n--- removed\n";
        let parsed = parse_patch(diff).unwrap();
        assert_eq!(parsed.hunk_starts(), &[2]);
        assert_eq!(parsed.stageable_lines(), &[3, 4, 5]);
    }

    #[test]
    fn no_newline_marker_is_not_stageable() {
        let diff = "--- a/f\n+++ b/f\n@@ -3 +3 @@\n-old\n\\ No newline at end of file\n+new\n";
        let parsed = parse_patch(diff).unwrap();
        assert_eq!(parsed.stageable_lines(), &[3, 5]);
    }

    #[test]
    fn crlf_content_is_preserved() {
        let diff = "--- a/f\r\n+++ b/f\r\n@@ -1 +1 @@\r\n-a\r\n+b\r\n";
        let parsed = parse_patch(diff).unwrap();
        assert_eq!(parsed.lines()[3], "-a\r");
        assert_eq!(parsed.stageable_lines(), &[3, 4]);
    }

    #[test]
    fn parse_empty() {
        let result = parse_patch("");
        assert!(matches!(result, Err(ParseError::MalformedDiff { .. })));
    }

    #[test]
    fn parse_header_only() {
        let diff = "diff --git a/bin b/bin\nBinary files a/bin and b/bin differ\n";
        let result = parse_patch(diff);
        assert!(matches!(result, Err(ParseError::MalformedDiff { .. })));
    }

    #[test]
    fn parse_invalid_hunk_header() {
        let diff = "--- a/f\n+++ b/f\n@@ garbage @@\n+x\n";
        let result = parse_patch(diff);
        assert!(matches!(
            result,
            Err(ParseError::InvalidHunkHeader { line: 2, .. })
        ));
    }

    #[test]
    fn parse_rejects_second_file() {
        let diff = r#"diff --git a/a b/a
--- a/a
+++ b/a
@@ -1,0 +2 @@
+x
diff --git a/b b/b
--- a/b
+++ b/b
@@ -1,0 +2 @@
+y
"#;
        let result = parse_patch(diff);
        assert!(matches!(result, Err(ParseError::MultipleFiles { line: 5 })));
    }
}

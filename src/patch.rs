//! Synthesis of minimal patches from a selected line or hunk.
//!
//! Both entry points emit the diff's file header followed by exactly one
//! hunk. Every other hunk is dropped, since `git apply --cached` only needs
//! the hunk being staged.
//!
//! In line mode the hunk body is filtered down to the selected change and
//! its header counts are recomputed, so that
//!
//! ```text
//! old_count = context + deletions
//! new_count = context + additions
//! ```
//!
//! holds over the emitted body. A patch whose header disagrees with its body
//! is rejected outright by `git apply`.

use crate::diff::{HunkHeader, ParsedDiff};
use error_set::error_set;
use tracing::debug;

error_set! {
    /// Errors from building a patch for a selection
    PatchError := {
        #[display("Diff contains no hunks")]
        NoHunks,
        #[display("Line {line} is not inside any hunk")]
        HunkNotFound { line: usize },
        #[display("Line {line} is not an addition or deletion")]
        NotStageable { line: usize },
        #[display("Invalid hunk header on line {line}")]
        InvalidHunkHeader { line: usize },
    }
}

/// What happens to deletions other than the selected line in line mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum DeletionPolicy {
    /// Keep the line as unchanged context on both sides
    #[default]
    AsContext,
    /// Leave the line out of the patch entirely
    Drop,
}

/// How a body line of the original hunk ends up in the emitted hunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Emit {
    Verbatim,
    AsContext,
    Skip,
}

/// Build a patch that stages only the `+`/`-` line at `line`.
///
/// Other additions in the hunk are dropped. Other deletions are handled per
/// `policy`. Context lines and `\ No newline at end of file` markers for
/// retained lines are copied verbatim.
///
/// # Errors
///
/// Returns [`PatchError`] if the diff has no hunks, `line` is outside every
/// hunk, `line` is not a change line, or the hunk header is malformed.
pub fn modify_for_line(
    diff: &ParsedDiff,
    line: usize,
    policy: DeletionPolicy,
) -> Result<String, PatchError> {
    let (hunk, header) = locate(diff, line)?;
    let lines = diff.lines();

    if !is_change(&lines[line]) {
        return Err(PatchError::NotStageable { line });
    }

    let range = diff
        .hunk_range(hunk)
        .ok_or(PatchError::HunkNotFound { line })?;
    let adds_later = |index: usize| lines[line].starts_with('+') && line > index;

    // Next old-side line number; a zero old count names the line *before*
    // the change rather than its first line.
    let mut old_pos = if header.old_count == 0 {
        header.old_start.saturating_add(1)
    } else {
        header.old_start
    };
    let mut old_first = None;
    let mut anchor = None;
    let mut old_count = 0u32;
    let mut new_count = 0u32;
    let mut body = Vec::with_capacity(range.len());
    let mut kept_previous = false;
    // Old last line without a newline that must be re-added before any
    // addition following it
    let mut readd: Option<&str> = None;

    for index in range.start + 1..range.end {
        let text = &lines[index];
        let (in_old, emit) = match text.as_bytes().first() {
            Some(b'+') if index == line => (false, Emit::Verbatim),
            Some(b'+') => (false, Emit::Skip),
            Some(b'-') if index == line => (true, Emit::Verbatim),
            Some(b'-') if lacks_newline(lines, index) && adds_later(index) => {
                readd = Some(&text[1..]);
                (true, Emit::Verbatim)
            }
            Some(b'-') => match policy {
                DeletionPolicy::AsContext => (true, Emit::AsContext),
                DeletionPolicy::Drop => (true, Emit::Skip),
            },
            Some(b'\\') => {
                if kept_previous {
                    body.push(text.clone());
                }
                continue;
            }
            _ => (true, Emit::Verbatim),
        };

        kept_previous = emit != Emit::Skip;
        if kept_previous {
            anchor.get_or_insert(old_pos.saturating_sub(1));
            match (emit, text.as_bytes().first()) {
                (Emit::AsContext, _) => {
                    body.push(format!(" {}", &text[1..]));
                    old_count += 1;
                    new_count += 1;
                }
                (_, Some(b'+')) => {
                    if let Some(prior) = readd.take() {
                        if prior != &text[1..] {
                            body.push(format!("+{prior}"));
                            new_count += 1;
                        }
                    }
                    body.push(text.clone());
                    new_count += 1;
                }
                (_, Some(b'-')) => {
                    body.push(text.clone());
                    old_count += 1;
                }
                _ => {
                    body.push(text.clone());
                    old_count += 1;
                    new_count += 1;
                }
            }
            if in_old {
                old_first.get_or_insert(old_pos);
            }
        }

        if in_old {
            old_pos = old_pos.saturating_add(1);
        }
    }

    let old_start = match old_first {
        Some(start) => start,
        // Pure insertion: the line before the selected addition
        None => anchor.unwrap_or(header.old_start),
    };

    let deletes_file = new_count == 0 && old_count == header.old_count;
    let rewritten = HunkHeader {
        old_start,
        old_count,
        new_start: new_start(old_start, old_count, new_count, 0),
        new_count,
        section: header.section,
    };

    debug!(
        line,
        hunk,
        header = %rewritten,
        "patch:line"
    );

    let mut patch = file_header(diff, deletes_file);
    push_line(&mut patch, &rewritten.to_string());
    for text in &body {
        push_line(&mut patch, text);
    }

    Ok(patch)
}

/// Build a patch that stages the whole hunk containing `line`.
///
/// The hunk's header and body are emitted unmodified. Mode changes in the
/// file header are left out.
///
/// # Errors
///
/// Returns [`PatchError`] if the diff has no hunks or `line` is outside
/// every hunk.
pub fn modify_for_hunk(diff: &ParsedDiff, line: usize) -> Result<String, PatchError> {
    let (hunk, _) = locate(diff, line)?;
    let range = diff
        .hunk_range(hunk)
        .ok_or(PatchError::HunkNotFound { line })?;

    let mut patch = file_header(diff, true);
    for text in &diff.lines()[range] {
        push_line(&mut patch, text);
    }

    debug!(line, hunk, "patch:hunk");

    Ok(patch)
}

/// Find the hunk holding `line` and parse its header.
fn locate(diff: &ParsedDiff, line: usize) -> Result<(usize, HunkHeader), PatchError> {
    if diff.hunk_starts().is_empty() {
        return Err(PatchError::NoHunks);
    }

    let hunk = diff
        .hunk_index_of(line)
        .ok_or(PatchError::HunkNotFound { line })?;
    let start = diff.hunk_starts()[hunk];
    let header = HunkHeader::parse(&diff.lines()[start])
        .ok_or(PatchError::InvalidHunkHeader { line: start })?;

    Ok((hunk, header))
}

/// New-side start for a hunk at `old_start`, shifted by the net size
/// change (`delta`) of hunks emitted before it.
fn new_start(old_start: u32, old_count: u32, new_count: u32, delta: i64) -> u32 {
    let base = i64::from(old_start) + delta;
    let start = if old_count == 0 {
        base + 1
    } else if new_count == 0 {
        base - 1
    } else {
        base
    };
    u32::try_from(start.max(0)).unwrap_or(0)
}

fn is_change(text: &str) -> bool {
    text.starts_with('+') || text.starts_with('-')
}

/// Whether the line after `index` is a `\ No newline at end of file` marker.
fn lacks_newline(lines: &[String], index: usize) -> bool {
    lines.get(index + 1).is_some_and(|next| next.starts_with('\\'))
}

/// The file header lines that belong in a patch.
///
/// Mode changes are never staged along with content. Unless the patch
/// removes every line of a deleted file, the deletion header is turned back
/// into a plain edit of the old path.
fn file_header(diff: &ParsedDiff, deletes_file: bool) -> String {
    let lines = diff.file_header();
    let deleted = lines.iter().any(|text| text.starts_with("deleted file mode "));
    let rewrite = deleted && !deletes_file;
    let old_path = lines.iter().find_map(|text| text.strip_prefix("--- "));

    let mut patch = String::new();
    for text in lines {
        if text.starts_with("old mode ") || text.starts_with("new mode ") {
            continue;
        }
        if rewrite {
            if text.starts_with("deleted file mode ") || text.starts_with("index ") {
                continue;
            }
            if text == "+++ /dev/null" {
                if let Some(path) = old_path {
                    let path = path.strip_prefix("a/").map_or_else(
                        || path.to_string(),
                        |rest| format!("b/{rest}"),
                    );
                    push_line(&mut patch, &format!("+++ {path}"));
                    continue;
                }
            }
        }
        push_line(&mut patch, text);
    }
    patch
}

fn push_line(patch: &mut String, text: &str) {
    patch.push_str(text);
    patch.push('\n');
}

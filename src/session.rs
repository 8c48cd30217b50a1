//! Navigation state for one file's staging session.

use crate::diff::{ParsedDiff, next_index, prev_index};
use crate::patch::{self, DeletionPolicy, PatchError};
use error_set::error_set;
use std::fmt;
use tracing::debug;

error_set! {
    /// Errors from starting or driving a staging session
    SessionError := {
        #[display("No staging session is active")]
        NoActiveSession,
        #[display("Staging session {id} is no longer active")]
        StaleSession { id: SessionId },
        #[display("Nothing to stage in {file}")]
        NoStageableLines { file: String },
        #[display("{file} has no unstaged changes")]
        NoUnstagedChanges { file: String },
        #[display("Stageable line {index} out of range (have {len})")]
        IndexOutOfRange { index: usize, len: usize },
    }
}

/// Identifies one staging session.
///
/// Handles from a session that has since ended never match a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub(crate) u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A navigation step over the stageable lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    NextLine,
    PrevLine,
    NextHunk,
    PrevHunk,
}

/// Whether to stage the selected line or its whole hunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageMode {
    Line,
    Hunk,
}

/// Selection state over a parsed diff.
///
/// Always holds at least one stageable line, and `current_index` is always
/// a valid position in [`ParsedDiff::stageable_lines`].
#[derive(Debug, Clone)]
pub struct StagingSession {
    id: SessionId,
    file: String,
    diff: ParsedDiff,
    display: String,
    current_index: usize,
}

impl StagingSession {
    /// Start a session at the first stageable line.
    ///
    /// `display` is the colored diff for rendering only; it is never parsed.
    pub fn new(
        id: SessionId,
        file: &str,
        diff: ParsedDiff,
        display: String,
    ) -> Result<Self, SessionError> {
        if diff.stageable_lines().is_empty() {
            return Err(SessionError::NoStageableLines {
                file: file.to_string(),
            });
        }

        Ok(Self {
            id,
            file: file.to_string(),
            diff,
            display,
            current_index: 0,
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn diff(&self) -> &ParsedDiff {
        &self.diff
    }

    pub fn display_text(&self) -> &str {
        &self.display
    }

    /// Position of the selection in the stageable line list
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Raw diff line number of the selection
    pub fn current_line(&self) -> usize {
        self.diff.stageable_lines()[self.current_index]
    }

    /// Index of the hunk holding the selection
    pub fn current_hunk(&self) -> usize {
        self.diff.hunk_index_of(self.current_line()).unwrap_or(0)
    }

    /// Jump straight to a stageable line.
    pub fn select(&mut self, index: usize) -> Result<(), SessionError> {
        let len = self.diff.stageable_lines().len();
        if index >= len {
            return Err(SessionError::IndexOutOfRange { index, len });
        }
        self.current_index = index;
        Ok(())
    }

    /// Apply a navigation step, wrapping circularly at either end.
    ///
    /// Returns the raw line number of the new selection.
    pub fn navigate(&mut self, step: Move) -> usize {
        let stageable = self.diff.stageable_lines();
        let current = self.current_line();

        self.current_index = match step {
            Move::NextLine => next_index(stageable, current),
            Move::PrevLine => prev_index(stageable, current),
            Move::NextHunk | Move::PrevHunk => {
                let starts = self.diff.hunk_starts();
                let hunk = self.current_hunk();
                let target = if step == Move::NextHunk {
                    if hunk + 1 == starts.len() { 0 } else { hunk + 1 }
                } else if hunk == 0 {
                    starts.len() - 1
                } else {
                    hunk - 1
                };
                next_index(stageable, starts[target])
            }
        };

        let line = self.current_line();
        debug!(?step, from = current, to = line, "session:navigate");
        line
    }

    /// Build the patch for the current selection.
    pub fn patch(&self, mode: StageMode, policy: DeletionPolicy) -> Result<String, PatchError> {
        let line = self.current_line();
        match mode {
            StageMode::Line => patch::modify_for_line(&self.diff, line, policy),
            StageMode::Hunk => patch::modify_for_hunk(&self.diff, line),
        }
    }

    /// Swap in a freshly parsed diff after a stage action.
    ///
    /// The selection keeps its position, clamped to the new stageable count,
    /// so the cursor lands next to the line that was just staged. Fails
    /// without touching the session if the new diff has nothing to stage.
    pub fn replace_diff(&mut self, diff: ParsedDiff, display: String) -> Result<(), SessionError> {
        let len = diff.stageable_lines().len();
        if len == 0 {
            return Err(SessionError::NoStageableLines {
                file: self.file.clone(),
            });
        }

        self.current_index = self.current_index.min(len - 1);
        self.diff = diff;
        self.display = display;
        Ok(())
    }
}


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod proptests {
    use super::*;
    use crate::parse::parse_patch;
    use proptest::prelude::*;

    /// Change counts per hunk, each at least one
    fn arb_shape() -> impl Strategy<Value = Vec<usize>> {
        prop::collection::vec(1..4usize, 1..5)
    }

    fn render(shape: &[usize]) -> String {
        let mut text = String::from("--- a/f\n+++ b/f\n");
        for (n, &changes) in shape.iter().enumerate() {
            text.push_str(&format!("@@ -{0},1 +{0},{1} @@\n ctx\n", n * 10 + 1, changes + 1));
            for i in 0..changes {
                text.push_str(&format!("+add {i}\n"));
            }
        }
        text
    }

    fn session(shape: &[usize]) -> StagingSession {
        StagingSession::new(SessionId(1), "f", parse_patch(&render(shape)).unwrap(), String::new())
            .unwrap()
    }

    proptest! {
        /// Stepping forward from the last stageable line lands on the first
        #[test]
        fn next_line_from_last_wraps_to_zero(shape in arb_shape()) {
            let mut s = session(&shape);
            let last = s.diff().stageable_lines().len() - 1;
            s.select(last).unwrap();
            s.navigate(Move::NextLine);
            prop_assert_eq!(s.current_index(), 0);
        }

        /// Stepping back a hunk from the first hunk lands in the last one
        #[test]
        fn prev_hunk_from_first_wraps_to_last(shape in arb_shape()) {
            let mut s = session(&shape);
            prop_assert_eq!(s.current_hunk(), 0);
            s.navigate(Move::PrevHunk);
            prop_assert_eq!(s.current_hunk(), shape.len() - 1);
        }

        /// Walking every line forward visits each stageable line once
        #[test]
        fn next_line_cycles_through_everything(shape in arb_shape()) {
            let mut s = session(&shape);
            let total = s.diff().stageable_lines().len();
            let mut seen = vec![s.current_index()];
            for _ in 1..total {
                s.navigate(Move::NextLine);
                seen.push(s.current_index());
            }
            prop_assert_eq!(seen, (0..total).collect::<Vec<_>>());
        }
    }
}

//! Line and hunk staging for a single file's unstaged diff.
//!
//! A [`Stager`] parses `git diff` output for one file, tracks a selection
//! over its `+`/`-` lines, and stages either the selected line or its whole
//! hunk by handing a minimal patch to `git apply --cached`.
//!
//! # Examples
//! ```no_run
//! # use git_linestage::{GitRepo, Move, StageMode, Stager, StagerConfig};
//! let mut stager = Stager::new(GitRepo::new(".", 3), StagerConfig::default());
//! let id = stager.start("src/main.rs").unwrap();
//! stager.navigate(id, Move::NextLine).unwrap();
//! stager.stage(id, StageMode::Line).unwrap();
//! ```

use error_set::error_set;

pub mod diff;
pub mod focus;
pub mod git;
pub mod parse;
pub mod patch;
pub mod session;
pub mod stager;

pub use diff::{HunkHeader, ParsedDiff};
pub use focus::{Focus, TextViewport, Viewport, compute_focus};
pub use git::{GitBackend, GitCommandError, GitRepo};
pub use parse::{ParseError, parse_patch};
pub use patch::{DeletionPolicy, PatchError, modify_for_hunk, modify_for_line};
pub use session::{Move, SessionError, SessionId, StageMode, StagingSession};
pub use stager::{StageOutcome, Stager, StagerConfig};

error_set! {
    /// Top-level error for git-linestage operations
    LineStageError := {
        #[display("Patch was not applied: {stderr}")]
        PatchApply { stderr: String },
        ParseError(ParseError),
        PatchError(PatchError),
        SessionError(SessionError),
        GitCommandError(GitCommandError),
    }
}

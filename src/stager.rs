//! Lifecycle of the active staging session.
//!
//! [`Stager`] owns at most one [`StagingSession`] and every operation takes
//! the [`SessionId`] it was started with. A handle held past the end of its
//! session fails with [`SessionError::StaleSession`] or
//! [`SessionError::NoActiveSession`] instead of acting on whatever session
//! is current.

use crate::LineStageError;
use crate::diff::ParsedDiff;
use crate::focus::{Focus, Viewport, compute_focus};
use crate::git::{GitBackend, GitCommandError};
use crate::parse::{ParseError, parse_patch};
use crate::patch::DeletionPolicy;
use crate::session::{Move, SessionError, SessionId, StageMode, StagingSession};
use tracing::{info, warn};

/// Settings for a [`Stager`]
#[derive(Debug, Clone, Copy, Default)]
pub struct StagerConfig {
    pub deletion_policy: DeletionPolicy,
}

/// Result of a stage action that went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// The file still has stageable changes and the session continues
    Continued,
    /// Nothing is left to stage; the session has ended
    Finished,
}

/// Drives staging sessions against a [`GitBackend`].
pub struct Stager<B> {
    backend: B,
    config: StagerConfig,
    session: Option<StagingSession>,
    last_id: u64,
}

impl<B: GitBackend> Stager<B> {
    pub fn new(backend: B, config: StagerConfig) -> Self {
        Self {
            backend,
            config,
            session: None,
            last_id: 0,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The active session, if any
    pub fn session(&self) -> Option<&StagingSession> {
        self.session.as_ref()
    }

    /// Start staging `file`, ending any session already active.
    ///
    /// # Errors
    ///
    /// Fails with [`SessionError::NoUnstagedChanges`] if the file has no
    /// unstaged diff and [`SessionError::NoStageableLines`] if its diff has
    /// no `+`/`-` lines. No session is active afterwards in either case.
    pub fn start(&mut self, file: &str) -> Result<SessionId, LineStageError> {
        self.escape();

        let (diff, display) = self
            .load(file)?
            .ok_or_else(|| SessionError::NoUnstagedChanges {
                file: file.to_string(),
            })?;

        self.last_id += 1;
        let session = StagingSession::new(SessionId(self.last_id), file, diff, display)?;
        let id = session.id();

        info!(
            %id,
            file,
            stageable = session.diff().stageable_lines().len(),
            "session:start"
        );

        self.session = Some(session);
        Ok(id)
    }

    /// End the active session, if any.
    pub fn escape(&mut self) {
        if let Some(session) = self.session.take() {
            info!(id = %session.id(), file = session.file(), "session:escape");
        }
    }

    /// Move the selection. Returns the raw line number now selected.
    pub fn navigate(&mut self, id: SessionId, step: Move) -> Result<usize, LineStageError> {
        Ok(self.active_mut(id)?.navigate(step))
    }

    /// Select the stageable line at `index`. Returns its raw line number.
    pub fn select(&mut self, id: SessionId, index: usize) -> Result<usize, LineStageError> {
        let session = self.active_mut(id)?;
        session.select(index)?;
        Ok(session.current_line())
    }

    /// The patch that staging the current selection would apply.
    pub fn patch(&self, id: SessionId, mode: StageMode) -> Result<String, LineStageError> {
        Ok(self.active(id)?.patch(mode, self.config.deletion_policy)?)
    }

    /// Stage the current line or hunk, then reload the file's diff.
    ///
    /// # Errors
    ///
    /// A rejected patch surfaces as [`LineStageError::PatchApply`] and
    /// leaves the session exactly as it was.
    pub fn stage(&mut self, id: SessionId, mode: StageMode) -> Result<StageOutcome, LineStageError> {
        let session = self.active(id)?;
        let patch = session.patch(mode, self.config.deletion_policy)?;
        let file = session.file().to_string();
        let line = session.current_line();

        self.backend.apply_patch(&patch).map_err(|e| match e {
            GitCommandError::ApplyExitError { stderr } => {
                warn!(%file, line, %stderr, "patch rejected");
                LineStageError::PatchApply { stderr }
            }
            other => other.into(),
        })?;

        info!(%file, line, ?mode, "staged");
        self.reload(id, &file)
    }

    /// Compute the focus for the current selection and apply it to `viewport`.
    pub fn focus<V: Viewport>(&self, id: SessionId, viewport: &mut V) -> Result<Focus, LineStageError> {
        let session = self.active(id)?;
        let (_, height) = viewport.size();
        let focus = compute_focus(
            session.current_line(),
            session.diff().hunk_starts(),
            height,
            viewport.line_count(),
        );
        focus.apply(viewport);
        Ok(focus)
    }

    /// Re-fetch after a stage action. Ends the session when nothing is left.
    ///
    /// The patch is already in the index at this point, so a reload failure
    /// also ends the session rather than leave it pointing at staged lines.
    fn reload(&mut self, id: SessionId, file: &str) -> Result<StageOutcome, LineStageError> {
        let loaded = match self.load(file) {
            Ok(loaded) => loaded,
            // Only a mode change or binary difference is left
            Err(LineStageError::ParseError(ParseError::MalformedDiff { .. })) => None,
            Err(e) => {
                warn!(%file, error = %e, "reload failed after staging");
                self.escape();
                return Err(e);
            }
        };

        let Some((diff, display)) = loaded else {
            self.escape();
            return Ok(StageOutcome::Finished);
        };

        match self.active_mut(id)?.replace_diff(diff, display) {
            Ok(()) => Ok(StageOutcome::Continued),
            Err(SessionError::NoStageableLines { .. }) => {
                self.escape();
                Ok(StageOutcome::Finished)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Fetch and parse the file's diff, or `None` if there is nothing unstaged.
    fn load(&self, file: &str) -> Result<Option<(ParsedDiff, String)>, LineStageError> {
        if !self.backend.has_unstaged_changes(file)? {
            return Ok(None);
        }

        let plain = self.backend.diff(file, true)?;
        if plain.len() < 2 {
            return Ok(None);
        }

        let diff = parse_patch(&plain)?;
        let display = self.backend.diff(file, false)?;
        Ok(Some((diff, display)))
    }

    fn active(&self, id: SessionId) -> Result<&StagingSession, SessionError> {
        match &self.session {
            Some(session) if session.id() == id => Ok(session),
            Some(_) => {
                warn!(%id, "stale session handle");
                Err(SessionError::StaleSession { id })
            }
            None => Err(SessionError::NoActiveSession),
        }
    }

    fn active_mut(&mut self, id: SessionId) -> Result<&mut StagingSession, SessionError> {
        match &mut self.session {
            Some(session) if session.id() == id => Ok(session),
            Some(_) => {
                warn!(%id, "stale session handle");
                Err(SessionError::StaleSession { id })
            }
            None => Err(SessionError::NoActiveSession),
        }
    }
}

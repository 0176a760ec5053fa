use std::fmt;

use crate::error::UploadError;

/// Coarse progress of an upload. Variants are declared in lifecycle order and an upload only
/// ever moves forward through them: `NotStarted < Started < Complete | Errored`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UploadState {
    NotStarted,
    Started,
    Complete,
    Errored,
}

impl UploadState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadState::Complete | UploadState::Errored)
    }

    /// Position in the lifecycle; both terminal states share the last position.
    pub fn rank(&self) -> u8 {
        match self {
            UploadState::NotStarted => 0,
            UploadState::Started => 1,
            UploadState::Complete | UploadState::Errored => 2,
        }
    }
}

impl fmt::Display for UploadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UploadState::NotStarted => "not started",
            UploadState::Started => "started",
            UploadState::Complete => "complete",
            UploadState::Errored => "errored",
        };
        f.write_str(s)
    }
}

/// The state of an upload together with its outcome. The error only exists inside the
/// `Errored` variant, so a state can never be observed without its matching error.
#[derive(Debug, Clone, Default)]
pub enum Status {
    #[default]
    NotStarted,
    Started,
    Complete,
    Errored(UploadError),
}

impl Status {
    pub fn state(&self) -> UploadState {
        match self {
            Status::NotStarted => UploadState::NotStarted,
            Status::Started => UploadState::Started,
            Status::Complete => UploadState::Complete,
            Status::Errored(_) => UploadState::Errored,
        }
    }

    pub fn error(&self) -> Option<&UploadError> {
        match self {
            Status::Errored(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    /// True if moving from `self` to `next` keeps the lifecycle moving forward.
    pub(crate) fn can_advance_to(&self, next: &Status) -> bool {
        next.state().rank() == self.state().rank() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_only() {
        let err = Status::Errored(UploadError::MissingUploadUrl);
        assert!(Status::NotStarted.can_advance_to(&Status::Started));
        assert!(Status::Started.can_advance_to(&Status::Complete));
        assert!(Status::Started.can_advance_to(&err));

        assert!(!Status::NotStarted.can_advance_to(&Status::Complete));
        assert!(!Status::Started.can_advance_to(&Status::Started));
        assert!(!Status::Complete.can_advance_to(&err));
        assert!(!err.can_advance_to(&Status::Started));
    }

    #[test]
    fn test_error_only_when_errored() {
        assert!(Status::Complete.error().is_none());
        let err = Status::Errored(UploadError::MissingUploadUrl);
        assert!(matches!(err.error(), Some(UploadError::MissingUploadUrl)));
        assert_eq!(err.state(), UploadState::Errored);
        assert!(err.is_terminal());
        assert!(!Status::Started.is_terminal());
    }
}

use crate::models::media::CaptureSource;

/// Why the user is being asked to pick a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPurpose {
    StartRecording,
    SwitchSource,
}

/// Outcome of a source selection. Cancelling is not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceChoice {
    Selected(String),
    Cancelled,
}

/// Presents the enumerated sources to the user and returns their choice.
///
/// The call blocks until the user confirms or cancels.
pub trait SourceSelector {
    fn choose(&self, sources: &[CaptureSource], purpose: SelectionPurpose) -> SourceChoice;
}

impl<F> SourceSelector for F
where
    F: Fn(&[CaptureSource], SelectionPurpose) -> SourceChoice,
{
    fn choose(&self, sources: &[CaptureSource], purpose: SelectionPurpose) -> SourceChoice {
        self(sources, purpose)
    }
}

use thiserror::Error;

/// Failures that end the call. Everything the caller can fix is handled
/// inside the step that detected it and never becomes a `FlowError`.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("caller {0} does not match any teacher")]
    UnknownCaller(String),
    #[error("no teacher phone ends with {0}")]
    UnknownTeacher(String),
    #[error("failed to save report: {0}")]
    SaveFailed(anyhow::Error),
}

impl FlowError {
    /// Text key read to the caller before hanging up.
    pub fn text_key(&self) -> &'static str {
        match self {
            FlowError::UnknownCaller(_) => "teacher_not_found",
            FlowError::UnknownTeacher(_) => "other_teacher_not_found",
            FlowError::SaveFailed(_) => "report_not_saved",
        }
    }
}

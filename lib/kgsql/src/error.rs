use kgsql_engine::sparql::error::{ErrorClass, QueryEvaluationError};
use kgsql_frames::FrameQueryError;
use kgsql_model::Term;

/// An error raised while answering a structured entity query with
/// [`Store::frame_query`](crate::store::Store::frame_query).
#[derive(Debug, thiserror::Error)]
pub enum FrameSearchError {
    /// The criteria cannot be turned into a query.
    #[error(transparent)]
    Criteria(#[from] FrameQueryError),
    /// The generated query failed.
    #[error(transparent)]
    Evaluation(#[from] QueryEvaluationError),
    /// A solution bound a value that is not an entity IRI or a count.
    #[error("Unexpected value {0} in the results of a frame query")]
    UnexpectedValue(Term),
}

impl FrameSearchError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Criteria(_) => ErrorClass::Client,
            Self::Evaluation(error) => error.class(),
            Self::UnexpectedValue(_) => ErrorClass::Internal,
        }
    }
}

use snafu::Snafu;

use crate::error::ErrorKind;
use crate::model::{CourseId, EnrollmentId};
use crate::service::remote::RemoteError;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ReconcileError {
    #[snafu(transparent)]
    Remote { source: RemoteError },

    #[snafu(display("enrollment `{enrollment_id}` does not exist"))]
    EnrollmentNotFound { enrollment_id: EnrollmentId },

    #[snafu(display("the learner has no enrollments"))]
    NoEnrollments,

    #[snafu(display("course `{course_id}` has no topic named `{topic_name}`"))]
    UnknownTopic {
        course_id: CourseId,
        topic_name: String,
    },
}

impl ReconcileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Remote { source } => source.kind(),
            Self::EnrollmentNotFound { .. } | Self::NoEnrollments | Self::UnknownTopic { .. } => {
                ErrorKind::DataNotFound
            }
        }
    }
}

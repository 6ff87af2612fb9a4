//! Enrollment data model linking students to courses.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::course::CourseId;
use crate::domain::user::UserId;

/// Completion status of an enrollment.
///
/// The platform records whichever status external collaborators set; no
/// transition order is enforced here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    Enrolled,
    InProgress,
    Completed,
    Dropped,
}

impl EnrollmentStatus {
    /// Stable wire representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enrolled => "enrolled",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Dropped => "dropped",
        }
    }
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when decoding an unknown status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidEnrollmentStatus(pub String);

impl fmt::Display for InvalidEnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown enrollment status {:?}", self.0)
    }
}

impl std::error::Error for InvalidEnrollmentStatus {}

impl FromStr for EnrollmentStatus {
    type Err = InvalidEnrollmentStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enrolled" => Ok(Self::Enrolled),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "dropped" => Ok(Self::Dropped),
            other => Err(InvalidEnrollmentStatus(other.to_owned())),
        }
    }
}

/// A student's membership in a course.
///
/// ## Invariants
/// - At most one enrollment exists per `(student_id, course_id)` pair.
/// - The enrollment count per course never exceeds that course's capacity.
///
/// Both invariants are guaranteed by the enrollment store's atomic guarded
/// insert; see `EnrollmentStore::enroll`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    #[schema(value_type = String)]
    id: Uuid,
    #[schema(value_type = String)]
    student_id: UserId,
    #[schema(value_type = String)]
    course_id: CourseId,
    enrolled_at: DateTime<Utc>,
    status: EnrollmentStatus,
}

impl Enrollment {
    /// Build an enrollment from stored fields.
    pub fn new(
        id: Uuid,
        student_id: UserId,
        course_id: CourseId,
        enrolled_at: DateTime<Utc>,
        status: EnrollmentStatus,
    ) -> Self {
        Self {
            id,
            student_id,
            course_id,
            enrolled_at,
            status,
        }
    }

    /// Build the enrollment created by a successful guard decision.
    pub fn start(student_id: UserId, course_id: CourseId, now: DateTime<Utc>) -> Self {
        Self::new(
            Uuid::new_v4(),
            student_id,
            course_id,
            now,
            EnrollmentStatus::Enrolled,
        )
    }

    /// Stable enrollment identifier.
    pub fn id(&self) -> &Uuid {
        &self.id
    }

    /// Enrolled student.
    pub fn student_id(&self) -> &UserId {
        &self.student_id
    }

    /// Course enrolled into.
    pub fn course_id(&self) -> &CourseId {
        &self.course_id
    }

    /// Timestamp at which the enrollment was created.
    pub fn enrolled_at(&self) -> DateTime<Utc> {
        self.enrolled_at
    }

    /// Externally driven completion status.
    pub fn status(&self) -> EnrollmentStatus {
        self.status
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("enrolled", EnrollmentStatus::Enrolled)]
    #[case("in_progress", EnrollmentStatus::InProgress)]
    #[case("completed", EnrollmentStatus::Completed)]
    #[case("dropped", EnrollmentStatus::Dropped)]
    fn status_round_trips_through_str(#[case] raw: &str, #[case] expected: EnrollmentStatus) {
        let parsed: EnrollmentStatus = raw.parse().expect("valid status");
        assert_eq!(parsed, expected);
        assert_eq!(parsed.as_str(), raw);
    }

    #[rstest]
    fn unknown_status_is_rejected() {
        let err = "paused".parse::<EnrollmentStatus>().expect_err("must fail");
        assert_eq!(err, InvalidEnrollmentStatus("paused".to_owned()));
    }

    #[rstest]
    fn start_creates_enrolled_status() {
        let enrollment = Enrollment::start(UserId::random(), CourseId::random(), Utc::now());
        assert_eq!(enrollment.status(), EnrollmentStatus::Enrolled);
    }
}

//! Diesel schema definitions for the platform database.
//!
//! Mirrors the migrations: `users.email` and `users.external_id` carry unique
//! indexes, and `enrollments` has a unique index over
//! `(student_id, course_id)` that backstops the guarded insert.

diesel::table! {
    /// Application users provisioned on first OAuth login.
    users (id) {
        /// Primary key.
        id -> Uuid,
        /// Unique email address.
        email -> Varchar,
        /// Unique subject id issued by the OAuth provider.
        external_id -> Varchar,
        /// Name shown to other users.
        display_name -> Varchar,
        /// One of `student`, `teacher`, `admin`.
        role -> Varchar,
        /// Row creation timestamp.
        created_at -> Timestamptz,
        /// Last modification timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Courses offered on the platform.
    courses (id) {
        /// Primary key.
        id -> Uuid,
        /// Course title.
        title -> Varchar,
        /// Optional free-form description.
        description -> Nullable<Text>,
        /// Owning instructor; references `users.id`.
        instructor_id -> Uuid,
        /// Category used for filtering and analytics.
        category -> Varchar,
        /// Aggregate rating in `0.0..=5.0`.
        rating -> Float8,
        /// Seat capacity; always at least one.
        max_students -> Int4,
        /// Row creation timestamp.
        created_at -> Timestamptz,
        /// Last modification timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Student memberships in courses.
    enrollments (id) {
        /// Primary key.
        id -> Uuid,
        /// Enrolled student; references `users.id`.
        student_id -> Uuid,
        /// Course enrolled into; references `courses.id`.
        course_id -> Uuid,
        /// Timestamp at which the enrollment was created.
        enrolled_at -> Timestamptz,
        /// One of `enrolled`, `in_progress`, `completed`, `dropped`.
        status -> Varchar,
    }
}

diesel::joinable!(enrollments -> courses (course_id));

diesel::allow_tables_to_appear_in_same_query!(users, courses, enrollments);

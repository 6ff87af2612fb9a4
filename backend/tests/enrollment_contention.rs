//! Concurrency invariants of the guarded enrollment insert.
//!
//! Many tasks race the same course; the store must never hand out more seats
//! than the capacity allows and never record the same student twice.

use std::sync::Arc;

use backend::domain::ports::{EnrollOutcome, EnrollmentStore, InMemoryEnrollmentStore};
use backend::domain::{CourseId, UserId};
use chrono::Utc;
use rstest::rstest;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn capacity_is_never_exceeded_under_contention() {
    let store = Arc::new(InMemoryEnrollmentStore::new());
    let course = CourseId::random();
    let capacity = 5_u32;

    let mut handles = Vec::new();
    for _ in 0..50 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store
                .enroll(&UserId::random(), &course, capacity, Utc::now())
                .await
        }));
    }

    let mut enrolled = 0;
    let mut full = 0;
    for handle in handles {
        match handle.await.expect("task").expect("store available") {
            EnrollOutcome::Enrolled(_) => enrolled += 1,
            EnrollOutcome::CourseFull => full += 1,
            EnrollOutcome::AlreadyEnrolled => panic!("distinct students cannot be duplicates"),
        }
    }

    assert_eq!(enrolled, 5);
    assert_eq!(full, 45);
    assert_eq!(
        store.count_by_course(&course).await.expect("count"),
        u64::from(capacity)
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_duplicates_yield_exactly_one_enrollment() {
    let store = Arc::new(InMemoryEnrollmentStore::new());
    let course = CourseId::random();
    let student = UserId::random();

    let mut handles = Vec::new();
    for _ in 0..20 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store.enroll(&student, &course, 10, Utc::now()).await
        }));
    }

    let mut enrolled = 0;
    for handle in handles {
        match handle.await.expect("task").expect("store available") {
            EnrollOutcome::Enrolled(_) => enrolled += 1,
            EnrollOutcome::AlreadyEnrolled => {}
            EnrollOutcome::CourseFull => panic!("course cannot fill with one student"),
        }
    }

    assert_eq!(enrolled, 1);
    assert_eq!(store.count_by_course(&course).await.expect("count"), 1);
}

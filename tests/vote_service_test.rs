mod common;

use std::sync::Arc;

use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::Duration;

use common::{oid, t0, TestApp};
use polling_backend::model::vote::{OptionTally, Vote};
use polling_backend::repository::repository_error::{RepositoryError, RepositoryResult};
use polling_backend::repository::vote_repo::VoteRepository;
use polling_backend::service::vote_service::{VoteService, VoteServiceImpl};
use polling_backend::util::error::ServiceError;

const ALREADY_VOTED: &str = "You have already voted on this poll";

#[cfg(test)]
mod submission {
    use super::*;

    #[tokio::test]
    async fn test_vote_returns_receipt_with_results() {
        let app = TestApp::new().await;
        let faculty = app.faculty("prof@uni.edu").await;
        let student = app.student("s1@uni.edu").await;
        let poll = app.poll(&faculty, &["A", "B"]).await;

        let receipt = app
            .state
            .vote_service
            .submit_vote(&student, &oid(&poll.poll.id), &oid(&poll.options[1].id))
            .await
            .unwrap();

        assert!(!receipt.vote_id.is_empty());
        assert_eq!(receipt.results.total_votes, 1);
        assert_eq!(receipt.results.results[1].vote_count, 1);
        assert_eq!(receipt.results.results[1].percentage, 100.0);

        let votes = app.storage.votes.list_by_user(&student.id).await.unwrap();
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].cast_at, Some(t0()));
    }

    #[tokio::test]
    async fn test_second_vote_with_any_option_is_conflict() {
        let app = TestApp::new().await;
        let faculty = app.faculty("prof@uni.edu").await;
        let student = app.student("s1@uni.edu").await;
        let poll = app.poll(&faculty, &["A", "B"]).await;
        let poll_id = oid(&poll.poll.id);

        app.state.vote_service.submit_vote(&student, &poll_id, &oid(&poll.options[0].id)).await.unwrap();
        for option in &poll.options {
            let err = app.state.vote_service.submit_vote(&student, &poll_id, &oid(&option.id)).await.unwrap_err();
            assert_eq!(err, ServiceError::Conflict(ALREADY_VOTED.to_string()));
        }
        assert!(app.state.vote_service.has_voted(&student, &poll_id).await.unwrap().has_voted);
    }

    #[tokio::test]
    async fn test_option_from_another_poll_is_rejected() {
        let app = TestApp::new().await;
        let faculty = app.faculty("prof@uni.edu").await;
        let student = app.student("s1@uni.edu").await;
        let first = app.poll(&faculty, &["A", "B"]).await;
        let second = app.poll(&faculty, &["C", "D"]).await;

        let err = app
            .state
            .vote_service
            .submit_vote(&student, &oid(&first.poll.id), &oid(&second.options[0].id))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        assert!(!app.state.vote_service.has_voted(&student, &oid(&first.poll.id)).await.unwrap().has_voted);
    }

    #[tokio::test]
    async fn test_only_students_vote() {
        let app = TestApp::new().await;
        let faculty = app.faculty("prof@uni.edu").await;
        let poll = app.poll(&faculty, &["A", "B"]).await;

        for actor in [&faculty, &app.admin] {
            let err = app
                .state
                .vote_service
                .submit_vote(actor, &oid(&poll.poll.id), &oid(&poll.options[0].id))
                .await
                .unwrap_err();
            assert!(matches!(err, ServiceError::Forbidden(_)));
        }
    }

    #[tokio::test]
    async fn test_non_student_denied_before_poll_lookup() {
        let app = TestApp::new().await;
        let faculty = app.faculty("prof@uni.edu").await;

        for actor in [&faculty, &app.admin] {
            let err = app
                .state
                .vote_service
                .submit_vote(actor, &ObjectId::new(), &ObjectId::new())
                .await
                .unwrap_err();
            assert_eq!(err, ServiceError::Forbidden("Only students can vote".to_string()));
        }
    }

    #[tokio::test]
    async fn test_inactive_poll_is_not_open() {
        let app = TestApp::new().await;
        let faculty = app.faculty("prof@uni.edu").await;
        let student = app.student("s1@uni.edu").await;
        let poll = app.poll(&faculty, &["A", "B"]).await;
        let poll_id = oid(&poll.poll.id);
        app.state
            .poll_service
            .update_poll(
                &faculty,
                &poll_id,
                polling_backend::dto::poll_dto::UpdatePollRequest { question: "Q".to_string(), is_active: false },
            )
            .await
            .unwrap();

        let err = app.state.vote_service.submit_vote(&student, &poll_id, &oid(&poll.options[0].id)).await.unwrap_err();
        assert_eq!(err, ServiceError::Conflict("This poll is not open".to_string()));
    }
}

#[cfg(test)]
mod schedule_boundaries {
    use super::*;

    #[tokio::test]
    async fn test_poll_appears_exactly_at_start_time() {
        let app = TestApp::new().await;
        let faculty = app.faculty("prof@uni.edu").await;
        let student = app.student("s1@uni.edu").await;
        let start = t0() + Duration::hours(1);
        app.scheduled_poll(&faculty, &["A", "B"], Some(start), None).await;

        app.clock.set(start - Duration::seconds(1));
        assert!(app.state.poll_service.list_votable_polls(&student).await.unwrap().is_empty());

        app.clock.set(start);
        assert_eq!(app.state.poll_service.list_votable_polls(&student).await.unwrap().len(), 1);

        app.clock.advance(Duration::days(30));
        assert_eq!(app.state.poll_service.list_votable_polls(&student).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_poll_disappears_exactly_at_end_time() {
        let app = TestApp::new().await;
        let faculty = app.faculty("prof@uni.edu").await;
        let student = app.student("s1@uni.edu").await;
        let end = t0() + Duration::hours(1);
        let poll = app.scheduled_poll(&faculty, &["A", "B"], None, Some(end)).await;
        let poll_id = oid(&poll.poll.id);

        app.clock.set(end - Duration::seconds(1));
        assert_eq!(app.state.poll_service.list_votable_polls(&student).await.unwrap().len(), 1);
        assert!(app.state.poll_service.get_poll(&student, &poll_id).await.is_ok());

        app.clock.set(end);
        assert!(app.state.poll_service.list_votable_polls(&student).await.unwrap().is_empty());
        let err = app.state.poll_service.get_poll(&student, &poll_id).await.unwrap_err();
        assert_eq!(err, ServiceError::Conflict("This poll is not open".to_string()));
        let err = app.state.vote_service.submit_vote(&student, &poll_id, &oid(&poll.options[0].id)).await.unwrap_err();
        assert_eq!(err, ServiceError::Conflict("This poll is not open".to_string()));
    }

    #[tokio::test]
    async fn test_votable_listing_carries_options_and_has_voted() {
        let app = TestApp::new().await;
        let faculty = app.faculty("prof@uni.edu").await;
        let student = app.student("s1@uni.edu").await;
        let poll = app.poll(&faculty, &["A", "B"]).await;

        let before = app.state.poll_service.list_votable_polls(&student).await.unwrap();
        assert_eq!(before[0].options.len(), 2);
        assert!(!before[0].has_voted);

        app.state
            .vote_service
            .submit_vote(&student, &oid(&poll.poll.id), &oid(&poll.options[0].id))
            .await
            .unwrap();
        let after = app.state.poll_service.list_votable_polls(&student).await.unwrap();
        assert!(after[0].has_voted);
    }

    #[tokio::test]
    async fn test_non_students_cannot_list_votable_polls() {
        let app = TestApp::new().await;
        let faculty = app.faculty("prof@uni.edu").await;
        assert!(matches!(
            app.state.poll_service.list_votable_polls(&faculty).await,
            Err(ServiceError::Forbidden(_))
        ));
    }
}

#[cfg(test)]
mod concurrency {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_simultaneous_votes_record_exactly_one() {
        let app = Arc::new(TestApp::new().await);
        let faculty = app.faculty("prof@uni.edu").await;
        let student = app.student("racer@uni.edu").await;
        let poll = app.poll(&faculty, &["A", "B"]).await;
        let poll_id = oid(&poll.poll.id);

        let mut handles = Vec::new();
        for i in 0..8 {
            let app = app.clone();
            let option_id = oid(&poll.options[i % 2].id);
            handles.push(tokio::spawn(async move {
                app.state.vote_service.submit_vote(&student, &poll_id, &option_id).await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(err) => assert_eq!(err, ServiceError::Conflict(ALREADY_VOTED.to_string())),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(app.storage.votes.list_by_user(&student.id).await.unwrap().len(), 1);
    }

    /// Vote store whose insert fails as if another request had written first.
    struct RacingVoteStore {
        inner: Arc<dyn VoteRepository>,
        insert_error: fn() -> RepositoryError,
    }

    #[async_trait]
    impl VoteRepository for RacingVoteStore {
        async fn insert(&self, _vote: Vote) -> RepositoryResult<Vote> {
            Err((self.insert_error)())
        }

        async fn has_voted(&self, user_id: &ObjectId, poll_id: &ObjectId) -> RepositoryResult<bool> {
            self.inner.has_voted(user_id, poll_id).await
        }

        async fn tally(&self, poll_id: &ObjectId) -> RepositoryResult<Vec<OptionTally>> {
            self.inner.tally(poll_id).await
        }

        async fn list_by_user(&self, user_id: &ObjectId) -> RepositoryResult<Vec<Vote>> {
            self.inner.list_by_user(user_id).await
        }

        async fn delete_by_poll(&self, poll_id: &ObjectId) -> RepositoryResult<u64> {
            self.inner.delete_by_poll(poll_id).await
        }
    }

    fn racing_service(app: &TestApp, insert_error: fn() -> RepositoryError) -> VoteServiceImpl {
        let votes = Arc::new(RacingVoteStore { inner: app.storage.votes.clone(), insert_error });
        VoteServiceImpl::new(app.storage.polls.clone(), votes, app.clock.clone())
    }

    #[tokio::test]
    async fn test_duplicate_rejected_by_store_after_read_is_already_voted() {
        let app = TestApp::new().await;
        let faculty = app.faculty("prof@uni.edu").await;
        let student = app.student("late@uni.edu").await;
        let poll = app.poll(&faculty, &["A", "B"]).await;

        let service = racing_service(&app, || RepositoryError::already_exists("Duplicate key: E11000 user_id_1_poll_id_1"));
        let err = service
            .submit_vote(&student, &oid(&poll.poll.id), &oid(&poll.options[0].id))
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::Conflict(ALREADY_VOTED.to_string()));
    }

    #[tokio::test]
    async fn test_write_conflict_is_retryable_not_internal() {
        let app = TestApp::new().await;
        let faculty = app.faculty("prof@uni.edu").await;
        let student = app.student("late@uni.edu").await;
        let poll = app.poll(&faculty, &["A", "B"]).await;

        let service = racing_service(&app, || RepositoryError::transient("Write conflict"));
        let err = service
            .submit_vote(&student, &oid(&poll.poll.id), &oid(&poll.options[0].id))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert!(matches!(err, ServiceError::Unavailable(_)));
    }
}

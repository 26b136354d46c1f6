mod common;

use chrono::Duration;

use common::{oid, poll_request, t0, TestApp};
use polling_backend::dto::poll_dto::{OptionRequest, ScheduleRequest, UpdatePollRequest};
use polling_backend::repository::poll_repo::PollRepository;
use polling_backend::service::lifecycle::PollStatus;
use polling_backend::util::error::ServiceError;

#[cfg(test)]
mod creation {
    use super::*;

    #[tokio::test]
    async fn test_faculty_creates_poll_with_options() {
        let app = TestApp::new().await;
        let faculty = app.faculty("prof@uni.edu").await;

        let poll = app.poll(&faculty, &["Rust", "Go", "Zig"]).await;
        assert_eq!(poll.poll.created_by, faculty.id.to_hex());
        assert_eq!(poll.poll.status, PollStatus::Open);
        assert_eq!(poll.poll.created_at, Some(t0()));
        let texts: Vec<&str> = poll.options.iter().map(|o| o.text.as_str()).collect();
        assert_eq!(texts, vec!["Rust", "Go", "Zig"]);
    }

    #[tokio::test]
    async fn test_student_cannot_create_poll_and_nothing_is_persisted() {
        let app = TestApp::new().await;
        let student = app.student("s1@uni.edu").await;

        let err = app
            .state
            .poll_service
            .create_poll(&student, poll_request("Q?", &["A", "B"], None, None))
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::Forbidden("Only faculty can create polls".to_string()));
        assert!(app.storage.polls.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_admin_cannot_create_poll() {
        let app = TestApp::new().await;
        let err = app
            .state
            .poll_service
            .create_poll(&app.admin, poll_request("Q?", &["A", "B"], None, None))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_poll_needs_two_options_and_a_question() {
        let app = TestApp::new().await;
        let faculty = app.faculty("prof@uni.edu").await;
        let polls = &app.state.poll_service;

        let err = polls.create_poll(&faculty, poll_request("Q?", &["Only"], None, None)).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        let err = polls.create_poll(&faculty, poll_request("   ", &["A", "B"], None, None)).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        let err = polls.create_poll(&faculty, poll_request("Q?", &["A", " "], None, None)).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        assert!(app.storage.polls.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_start_must_precede_end() {
        let app = TestApp::new().await;
        let faculty = app.faculty("prof@uni.edu").await;

        let err = app
            .state
            .poll_service
            .create_poll(&faculty, poll_request("Q?", &["A", "B"], Some(t0()), Some(t0())))
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::InvalidInput("Start time must be before end time".to_string()));
    }
}

#[cfg(test)]
mod ownership {
    use super::*;

    #[tokio::test]
    async fn test_only_owner_modifies_poll() {
        let app = TestApp::new().await;
        let owner = app.faculty("owner@uni.edu").await;
        let other = app.faculty("other@uni.edu").await;
        let poll = app.poll(&owner, &["A", "B"]).await;
        let poll_id = oid(&poll.poll.id);
        let update = UpdatePollRequest { question: "Renamed?".to_string(), is_active: false };

        for actor in [&other, &app.admin] {
            let err = app.state.poll_service.update_poll(actor, &poll_id, update.clone()).await.unwrap_err();
            assert!(matches!(err, ServiceError::Forbidden(ref m) if m.starts_with("Not owner")));
            let err = app.state.poll_service.delete_poll(actor, &poll_id).await.unwrap_err();
            assert!(matches!(err, ServiceError::Forbidden(_)));
        }

        let updated = app.state.poll_service.update_poll(&owner, &poll_id, update).await.unwrap();
        assert_eq!(updated.question, "Renamed?");
        assert_eq!(updated.status, PollStatus::Inactive);
    }

    #[tokio::test]
    async fn test_reschedule_changes_status() {
        let app = TestApp::new().await;
        let owner = app.faculty("owner@uni.edu").await;
        let poll = app.poll(&owner, &["A", "B"]).await;
        let poll_id = oid(&poll.poll.id);

        let later = ScheduleRequest { start_time: Some(t0() + Duration::hours(1)), end_time: None };
        let view = app.state.poll_service.reschedule_poll(&owner, &poll_id, later).await.unwrap();
        assert_eq!(view.status, PollStatus::Scheduled);

        let ended = ScheduleRequest { start_time: None, end_time: Some(t0()) };
        let view = app.state.poll_service.reschedule_poll(&owner, &poll_id, ended).await.unwrap();
        assert_eq!(view.status, PollStatus::Closed);

        let bad = ScheduleRequest { start_time: Some(t0()), end_time: Some(t0() - Duration::minutes(5)) };
        assert!(app.state.poll_service.reschedule_poll(&owner, &poll_id, bad).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_poll_cascades() {
        let app = TestApp::new().await;
        let owner = app.faculty("owner@uni.edu").await;
        let student = app.student("s1@uni.edu").await;
        let poll = app.poll(&owner, &["A", "B"]).await;
        let poll_id = oid(&poll.poll.id);
        app.state.vote_service.submit_vote(&student, &poll_id, &oid(&poll.options[0].id)).await.unwrap();

        app.state.poll_service.delete_poll(&owner, &poll_id).await.unwrap();

        assert!(app.storage.polls.get_by_id(&poll_id).await.unwrap().is_none());
        assert!(app.storage.polls.list_options(&poll_id).await.unwrap().is_empty());
        let err = app.state.vote_service.has_voted(&student, &poll_id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}

#[cfg(test)]
mod options {
    use super::*;

    #[tokio::test]
    async fn test_options_can_drop_below_two_after_creation() {
        let app = TestApp::new().await;
        let owner = app.faculty("owner@uni.edu").await;
        let poll = app.poll(&owner, &["A", "B"]).await;
        let poll_id = oid(&poll.poll.id);

        app.state.poll_service.delete_option(&owner, &oid(&poll.options[0].id)).await.unwrap();
        app.state.poll_service.delete_option(&owner, &oid(&poll.options[1].id)).await.unwrap();

        let details = app.state.poll_service.get_poll(&owner, &poll_id).await.unwrap();
        assert!(details.options.is_empty());
    }

    #[tokio::test]
    async fn test_add_and_rename_option() {
        let app = TestApp::new().await;
        let owner = app.faculty("owner@uni.edu").await;
        let other = app.faculty("other@uni.edu").await;
        let poll = app.poll(&owner, &["A", "B"]).await;
        let poll_id = oid(&poll.poll.id);

        let added = app
            .state
            .poll_service
            .add_option(&owner, &poll_id, OptionRequest { text: "C".to_string() })
            .await
            .unwrap();
        let err = app
            .state
            .poll_service
            .update_option(&other, &oid(&added.id), OptionRequest { text: "Hijacked".to_string() })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let renamed = app
            .state
            .poll_service
            .update_option(&owner, &oid(&added.id), OptionRequest { text: "  C++ ".to_string() })
            .await
            .unwrap();
        assert_eq!(renamed.text, "C++");

        let details = app.state.poll_service.get_poll(&owner, &poll_id).await.unwrap();
        assert_eq!(details.options.len(), 3);
    }

    #[tokio::test]
    async fn test_deleting_option_removes_its_votes() {
        let app = TestApp::new().await;
        let owner = app.faculty("owner@uni.edu").await;
        let s1 = app.student("s1@uni.edu").await;
        let s2 = app.student("s2@uni.edu").await;
        let poll = app.poll(&owner, &["A", "B"]).await;
        let poll_id = oid(&poll.poll.id);
        app.state.vote_service.submit_vote(&s1, &poll_id, &oid(&poll.options[0].id)).await.unwrap();
        app.state.vote_service.submit_vote(&s2, &poll_id, &oid(&poll.options[1].id)).await.unwrap();

        app.state.poll_service.delete_option(&owner, &oid(&poll.options[0].id)).await.unwrap();

        let results = app.state.poll_service.get_results(&owner, &poll_id).await.unwrap();
        assert_eq!(results.total_votes, 1);
        assert_eq!(results.results.len(), 1);
        assert_eq!(results.results[0].percentage, 100.0);
    }
}

#[cfg(test)]
mod results {
    use super::*;

    #[tokio::test]
    async fn test_three_to_one_results() {
        let app = TestApp::new().await;
        let owner = app.faculty("owner@uni.edu").await;
        let poll = app.poll(&owner, &["A", "B"]).await;
        let poll_id = oid(&poll.poll.id);
        let (a, b) = (oid(&poll.options[0].id), oid(&poll.options[1].id));

        for (i, option) in [a, a, a, b].iter().enumerate() {
            let student = app.student(&format!("s{}@uni.edu", i)).await;
            app.state.vote_service.submit_vote(&student, &poll_id, option).await.unwrap();
        }

        let results = app.state.poll_service.get_results(&owner, &poll_id).await.unwrap();
        assert_eq!(results.total_votes, 4);
        assert_eq!((results.results[0].text.as_str(), results.results[0].vote_count), ("A", 3));
        assert_eq!(results.results[0].percentage, 75.0);
        assert_eq!((results.results[1].text.as_str(), results.results[1].vote_count), ("B", 1));
        assert_eq!(results.results[1].percentage, 25.0);
    }

    #[tokio::test]
    async fn test_zero_votes_give_zero_percent() {
        let app = TestApp::new().await;
        let owner = app.faculty("owner@uni.edu").await;
        let poll = app.poll(&owner, &["A", "B", "C"]).await;

        let results = app.state.poll_service.get_results(&app.admin, &oid(&poll.poll.id)).await.unwrap();
        assert_eq!(results.total_votes, 0);
        assert!(results.results.iter().all(|r| r.percentage == 0.0 && !r.percentage.is_nan()));
    }

    #[tokio::test]
    async fn test_results_visibility() {
        let app = TestApp::new().await;
        let owner = app.faculty("owner@uni.edu").await;
        let other = app.faculty("other@uni.edu").await;
        let student = app.student("s1@uni.edu").await;
        let poll_id = oid(&app.poll(&owner, &["A", "B"]).await.poll.id);

        assert!(app.state.poll_service.get_results(&app.admin, &poll_id).await.is_ok());
        assert!(matches!(
            app.state.poll_service.get_results(&other, &poll_id).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            app.state.poll_service.get_results(&student, &poll_id).await,
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_reset_votes_clears_tallies() {
        let app = TestApp::new().await;
        let owner = app.faculty("owner@uni.edu").await;
        let student = app.student("s1@uni.edu").await;
        let poll = app.poll(&owner, &["A", "B"]).await;
        let poll_id = oid(&poll.poll.id);
        app.state.vote_service.submit_vote(&student, &poll_id, &oid(&poll.options[0].id)).await.unwrap();

        let reset = app.state.poll_service.reset_votes(&owner, &poll_id).await.unwrap();
        assert_eq!(reset.deleted_votes, 1);

        // The student may vote again once the poll is reset.
        assert!(app.state.vote_service.submit_vote(&student, &poll_id, &oid(&poll.options[1].id)).await.is_ok());
    }

    #[tokio::test]
    async fn test_listings_with_results_are_scoped() {
        let app = TestApp::new().await;
        let f1 = app.faculty("f1@uni.edu").await;
        let f2 = app.faculty("f2@uni.edu").await;
        app.poll(&f1, &["A", "B"]).await;
        app.poll(&f1, &["C", "D"]).await;
        app.poll(&f2, &["E", "F"]).await;

        assert_eq!(app.state.poll_service.list_own_with_results(&f1).await.unwrap().len(), 2);
        assert_eq!(app.state.poll_service.list_own_with_results(&f2).await.unwrap().len(), 1);
        assert_eq!(app.state.poll_service.list_all_with_results(&app.admin).await.unwrap().len(), 3);
        assert!(app.state.poll_service.list_all_with_results(&f1).await.is_err());
        assert!(app.state.poll_service.list_own_with_results(&app.admin).await.is_err());
    }
}

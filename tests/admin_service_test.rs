mod common;

use common::TestApp;
use polling_backend::dto::user_dto::{AdminResetPasswordRequest, CreateAccountRequest};
use polling_backend::model::user::Role;
use polling_backend::repository::poll_repo::PollRepository;
use polling_backend::repository::vote_repo::VoteRepository;
use polling_backend::util::error::ServiceError;

fn account(email: &str, role: &str) -> CreateAccountRequest {
    CreateAccountRequest { email: email.to_string(), password: "account-pass".to_string(), role: role.to_string() }
}

#[cfg(test)]
mod accounts {
    use super::*;

    #[tokio::test]
    async fn test_admin_creates_faculty_with_creator_recorded() {
        let app = TestApp::new().await;
        let faculty = app.state.admin_service.create_account(&app.admin, account("prof@uni.edu", "faculty")).await.unwrap();

        assert_eq!(faculty.role, Role::Faculty);
        assert_eq!(faculty.created_by, Some(app.admin.id.to_hex()));
    }

    #[tokio::test]
    async fn test_non_admin_cannot_create_accounts() {
        let app = TestApp::new().await;
        let faculty = app.faculty("prof@uni.edu").await;

        let err = app.state.admin_service.create_account(&faculty, account("x@uni.edu", "faculty")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_admin_cannot_create_students_or_unknown_roles() {
        let app = TestApp::new().await;
        let err = app.state.admin_service.create_account(&app.admin, account("s@uni.edu", "student")).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        let err = app.state.admin_service.create_account(&app.admin, account("s@uni.edu", "dean")).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_account_email_is_trimmed_before_validation() {
        let app = TestApp::new().await;
        let err = app.state.admin_service.create_account(&app.admin, account("  x  ", "faculty")).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        let faculty =
            app.state.admin_service.create_account(&app.admin, account(" prof@uni.edu  ", "faculty")).await.unwrap();
        assert_eq!(faculty.email, "prof@uni.edu");
    }

    #[tokio::test]
    async fn test_list_users_filters_by_role() {
        let app = TestApp::new().await;
        app.faculty("prof@uni.edu").await;
        app.student("s1@uni.edu").await;
        app.student("s2@uni.edu").await;

        let all = app.state.admin_service.list_users(&app.admin, None).await.unwrap();
        let students = app.state.admin_service.list_users(&app.admin, Some(Role::Student)).await.unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(students.len(), 2);
        assert!(students.iter().all(|u| u.role == Role::Student));
    }
}

#[cfg(test)]
mod deletion {
    use super::*;

    #[tokio::test]
    async fn test_admin_cannot_delete_own_account() {
        let app = TestApp::new().await;
        // A second admin does not change the outcome.
        app.state.admin_service.create_account(&app.admin, account("admin2@uni.edu", "admin")).await.unwrap();

        let err = app.state.admin_service.delete_user(&app.admin, &app.admin.id).await.unwrap_err();
        assert_eq!(err, ServiceError::Forbidden("Cannot delete own account".to_string()));
    }

    #[tokio::test]
    async fn test_admin_accounts_cannot_be_deleted() {
        let app = TestApp::new().await;
        let other = app.state.admin_service.create_account(&app.admin, account("admin2@uni.edu", "admin")).await.unwrap();

        let err = app.state.admin_service.delete_user(&app.admin, &common::oid(&other.id)).await.unwrap_err();
        assert_eq!(err, ServiceError::Forbidden("Cannot delete admin accounts".to_string()));
    }

    #[tokio::test]
    async fn test_deleting_faculty_cascades_polls_options_and_votes() {
        let app = TestApp::new().await;
        let faculty = app.faculty("prof@uni.edu").await;
        let student = app.student("s1@uni.edu").await;
        let poll = app.poll(&faculty, &["A", "B"]).await;
        let poll_id = common::oid(&poll.poll.id);
        app.state.vote_service.submit_vote(&student, &poll_id, &common::oid(&poll.options[0].id)).await.unwrap();

        app.state.admin_service.delete_user(&app.admin, &faculty.id).await.unwrap();

        assert!(app.storage.polls.list_by_creator(&faculty.id).await.unwrap().is_empty());
        assert!(app.storage.polls.list_options(&poll_id).await.unwrap().is_empty());
        assert!(app.storage.votes.list_by_user(&student.id).await.unwrap().is_empty());
        let err = app.state.admin_service.get_user(&app.admin, &faculty.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_deleting_student_removes_their_votes() {
        let app = TestApp::new().await;
        let faculty = app.faculty("prof@uni.edu").await;
        let student = app.student("s1@uni.edu").await;
        let poll = app.poll(&faculty, &["A", "B"]).await;
        let poll_id = common::oid(&poll.poll.id);
        app.state.vote_service.submit_vote(&student, &poll_id, &common::oid(&poll.options[1].id)).await.unwrap();

        app.state.admin_service.delete_user(&app.admin, &student.id).await.unwrap();

        assert!(app.storage.votes.list_by_user(&student.id).await.unwrap().is_empty());
        let results = app.state.poll_service.get_results(&faculty, &poll_id).await.unwrap();
        assert_eq!(results.total_votes, 0);
    }

    #[tokio::test]
    async fn test_delete_unknown_user_is_not_found() {
        let app = TestApp::new().await;
        let err = app.state.admin_service.delete_user(&app.admin, &bson::oid::ObjectId::new()).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}

#[cfg(test)]
mod roles {
    use super::*;

    #[tokio::test]
    async fn test_student_promoted_to_faculty_can_create_polls() {
        let app = TestApp::new().await;
        let student = app.student("s1@uni.edu").await;

        let updated = app.state.admin_service.change_role(&app.admin, &student.id, Role::Faculty).await.unwrap();
        assert_eq!(updated.role, Role::Faculty);

        let promoted = common::actor_of(&updated);
        assert!(app
            .state
            .poll_service
            .create_poll(&promoted, common::poll_request("Q?", &["A", "B"], None, None))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_admin_is_never_a_role_transition_target_or_source() {
        let app = TestApp::new().await;
        let student = app.student("s1@uni.edu").await;
        let other_admin =
            app.state.admin_service.create_account(&app.admin, account("admin2@uni.edu", "admin")).await.unwrap();

        let err = app.state.admin_service.change_role(&app.admin, &student.id, Role::Admin).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        let err = app
            .state
            .admin_service
            .change_role(&app.admin, &common::oid(&other_admin.id), Role::Student)
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::Forbidden("Cannot change admin user roles".to_string()));

        let err = app.state.admin_service.change_role(&app.admin, &app.admin.id, Role::Faculty).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_admin_reset_password() {
        let app = TestApp::new().await;
        let student = app.student("s1@uni.edu").await;

        let err = app
            .state
            .admin_service
            .reset_password(&app.admin, &student.id, AdminResetPasswordRequest { new_password: "123".to_string() })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        app.state
            .admin_service
            .reset_password(&app.admin, &student.id, AdminResetPasswordRequest { new_password: "reset-pass".to_string() })
            .await
            .unwrap();
        assert!(app.state.user_service.login("s1@uni.edu".to_string(), "reset-pass".to_string()).await.is_ok());
    }
}

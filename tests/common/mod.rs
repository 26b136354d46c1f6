#![allow(dead_code)]

use std::sync::Arc;

use bson::oid::ObjectId;
use chrono::{DateTime, TimeZone, Utc};

use polling_backend::app::app::{build_router, AppState, Storage};
use polling_backend::config::JwtConfig;
use polling_backend::dto::poll_dto::{CreatePollRequest, PollDetails};
use polling_backend::dto::user_dto::{CreateAccountRequest, RegisterRequest, UserView};
use polling_backend::model::user::Role;
use polling_backend::service::policy::Actor;
use polling_backend::util::clock::ManualClock;

pub const ADMIN_EMAIL: &str = "admin@uni.edu";
pub const ADMIN_PASSWORD: &str = "admin-secret";

/// Initialize tracing for tests
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_env_filter("debug").with_test_writer().try_init();
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 15, 10, 0, 0).unwrap()
}

/// In-memory application with a clock that only moves when the test says so.
pub struct TestApp {
    pub state: AppState,
    pub storage: Storage,
    pub clock: Arc<ManualClock>,
    pub admin: Actor,
}

impl TestApp {
    pub async fn new() -> Self {
        init_tracing();
        let storage = Storage::in_memory();
        let clock = Arc::new(ManualClock::new(t0()));
        let state = AppState::new(storage.clone(), JwtConfig::default(), clock.clone());

        let admin = state
            .user_service
            .bootstrap_admin(ADMIN_EMAIL, ADMIN_PASSWORD)
            .await
            .expect("bootstrap admin")
            .expect("admin created on empty store");

        TestApp { state, storage, clock, admin: actor_of(&admin) }
    }

    pub fn router(&self) -> axum::Router {
        build_router(&self.state)
    }

    pub async fn student(&self, email: &str) -> Actor {
        let user = self
            .state
            .user_service
            .register_student(RegisterRequest { email: email.to_string(), password: "student-pass".to_string() })
            .await
            .expect("register student");
        actor_of(&user)
    }

    pub async fn faculty(&self, email: &str) -> Actor {
        let user = self
            .state
            .admin_service
            .create_account(
                &self.admin,
                CreateAccountRequest {
                    email: email.to_string(),
                    password: "faculty-pass".to_string(),
                    role: "faculty".to_string(),
                },
            )
            .await
            .expect("create faculty");
        actor_of(&user)
    }

    pub async fn poll(&self, owner: &Actor, options: &[&str]) -> PollDetails {
        self.scheduled_poll(owner, options, None, None).await
    }

    pub async fn scheduled_poll(
        &self,
        owner: &Actor,
        options: &[&str],
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
    ) -> PollDetails {
        self.state
            .poll_service
            .create_poll(owner, poll_request("Which option?", options, start_time, end_time))
            .await
            .expect("create poll")
    }
}

pub fn poll_request(
    question: &str,
    options: &[&str],
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
) -> CreatePollRequest {
    CreatePollRequest {
        question: question.to_string(),
        options: options.iter().map(|o| o.to_string()).collect(),
        start_time,
        end_time,
    }
}

pub fn actor_of(user: &UserView) -> Actor {
    Actor::new(oid(&user.id), user.role)
}

pub fn oid(hex: &str) -> ObjectId {
    ObjectId::parse_str(hex).expect("valid object id")
}

pub fn student_actor_without_account() -> Actor {
    Actor::new(ObjectId::new(), Role::Student)
}

use std::time::Duration;

use bson::doc;
use mongodb::options::{ClientOptions, Credential, FindOptions, IndexOptions, ResolverConfig};
use mongodb::{Client, Collection, Database, IndexModel};
use tracing::{info, instrument};

use crate::config::mongo_conf::MongoConfig;
use crate::model::poll::{Poll, PollOption};
use crate::model::user::User;
use crate::model::vote::Vote;
use crate::repository::repository_error::RepositoryResult;

pub const USERS: &str = "users";
pub const POLLS: &str = "polls";
pub const POLL_OPTIONS: &str = "poll_options";
pub const VOTES: &str = "votes";

/// Newest first by `created_at`, ids breaking ties between records stamped in the same millisecond.
pub fn newest_first() -> FindOptions {
    FindOptions::builder().sort(doc! { "created_at": -1, "_id": -1 }).build()
}

/// Shared MongoDB client. Transactions need the client, so all repositories hang off one handle.
#[derive(Clone)]
pub struct MongoHandle {
    pub client: Client,
    pub database: Database,
    pub operation_timeout: Duration,
}

impl MongoHandle {
    pub async fn connect(config: &MongoConfig) -> Result<Self, mongodb::error::Error> {
        let mut client_options = ClientOptions::parse_with_resolver_config(&config.uri, ResolverConfig::cloudflare()).await?;
        client_options.app_name = Some("PollingBackend".to_string());
        client_options.max_pool_size = Some(config.pool_size);
        client_options.connect_timeout = Some(Duration::from_secs(config.connection_timeout_secs));
        client_options.server_selection_timeout = Some(Duration::from_secs(config.connection_timeout_secs));
        if let (Some(ref username), Some(ref password)) = (&config.username, &config.password) {
            client_options.credential = Some(Credential::builder()
                .username(username.clone())
                .password(password.clone())
                .build());
        }
        let client = Client::with_options(client_options)?;
        let database = client.database(&config.database);
        info!(database = %config.database, "MongoDB client created");
        Ok(MongoHandle {
            client,
            database,
            operation_timeout: Duration::from_secs(config.operation_timeout_secs),
        })
    }

    pub fn users(&self) -> Collection<User> {
        self.database.collection::<User>(USERS)
    }

    pub fn polls(&self) -> Collection<Poll> {
        self.database.collection::<Poll>(POLLS)
    }

    pub fn options(&self) -> Collection<PollOption> {
        self.database.collection::<PollOption>(POLL_OPTIONS)
    }

    pub fn votes(&self) -> Collection<Vote> {
        self.database.collection::<Vote>(VOTES)
    }

    /// Creates the unique indexes the services rely on for email and one-vote-per-poll.
    #[instrument(skip(self))]
    pub async fn ensure_indexes(&self) -> RepositoryResult<()> {
        let unique = IndexOptions::builder().unique(true).build();

        self.users()
            .create_index(IndexModel::builder().keys(doc! { "email": 1 }).options(unique.clone()).build(), None)
            .await?;
        self.votes()
            .create_index(
                IndexModel::builder().keys(doc! { "user_id": 1, "poll_id": 1 }).options(unique).build(),
                None,
            )
            .await?;
        self.votes()
            .create_index(IndexModel::builder().keys(doc! { "poll_id": 1 }).build(), None)
            .await?;
        self.options()
            .create_index(IndexModel::builder().keys(doc! { "poll_id": 1 }).build(), None)
            .await?;
        self.polls()
            .create_index(IndexModel::builder().keys(doc! { "created_by": 1, "created_at": -1 }).build(), None)
            .await?;
        self.users()
            .create_index(IndexModel::builder().keys(doc! { "role": 1, "created_at": -1 }).build(), None)
            .await?;

        info!("MongoDB indexes ensured");
        Ok(())
    }
}

use std::sync::Arc;

use engine::{committee::Committee, meeting::Meeting, user::User};
use mongodb::Collection;

use super::{config::Config, database::init_mongo};

pub struct AppState {
    pub config: Config,
    pub users: Collection<User>,
    pub committees: Collection<Committee>,
    pub meetings: Collection<Meeting>,
}

impl AppState {
    pub async fn new() -> Arc<Self> {
        let config = Config::load();

        let db = init_mongo(&config.mongo_url, &config.mongo_db).await;

        Arc::new(Self {
            users: db.collection("users"),
            committees: db.collection("committees"),
            meetings: db.collection("meetings"),
            config,
        })
    }
}

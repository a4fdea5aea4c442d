use std::sync::Arc;

use scribe_db::Database;

use crate::cache::PostCache;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub cache: PostCache,
}

impl AppStateInner {
    pub fn new(db: Database) -> AppState {
        Arc::new(Self {
            db,
            cache: PostCache::new(),
        })
    }
}

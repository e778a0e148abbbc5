use std::sync::Arc;

use crate::auth::AdminCredentials;
use crate::db::Database;
use crate::session::{MemorySessionStore, SessionStore};

pub struct AppState {
    pub db: Database,
    pub sessions: Arc<dyn SessionStore>,
    pub admin: AdminCredentials,
}

impl AppState {
    pub fn new(db: Database, admin: AdminCredentials) -> Arc<Self> {
        Self::with_sessions(db, admin, Arc::new(MemorySessionStore::new()))
    }

    pub fn with_sessions(
        db: Database,
        admin: AdminCredentials,
        sessions: Arc<dyn SessionStore>,
    ) -> Arc<Self> {
        Arc::new(Self {
            db,
            sessions,
            admin,
        })
    }
}

use std::sync::Arc;

use crate::auth::JwtValidator;
use crate::db::ShareStore;
use crate::domain::ShareSettings;

/// Shared handler state, cloned per request
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ShareStore>,
    pub settings: ShareSettings,
    pub jwt: Arc<JwtValidator>,
}

impl AppState {
    pub fn new(store: Arc<dyn ShareStore>, settings: ShareSettings, jwt: JwtValidator) -> Self {
        Self {
            store,
            settings,
            jwt: Arc::new(jwt),
        }
    }
}

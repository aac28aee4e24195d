use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;

use super::config::ServerSettings;
use crate::curator::Curator;

/// Shared state for route handlers.
pub(super) struct ServerState<V, C> {
    pub(super) curator: Arc<Curator<V, C>>,
    pub(super) settings: ServerSettings,
}

// Manual Clone: avoid derive adding `V: Clone, C: Clone` bounds.
impl<V, C> Clone for ServerState<V, C> {
    fn clone(&self) -> Self {
        Self {
            curator: self.curator.clone(),
            settings: self.settings.clone(),
        }
    }
}

// PrivateCookieJar requires Key to be extractable from state
impl<V, C> FromRef<ServerState<V, C>> for Key {
    fn from_ref(state: &ServerState<V, C>) -> Self {
        state.settings.cookie_key.clone()
    }
}

use std::collections::HashSet;

use crate::entity::user;

/// Decides who may moderate. Injected into the application state.
pub trait AuthorizationPolicy: Send + Sync {
    fn is_moderator(&self, user: &user::Model) -> bool;
}

/// Fixed set of external identities, read from configuration at startup.
#[derive(Debug, Clone, Default)]
pub struct ModeratorSet {
    ids: HashSet<String>,
}

impl ModeratorSet {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }
}

impl AuthorizationPolicy for ModeratorSet {
    fn is_moderator(&self, user: &user::Model) -> bool {
        self.ids.contains(&user.external_id)
    }
}

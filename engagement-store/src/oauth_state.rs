use async_trait::async_trait;
use engagement_core::Result;
use engagement_core::model::OAuthState;

/// §6.3 "OAuth States" table. `consume` is the only read path and must be
/// atomic delete-on-read (spec §5: "the OAuth state table is ... consumed
/// atomically by delete-on-read").
#[async_trait]
pub trait OAuthStateStore: Send + Sync {
    async fn create(&self, state: OAuthState) -> Result<()>;

    /// Removes and returns the state for `token` in one step, or `None`
    /// if no such token was ever created or it was already consumed.
    /// Callers are responsible for checking `is_expired` on the returned
    /// value — an expired-but-present row is still removed so it cannot
    /// be replayed.
    async fn consume(&self, token: &str) -> Result<Option<OAuthState>>;
}

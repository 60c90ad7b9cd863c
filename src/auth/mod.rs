mod user;

pub use user::{User, ROLE_ADMIN, ROLE_CUSTOMER, ROLE_DRIVER};

use async_trait::async_trait;
use uuid::Uuid;

/// Lookup into the external identity provider for the little public profile
/// data the core exposes (a display name on the share view). The provider
/// itself is not part of this service.
#[async_trait]
pub trait ActorDirectory: Send + Sync {
    async fn display_name(&self, id: Uuid) -> Option<String>;
}

/// Directory for deployments without an identity sidecar configured.
pub struct NullDirectory;

#[async_trait]
impl ActorDirectory for NullDirectory {
    async fn display_name(&self, _id: Uuid) -> Option<String> {
        None
    }
}

//! Collaborator contracts for the storage layer.
//!
//! The core never touches storage itself; whoever embeds it supplies these
//! and keeps schema, migration and CRUD concerns on their side of the fence.

use async_trait::async_trait;
use uuid::Uuid;

use crate::model::{Server, UserView};

#[async_trait]
pub trait ServerRepository: Send + Sync + 'static {
    async fn get_by_uid(&self, uid: Uuid) -> anyhow::Result<Option<Server>>;
    async fn get_all(&self) -> anyhow::Result<Vec<Server>>;
    async fn get_user_servers(&self, username: &str) -> anyhow::Result<Vec<Server>>;
}

#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    async fn get_user(&self, username: &str) -> anyhow::Result<Option<UserView>>;
}

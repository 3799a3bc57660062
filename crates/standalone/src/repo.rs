//! In-memory repositories seeded from configuration. Real persistence is an
//! embedding concern; every configured user sees every configured server.

use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use webrcon::model::{Server, UserView};
use webrcon::repo::{ServerRepository, UserRepository};

pub struct InMemoryServerRepository {
    servers: HashMap<Uuid, Server>,
}

impl InMemoryServerRepository {
    pub fn new(servers: impl IntoIterator<Item = Server>) -> Self {
        Self {
            servers: servers.into_iter().map(|s| (s.uid, s)).collect(),
        }
    }
}

#[async_trait]
impl ServerRepository for InMemoryServerRepository {
    async fn get_by_uid(&self, uid: Uuid) -> anyhow::Result<Option<Server>> {
        Ok(self.servers.get(&uid).cloned())
    }

    async fn get_all(&self) -> anyhow::Result<Vec<Server>> {
        Ok(self.servers.values().cloned().collect())
    }

    async fn get_user_servers(&self, _username: &str) -> anyhow::Result<Vec<Server>> {
        self.get_all().await
    }
}

pub struct InMemoryUserRepository {
    users: HashMap<String, UserView>,
}

impl InMemoryUserRepository {
    pub fn new(users: impl IntoIterator<Item = UserView>) -> Self {
        Self {
            users: users.into_iter().map(|u| (u.username.clone(), u)).collect(),
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn get_user(&self, username: &str) -> anyhow::Result<Option<UserView>> {
        Ok(self.users.get(username).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use webrcon::model::ServerKind;

    fn server(name: &str) -> Server {
        Server {
            uid: Uuid::new_v4(),
            kind: ServerKind::Minecraft,
            name: name.to_owned(),
            host: "localhost".to_owned(),
            port: 25565,
            rcon_port: 25575,
            rcon_password: "pw".to_owned(),
            description: String::new(),
        }
    }

    #[tokio::test]
    async fn lookups_by_uid_and_user() {
        let a = server("a");
        let uid = a.uid;
        let repo = InMemoryServerRepository::new([a, server("b")]);

        assert_eq!(repo.get_by_uid(uid).await.unwrap().unwrap().name, "a");
        assert!(repo.get_by_uid(Uuid::new_v4()).await.unwrap().is_none());
        assert_eq!(repo.get_user_servers("anyone").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn user_lookup() {
        let repo = InMemoryUserRepository::new([UserView {
            username: "admin".to_owned(),
            disabled: false,
        }]);
        assert!(repo.get_user("admin").await.unwrap().is_some());
        assert!(repo.get_user("ghost").await.unwrap().is_none());
    }
}

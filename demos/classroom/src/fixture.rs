//! The TOML classroom the demo serves: classes, users, tokens, and a few
//! hub knobs.

use std::path::Path;
use std::time::Duration;

use rollcall::prelude::*;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub hub: HubSection,
    #[serde(default)]
    pub classes: Vec<ClassEntry>,
    #[serde(default)]
    pub users: Vec<UserEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HubSection {
    pub store_timeout_secs: u64,
    pub lookup_timeout_secs: u64,
    pub restart: Restart,
    pub relay: Relay,
}

impl Default for HubSection {
    fn default() -> Self {
        let defaults = HubConfig::default();
        Self {
            store_timeout_secs: defaults.store_timeout.as_secs(),
            lookup_timeout_secs: defaults.lookup_timeout.as_secs(),
            restart: Restart::Replace,
            relay: Relay::FirstConnected,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Restart {
    Replace,
    Reject,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Relay {
    FirstConnected,
    MostRecent,
}

#[derive(Debug, Deserialize)]
pub struct ClassEntry {
    pub id: String,
    pub students: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserEntry {
    pub id: String,
    pub name: String,
    pub role: Role,
    pub token: String,
}

impl Fixture {
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    pub fn hub_config(&self) -> HubConfig {
        let mut config = HubConfig {
            store_timeout: Duration::from_secs(self.hub.store_timeout_secs),
            lookup_timeout: Duration::from_secs(self.hub.lookup_timeout_secs),
            relay_policy: match self.hub.relay {
                Relay::FirstConnected => RelayPolicy::FirstConnected,
                Relay::MostRecent => RelayPolicy::MostRecent,
            },
            ..HubConfig::default()
        };
        config.session.restart = match self.hub.restart {
            Restart::Replace => RestartPolicy::Replace,
            Restart::Reject => RestartPolicy::Reject,
        };
        config
    }

    pub fn tokens(&self) -> StaticTokens {
        let mut tokens = StaticTokens::new();
        for user in &self.users {
            tokens.insert(user.token.clone(), Identity::new(user.id.clone(), user.role));
        }
        tokens
    }

    pub fn store(&self) -> MemoryStore {
        let store = self
            .classes
            .iter()
            .fold(MemoryStore::new(), |store, class| {
                store.with_class(class.id.clone(), class.students.iter().cloned())
            });
        self.users
            .iter()
            .fold(store, |store, user| store.with_user(user.id.clone(), user.name.clone()))
    }
}

use std::sync::Arc;

use chrono::Duration;
use log::{error, info, warn};
use rocket::{
    fairing::{Fairing, Info, Kind},
    tokio::{self, time},
    Build, Orbit, Rocket,
};
use serde::Deserialize;

use crate::model::{election::DEFAULT_CANDIDATES, HashCost};
use crate::store::{ElectionStore, MemoryStore, SessionStore, Store};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_candidates")]
    candidates: Vec<String>,
    #[serde(default)]
    password_hash: HashCost,
    #[serde(default)]
    session_ttl: Option<u32>,
    #[serde(default = "default_reap_interval")]
    reap_interval: u32,
}

fn default_candidates() -> Vec<String> {
    DEFAULT_CANDIDATES.iter().map(|name| name.to_string()).collect()
}

fn default_reap_interval() -> u32 {
    60
}

impl Config {
    /// Names of the candidates seeded at startup, in ID order.
    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// argon2 cost for newly hashed passwords.
    pub fn password_hash(&self) -> HashCost {
        self.password_hash
    }

    /// Lifetime of a session in seconds, if sessions expire at all.
    pub fn session_ttl(&self) -> Option<Duration> {
        self.session_ttl.map(|secs| Duration::seconds(secs.into()))
    }

    /// Seconds between sweeps for expired sessions.
    pub fn reap_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.reap_interval.max(1).into())
    }
}

/// A fairing that loads the application config and puts it in managed state.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// A fairing that builds the store from the managed [`Config`], seeds the
/// candidates, and places the shared [`Store`] into managed state. Must be
/// attached after [`ConfigFairing`].
pub struct StoreFairing;

#[rocket::async_trait]
impl Fairing for StoreFairing {
    fn info(&self) -> Info {
        Info {
            name: "Store",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let Some(config) = rocket.state::<Config>() else {
            error!("Store requested before the config was loaded");
            return Err(rocket);
        };

        let store = match MemoryStore::new(config.password_hash()) {
            Ok(store) => store.with_session_ttl(config.session_ttl()),
            Err(e) => {
                error!("Failed to create store: {e}");
                return Err(rocket);
            }
        };
        if let Err(e) = store.seed_candidates(config.candidates()) {
            error!("Failed to seed candidates: {e}");
            return Err(rocket);
        }
        info!("Store ready");

        let store: Store = Arc::new(store);
        Ok(rocket.manage(store))
    }
}

/// A fairing that, when sessions expire, periodically sweeps the expired
/// ones out of the store. The sweep runs until the runtime shuts down.
pub struct SessionReaperFairing;

#[rocket::async_trait]
impl Fairing for SessionReaperFairing {
    fn info(&self) -> Info {
        Info {
            name: "Session reaper",
            kind: Kind::Liftoff,
        }
    }

    async fn on_liftoff(&self, rocket: &Rocket<Orbit>) {
        let (Some(config), Some(store)) = (rocket.state::<Config>(), rocket.state::<Store>())
        else {
            warn!("Session reaper has no config or store, not starting");
            return;
        };
        if config.session_ttl().is_none() {
            return;
        }

        let store = Arc::clone(store);
        let mut interval = time::interval(config.reap_interval());
        tokio::spawn(async move {
            loop {
                interval.tick().await;
                let purged = store.purge_expired_sessions();
                if purged > 0 {
                    info!("Purged {purged} expired sessions");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use rocket::figment::{
        providers::{Format, Toml},
        Figment,
    };

    use super::*;

    fn config_from(toml: &str) -> Config {
        Figment::from(Toml::string(toml)).extract().unwrap()
    }

    #[test]
    fn defaults() {
        let config = config_from("");
        assert_eq!(default_candidates(), config.candidates());
        assert_eq!(HashCost::default(), config.password_hash());
        assert_eq!(None, config.session_ttl());
        assert_eq!(std::time::Duration::from_secs(60), config.reap_interval());
    }

    #[test]
    fn overrides() {
        let config = config_from(
            r#"
            candidates = ["Dave", "Eve"]
            session_ttl = 3600
            reap_interval = 0

            [password_hash]
            mem_cost = 4096
            time_cost = 3
            lanes = 2
            "#,
        );
        assert_eq!(["Dave".to_string(), "Eve".to_string()], config.candidates());
        assert_eq!(Some(Duration::hours(1)), config.session_ttl());
        assert_eq!(std::time::Duration::from_secs(1), config.reap_interval());
        assert_eq!(
            HashCost {
                mem_cost: 4096,
                time_cost: 3,
                lanes: 2,
            },
            config.password_hash()
        );
    }

    #[test]
    fn shipped_config_never_expires_sessions() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/Rocket.toml");
        let config: Config = Figment::from(Toml::file(path).nested())
            .select("default")
            .extract()
            .unwrap();
        assert_eq!(None, config.session_ttl());
        assert_eq!(default_candidates(), config.candidates());
    }

    #[test]
    fn partial_hash_cost_keeps_defaults() {
        let config = config_from("password_hash = { time_cost = 4 }");
        assert_eq!(4, config.password_hash().time_cost);
        assert_eq!(HashCost::default().mem_cost, config.password_hash().mem_cost);
    }
}

#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

use crate::config::{ConfigFairing, SessionReaperFairing, StoreFairing};
use crate::cors::CorsFairing;
use crate::logging::LoggerFairing;
use crate::store::Store;

pub mod api;
pub mod config;
pub mod cors;
pub mod error;
pub mod logging;
pub mod model;
pub mod store;

pub use config::Config;

/// Build the server. The store is created and seeded from the config
/// during ignition.
pub fn build() -> Rocket<Build> {
    mount(rocket::build())
        .attach(ConfigFairing)
        .attach(StoreFairing)
        .attach(SessionReaperFairing)
}

/// Build the server around an existing store instead of configuring one.
pub fn rocket_for_store(store: Store) -> Rocket<Build> {
    mount(rocket::build()).manage(store)
}

fn mount(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket
        .attach(LoggerFairing::default())
        .attach(CorsFairing)
        .mount("/", cors::routes())
        .mount("/api", api::routes())
        .register("/", api::catchers())
}

/// A fresh store for each test: cheap hashing, default candidates.
#[cfg(test)]
fn test_store() -> Store {
    std::sync::Arc::new(store::MemoryStore::example())
}

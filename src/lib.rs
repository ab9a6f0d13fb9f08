#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod mail;
pub mod model;

pub use config::Config;

/// Build the server, with all fairings attached. Configuration, the database
/// connection and the mail client are loaded at ignition.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .attach(logging::LoggerFairing)
        .attach(config::ConfigFairing)
        .attach(config::DatabaseFairing)
        .attach(config::MailFairing)
        .mount("/", api::routes())
        .register("/", api::catchers())
}

/// Build a server for an existing database connection and mail client,
/// skipping the database and mail fairings.
#[cfg(test)]
pub(crate) async fn rocket_for_db_and_mailer(
    db_client: mongodb::Client,
    db_name: &str,
    mailer: aws_sdk_sesv2::Client,
) -> Rocket<Build> {
    let db = db_client.database(db_name);
    model::mongodb::ensure_indexes_exist(&db).await.unwrap();

    rocket::build()
        .attach(config::ConfigFairing)
        .mount("/", api::routes())
        .register("/", api::catchers())
        .manage(db_client)
        .manage(db)
        .manage(mailer)
}

/// Connect to the test database server named by `ROCKET_DB_URI`.
#[cfg(test)]
pub(crate) async fn db_client() -> mongodb::Client {
    let db_uri =
        std::env::var("ROCKET_DB_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
    mongodb::Client::with_uri_str(db_uri).await.unwrap()
}

/// A fresh database name, so that concurrent tests do not collide.
#[cfg(test)]
pub(crate) fn database() -> String {
    let random: u32 = rand::random();
    format!("test{random}")
}

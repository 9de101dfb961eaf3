#[macro_use]
extern crate rocket;

mod config;
mod http;

use std::sync::Arc;

use config::AuthorizationConfig;
use http::publish_routes::{connection, environments, publish, DeploymentLocks};
use rocket::fairing::AdHoc;

#[launch]
fn rocket() -> _ {
    let figment = config::figment();
    let publisher = match hoist_deployment::config::publisher(&figment) {
        Ok(publisher) => publisher,
        Err(e) => {
            error!("Failed to configure the publisher: {}", e);
            std::process::exit(1);
        }
    };

    let locks = DeploymentLocks::new(publisher.environments());

    rocket::custom(figment)
        .mount("/", routes![publish, environments, connection])
        .manage(locks)
        .manage(Arc::new(publisher))
        .attach(AdHoc::config::<AuthorizationConfig>())
}

#[cfg(test)]
fn rocket_test() -> rocket::Rocket<rocket::Build> {
    std::env::set_var("HOIST_PROFILE", "test");
    rocket()
}

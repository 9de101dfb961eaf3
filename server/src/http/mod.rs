pub mod auth;
pub mod publish_routes;

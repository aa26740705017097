//! Adapters implementing the app ports

pub mod fixture_store;
pub mod http_client;

pub use fixture_store::FixtureStore;
pub use http_client::RestPropertyApi;

pub mod api_server;
pub mod credential_engine;
pub mod did_system;
pub mod identity_registry;

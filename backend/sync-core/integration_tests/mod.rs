mod config_env;
mod content_fetch;
mod controller;
mod helpers;
mod hub;
mod scenarios;
mod sync_service;
mod transport;

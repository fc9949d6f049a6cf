pub mod analytics;
pub mod app;
pub mod calendar;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod service;
pub mod snapshot;
pub mod state;
pub mod store;
pub mod sync;
pub mod tracker;
pub mod ui;

pub use app::router;
pub use config::AppConfig;
pub use service::CounterService;
pub use state::AppState;
pub use store::{DocumentStore, RemoteCounterStore};

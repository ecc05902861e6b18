// Enemy-tracking batch jobs over the TibiaData API.
//
// A retrying JSON fetcher feeds typed accessors, whose results are
// reconciled case-insensitively against small persisted name lists.

pub mod api;
pub mod config;
pub mod error;
pub mod fetch;
pub mod jobs;
pub mod metrics;
pub mod names;
pub mod online;
pub mod reconcile;
pub mod server;
pub mod store;

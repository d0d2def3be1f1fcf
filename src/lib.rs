//! Availarr - media availability transitions and request notifications.
//!
//! Observes writes to media availability records, works out what changed,
//! notifies the users whose requests the change completes and auto-approves
//! pending requests for content that showed up on its own.

pub mod classifier;
pub mod composer;
pub mod config;
pub mod correlator;
pub mod dispatch;
pub mod engine;
pub mod http;
pub mod metadata;
pub mod models;
pub mod musicbrainz;
pub mod progression;
pub mod scenario;
pub mod store;
pub mod tmdb;

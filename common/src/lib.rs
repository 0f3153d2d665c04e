//! Types shared between the mass edit web handlers and the background worker.
//!
//! Everything in here crosses the queue boundary as JSON, so every type is
//! `Serialize + Deserialize`.

pub mod jobs;
pub mod model;
pub mod requests;

//! Server-side SCORM Run-Time Environment.
//!
//! The protocol-facing pieces (session state machine, element vocabulary,
//! error codes) live next to the heuristic pipeline (suspend-data decoder,
//! format detector, score extractor) and the durable services (time
//! accumulator, score synchronization, consistency validator). Storage is
//! behind the [`store::RteStore`] trait with Postgres and in-memory backends.

pub mod accumulate;
pub mod config;
pub mod db;
pub mod detect;
pub mod duration;
pub mod elements;
pub mod error;
pub mod extract;
pub mod models;
pub mod routes;
pub mod session;
pub mod store;
pub mod suspend;
pub mod sync;
pub mod validator;

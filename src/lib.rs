//! Cypher command layer — conversational dispatch and job progress monitoring.
//!
//! SYSTEM CONTEXT
//! ==============
//! A user types a command or picks a suggestion. The session forwards text to
//! the conversational backend; suggestions resolve through the dispatcher to
//! navigation, forms, or backend mutations. Independently, the job monitor
//! polls a case's analysis progress and publishes a derived view. The two
//! halves share no mutable state.

pub mod api;
pub mod dispatch;
pub mod error;
pub mod icons;
pub mod monitor;
pub mod render;
pub mod session;
pub mod suggestion;
pub mod types;

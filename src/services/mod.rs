//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own validation, authorization, and persistence so route
//! handlers can stay focused on protocol translation. Each operation takes
//! `&AppState` plus raw request inputs and returns `Result<_, ApiError>`.

pub mod check;
pub mod token;
pub mod user;
pub mod validate;

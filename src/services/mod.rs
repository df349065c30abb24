//! Domain services used by HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own validation and orchestration so route handlers can
//! stay focused on protocol translation and status codes.

pub mod user;

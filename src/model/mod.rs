//! Data model: plain shared types (`common`), stored records (`db`) and
//! read-only projections handed to collaborators (`api`).

pub mod api;
pub mod common;
pub mod db;

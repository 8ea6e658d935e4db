//! API request handlers

pub mod auth;
pub mod departments;
pub mod group_permissions;
pub mod groups;
pub mod health;
pub mod languages;
pub mod permissions;
pub mod positions;
pub mod staff;
pub mod staff_groups;
pub mod staff_permissions;

pub use health::{health_check, liveness, readiness};

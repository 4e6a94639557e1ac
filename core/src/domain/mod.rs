//! Domain layer: entities shared across the session-security core.

pub mod entities;
pub mod value_objects;

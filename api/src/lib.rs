//! HTTP layer for the CourseHub auth server
//!
//! Routes, DTOs, the authentication gateway and rate-limit middleware, and
//! the app factory. All business rules live in `ch_core`; this crate only
//! translates HTTP to service calls and domain errors back to responses.

pub mod app;
pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod routes;

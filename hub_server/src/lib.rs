//! HTTP surface of the Community-Hub backend.
//!
//! The router in [`api`] wires the managers from `community_hub` behind an
//! axum server. Sessions travel in an `HttpOnly` cookie whose attributes come
//! from [`api::cookie::CookiePolicy`].

pub mod api;
pub mod config;
pub mod logging;

//! HTTP handlers: generic entity CRUD, users, login, league lookups.

pub mod auth;
pub mod entity;
pub mod league;
pub mod users;

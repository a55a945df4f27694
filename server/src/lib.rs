//! Todo Lists Server - Session-scoped to-do lists over HTML forms.
//!
//! This crate provides a small web application in which each browser keeps
//! its own set of named to-do lists, responsible for:
//! - Creating, renaming, and deleting lists
//! - Adding, toggling, bulk-completing, and deleting todos
//! - Carrying one-shot flash messages between a redirect and the next page
//!
//! # Architecture
//!
//! All state lives in a per-browser session held by the server and addressed
//! by an opaque cookie token. Nothing is persisted: sessions expire after an
//! idle period and are lost on restart. Handlers in [`routes`] load a session,
//! apply an operation from [`todos`], and render a page from [`views`].

pub mod config;
pub mod error;
pub mod routes;
pub mod session;
pub mod todos;
pub mod types;
pub mod views;

//! Greeting plugin for AppHost.
//!
//! Registers the `greet` call with a `before.greet` hook that upper-cases
//! the name and an `after.greet` hook that counts greetings, plus a
//! `GET /hello/{name}` page (and a `POST /hello` form) rendered from
//! `view/hello.html`. The last greeted name is kept in the session.

pub mod handlers;
pub mod hooks;
pub mod plugin;

pub use plugin::{GreetPlugin, create};

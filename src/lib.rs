//! The library code for the `homepage` site server. Serving happens in two
//! distinct phases:
//!
//! 1. Building the post index from source files on disk ([`crate::index`])
//! 2. Resolving request paths against that index ([`crate::router`])
//!
//! The first phase runs once, at startup, and any failure in it stops the
//! process: a missing title or slug, a slug declared twice, or an unreadable
//! document all mean the site isn't publishable. Each document is converted by
//! a [`markdown::Transform`], which yields the HTML body and the metadata block
//! the [`post::Post`] fields are extracted from.
//!
//! The second phase is read-only. The [`router::Router`] owns the finished
//! index and is shared by every request thread ([`crate::serve`]); resolving a
//! path never fails, and unknown slugs produce an in-page message.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod chrome;
pub mod config;
mod escape;
pub mod index;
pub mod logging;
pub mod markdown;
pub mod post;
pub mod router;
pub mod serve;
mod util;

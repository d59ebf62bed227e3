//! Functional core for booksync.
//!
//! Pure types, traits and functions shared by the booksync binary. Nothing in
//! this crate performs I/O; backends live in the `booksync` crate and plug in
//! through the traits defined here.

pub mod book;
pub mod cache;
pub mod catalog;
pub mod events;
pub mod storage;

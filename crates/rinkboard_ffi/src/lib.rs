//! Flutter bridge crate for rinkboard.

pub mod api;

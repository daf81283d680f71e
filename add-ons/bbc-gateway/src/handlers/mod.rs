//! HTTP handlers, one module per area of the site.

pub(crate) mod admin;
pub(crate) mod chat;
pub(crate) mod inscription;
pub(crate) mod pages;

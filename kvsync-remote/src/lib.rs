//! Cloudflare Workers KV implementation of [`kvsync_core::KvStore`].

pub mod cloudflare;
mod wire;

pub use cloudflare::{CloudflareKv, API_BASE};

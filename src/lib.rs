//! AI photoshoot batch generation
//!
//! This library drives a batch of styled-image jobs for one uploaded photo
//! over a bounded worker pool backed by Cloudflare Workers AI, tracks each
//! job's status, supports per-job regeneration, and composes the finished
//! results into a single album image.

pub mod app_state;
pub mod config;
pub mod models;
pub mod routes;
pub mod services;

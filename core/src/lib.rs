//! Gonka Core Library
//! Request signing, upstream client, and OpenAI-compatible handlers

pub mod config;
pub mod error;
pub mod proxy;

#![doc = "space-courier-core: core pipeline for space-courier."]

//! This crate holds the data model and the whole fetch → bucket → publish
//! pipeline. The messaging client and CLI glue live in the `space-courier` crate.
//!
//! # Usage
//! Build a [`settings::RunSettings`], the default sources with
//! [`sources::default_sources`], a [`download::HttpDownloader`] and any
//! [`contract::Publisher`], then hand them to [`cycle::run`].

pub mod contract;
pub mod cycle;
pub mod download;
pub mod error;
pub mod organize;
pub mod publish;
pub mod settings;
pub mod sources;

pub use error::{Error, Result};

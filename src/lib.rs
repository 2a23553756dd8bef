//! Hemmer provider for put.io
//!
//! This crate manages put.io RSS feeds from Hemmer. It speaks the Hemmer
//! provider protocol over gRPC and talks to the put.io v2 REST API.
//!
//! # Overview
//!
//! - **Provider**: [`PutioProvider`] resolves the OAuth token, validates it
//!   against put.io, and serves the `putio_rss_feed` resource
//! - **Resource**: [`rss_feed`] plans, creates, reads, updates, deletes and
//!   imports feeds
//! - **Plan modifiers**: [`modifiers`] fill in defaults for unset optional
//!   attributes at plan time
//! - **Client**: [`client::PutioClient`], an authenticated `reqwest` client
//! - **Protocol**: schema types, validation, and the gRPC server with the
//!   handshake protocol
//!
//! # Configuration
//!
//! ```text
//! provider "putio" {
//!   oauth_token = "..."   # or PUTIO_OAUTH_TOKEN
//! }
//!
//! resource "putio_rss_feed" "shows" {
//!   title          = "one"
//!   rss_source_url = "https://google.fr"
//!   keyword        = "foo"
//! }
//! ```
//!
//! Unset `parent_dir_id`, `delete_old_files`, `unwanted_keywords` and
//! `paused` plan as `0`, `false`, `""` and `false`.
//!
//! # Handshake Protocol
//!
//! When the provider starts via [`serve`], it outputs a handshake string to
//! stdout:
//!
//! ```text
//! HEMMER_PROVIDER|1|127.0.0.1:50051
//! ```
//!
//! Format: `HEMMER_PROVIDER|<protocol_version>|<address>`
//!
//! # Provider Protocol
//!
//! - **GetMetadata**: Returns provider capabilities and resource names
//! - **GetSchema**: Returns full schema for provider config and resources
//! - **ValidateProviderConfig**: Validates provider configuration
//! - **Configure**: Resolves the token and validates it against put.io
//! - **Stop**: Gracefully shuts down the provider
//! - **ValidateResourceConfig**: Validates resource configuration
//! - **UpgradeResourceState**: Returns state unchanged (schema version 0)
//! - **Plan**: Validates config and injects defaults
//! - **Create/Read/Update/Delete**: Lifecycle of a feed
//! - **ImportResourceState**: Imports a feed by id

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod error;
pub mod feed;
pub mod logging;
pub mod modifiers;
pub mod provider;
pub mod rss_feed;
pub mod schema;
pub mod server;
pub mod testing;
pub mod types;
pub mod validation;

#[allow(missing_docs)]
#[allow(clippy::all)]
pub mod generated;

// Re-export main types at crate root
pub use client::{ClientError, PutioClient};
pub use config::ProviderConfig;
pub use error::ProviderError;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::{ProviderContext, PutioProvider};
pub use schema::ProviderSchema;
pub use server::{serve, serve_on, serve_with_options, ProviderService, ServeOptions};
pub use types::{
    AttributeChange, ImportedResource, PlanResult, ProviderMetadata, ServerCapabilities,
    HANDSHAKE_PREFIX, PROTOCOL_VERSION,
};
pub use validation::validate;

//! Stratus Core
//!
//! Provider-agnostic building blocks for managing remote cloud resources:
//! configuration values, schemas and validation, change detection, the
//! name-lock registry, the long-running operation poll loop, and the
//! Provider trait the configuration engine drives.

pub mod codec;
pub mod collection;
pub mod differ;
pub mod locks;
pub mod poller;
pub mod provider;
pub mod resource;
pub mod schema;
pub mod validation;

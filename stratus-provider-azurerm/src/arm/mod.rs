//! Azure Resource Manager client layer
//!
//! - `client` - authenticated HTTP calls and error decoding
//! - `operation` - long-running operation tracking
//! - `api` - typed `ResourceApi<T>` over the client

mod api;
mod client;
mod error;
mod operation;

pub use api::{ArmResourceApi, ResourceApi};
pub use client::{ArmClient, ArmResponse};
pub use error::{ArmError, ArmResult};
pub use operation::ArmOperation;

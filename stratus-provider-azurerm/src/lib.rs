//! Stratus Azure Resource Manager Provider
//!
//! ## Module Structure
//!
//! - `arm` - authenticated REST client, long-running operations, typed APIs
//! - `auth` - token credentials
//! - `config` - provider block and `ARM_*` environment
//! - `id` - resource ID parsing and construction
//! - `provider` - AzureRmProvider implementation
//! - `resources` - resource schemas and lifecycles
//! - `sdk` - request/response models per service
//! - `utils` - helpers shared by resources
//! - `validate` - name and range validators

pub mod arm;
pub mod auth;
pub mod config;
pub mod id;
pub mod provider;
pub mod resources;
pub mod sdk;
pub mod utils;
pub mod validate;

// Re-export main types
pub use config::{Credentials, Features, ProviderConfig};
pub use id::{AzureResourceId, IdError};
pub use provider::AzureRmProvider;
pub use resources::{ArmApis, ArmContext, AzureResource};

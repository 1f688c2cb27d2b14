//! Config store adapters: registry values on Windows, env files elsewhere.

mod env_file;
mod registry;

pub use env_file::{EnvFileConfigStore, scope_file};
pub use registry::{RegistryConfigStore, parse_reg_query, registry_key};

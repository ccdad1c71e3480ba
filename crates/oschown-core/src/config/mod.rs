//! Configuration loaded from oschown.toml
//!
//! Every provider reads its own section (`[nova]`, `[cinder]`, `[neutron]`),
//! so no configuration object is shared between services. `[identity]`
//! feeds user and project normalization.

pub mod parser;
pub mod paths;
pub mod schema;
pub mod store;

pub use parser::{parse_oschown_toml, parse_oschown_toml_str};
pub use paths::{default_config_path, default_state_dir};
pub use schema::OschownConfig;
pub use store::ConfigStore;

//! Cassandra node configuration
//!
//! Produces the JSON document consumed by the config-builder init container.
//! The document starts from operator model values (cluster name, seeds,
//! datacenter) and is then merged with the user's free-form overlay.
//!
//! # Example
//!
//! ```
//! use server_config::render;
//!
//! let overlay = serde_json::json!({"cassandra-yaml": {"num_tokens": 16}});
//! let doc = render(&["demo-seed-service"], "demo", "dc1", Some(&overlay)).unwrap();
//! assert!(doc.contains("\"num_tokens\":16"));
//! ```

pub mod error;
pub mod model;

pub use error::ServerConfigError;
pub use model::{merge, model_values, render};

//! Declarative method contracts for agent plugins.
//!
//! Plugins describe each exposed method with a JSON-Schema for its arguments and return value.
//! The [`SchemaRegistry`] merges those fragments into one [`SchemaDocument`], the
//! [`SchemaValidators`] compile it once per method, and [`openapi`] turns it into an API
//! description for transports.

pub mod openapi;
pub mod registry;
pub mod validator;

pub use openapi::{build as build_openapi, ApiInfo};
pub use registry::{Components, MethodSchema, PluginSchema, SchemaDocument, SchemaRegistry};
pub use validator::{check_meta_schema, validate, SchemaValidators};

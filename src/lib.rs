//! Schema-driven data-bridge generator.
//!
//! Reads a contract's type schema (datum and activity types), registers every named
//! type once, renders canonical / ergonomic / permissive type views, and assembles a
//! [`Bridge`](bridge::Bridge) that encodes and decodes values and builds enum
//! variants through generated accessors.
pub mod accessor;
pub mod bridge;
pub mod codec;
pub mod config;
pub mod data;
pub mod describe;
pub mod emit;
pub mod error;
pub mod ir;
pub mod path_de;
pub mod primitive;
pub mod registry;
pub mod schema;

pub use bridge::{Bridge, BridgeAssembler, EnumHelper, PendingSeeded, SeedSource, TypeHelper};
pub use config::{CollisionPolicy, GeneratorConfig};
pub use data::{EncodedValue, LedgerData};
pub use error::{BridgeError, GenError, LoadError};
pub use schema::{ContractSchema, SchemaNode};

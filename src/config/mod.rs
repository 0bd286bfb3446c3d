mod error;

pub mod context;
pub mod internals;
pub mod opts;

pub use context::{ContainerContext, Coordination, Package, PackageKind, Ports, TopologyIdentity};
pub use error::ConfigError;

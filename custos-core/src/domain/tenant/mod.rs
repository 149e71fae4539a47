pub mod configuration;

pub use configuration::{PartitioningSpec, TenantConfig};

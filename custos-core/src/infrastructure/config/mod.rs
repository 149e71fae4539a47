pub mod registry;

pub use registry::{ConfigRegistry, load_registry};

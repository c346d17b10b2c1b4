//! Domain models

pub mod bucket;
pub mod dimension;
pub mod file;
pub mod file_instance;

pub use bucket::Bucket;
pub use dimension::{Dimension, DimensionTarget};
pub use file::{File, FileKind, VariantSource};
pub use file_instance::{FileInstance, FileLocation, InstanceStatus, NewFileInstance};

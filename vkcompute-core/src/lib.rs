pub mod config;
pub mod error;
pub mod kernel;
pub mod layout;
pub mod select;

pub use config::{InstanceDescriptor, KernelDescriptor};
pub use error::{ComputeError, ComputeResult};
pub use layout::{DescriptorBinding, DescriptorKind, LayoutDescriptor};

pub mod instance;
mod device;
mod buffer;
mod pipeline;
mod descriptor;
mod command;

pub use instance::{PhysicalDeviceInfo, VulkanInstance};
pub use device::{VulkanDevice, VulkanFence};
pub use buffer::HostBuffer;
pub use pipeline::*;
pub use descriptor::{VulkanDescriptorPool, VulkanDescriptorSet};
pub use command::{VulkanCommandBuffer, VulkanCommandPool};
pub use ash;

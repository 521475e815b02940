use anyhow::{Context, Result};
use vkcompute_core::InstanceDescriptor;
use vkcompute_vulkan::VulkanInstance;

fn main() -> Result<()> {
    env_logger::init();

    let instance = VulkanInstance::new(InstanceDescriptor::default()).context("Failed to create Vulkan instance")?;
    let device = vkcompute_examples::open_device(&instance)?;

    println!("Logical device ready on compute queue family {}", device.compute_queue_index);
    Ok(())
}

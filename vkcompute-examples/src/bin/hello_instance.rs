use anyhow::{Context, Result};
use vkcompute_core::InstanceDescriptor;
use vkcompute_vulkan::VulkanInstance;

fn main() -> Result<()> {
    env_logger::init();

    let _instance = VulkanInstance::new(InstanceDescriptor::default()).context("Failed to create Vulkan instance")?;
    println!("Vulkan instance created");

    Ok(())
}

use anyhow::{Context, Result};
use vkcompute_core::{InstanceDescriptor, LayoutDescriptor};
use vkcompute_vulkan::VulkanInstance;

fn main() -> Result<()> {
    env_logger::init();

    let instance = VulkanInstance::new(InstanceDescriptor::default()).context("Failed to create Vulkan instance")?;
    let device = vkcompute_examples::open_device(&instance)?;

    let set_layout = device
        .create_descriptor_set_layout(&LayoutDescriptor::single_storage())
        .context("Failed to create descriptor set layout")?;

    println!("Descriptor set layout created with {} binding(s)", set_layout.descriptor.bindings.len());
    Ok(())
}

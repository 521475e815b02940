use anyhow::{Context, Result};
use std::io;
use vkcompute_core::InstanceDescriptor;
use vkcompute_vulkan::VulkanInstance;

fn main() -> Result<()> {
    env_logger::init();
    let kernel_desc = vkcompute_examples::kernel_descriptor_from_args();

    let instance = VulkanInstance::new(InstanceDescriptor::default()).context("Failed to create Vulkan instance")?;
    let device = vkcompute_examples::open_device(&instance)?;

    vkcompute_examples::run_compute(&device, &kernel_desc, &mut io::stdout().lock())
}

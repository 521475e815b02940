use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};
use vkcompute_core::config::{format_values, sequence};
use vkcompute_core::select::{scan_compute_queue_family, select_device_index};
use vkcompute_core::{kernel, KernelDescriptor, LayoutDescriptor};
use vkcompute_vulkan::{ComputePipelineDescriptor, PhysicalDeviceInfo, VulkanDevice, VulkanInstance};

/// Default kernel settings, with the path optionally replaced by argv[1].
pub fn kernel_descriptor_from_args() -> KernelDescriptor {
    KernelDescriptor::with_path_override(std::env::args().nth(1))
}

/// Lists the devices, asks for one when there is a choice, and reports the
/// properties of the chosen device.
pub fn choose_physical_device<'a, R: BufRead, W: Write>(
    devices: &'a [PhysicalDeviceInfo],
    input: &mut R,
    output: &mut W,
) -> Result<&'a PhysicalDeviceInfo> {
    writeln!(output, "Physical device count: {}", devices.len())?;
    for (i, device) in devices.iter().enumerate() {
        writeln!(output, "  [{}] {}", i, device.name)?;
    }

    let names: Vec<String> = devices.iter().map(|d| d.name.clone()).collect();
    let index = select_device_index(&names, input, output).context("Failed to select a physical device")?;
    let device = &devices[index];

    let (major, minor, patch) = device.api_version;
    writeln!(output, "Selected device: {}", device.name)?;
    writeln!(output, "Device type: {:?}", device.device_type)?;
    writeln!(output, "API version: {}.{}.{}", major, minor, patch)?;
    writeln!(output, "Max compute shared memory: {} bytes", device.max_compute_shared_memory_size)?;
    writeln!(output, "Queue family count: {}", device.queue_families.len())?;
    writeln!(output, "Compute queue family index: {}", scan_compute_queue_family(&device.queue_families))?;
    Ok(device)
}

pub fn open_device(instance: &VulkanInstance) -> Result<VulkanDevice> {
    let devices = instance.enumerate_physical_devices().context("Failed to enumerate physical devices")?;
    let physical = choose_physical_device(&devices, &mut io::stdin().lock(), &mut io::stdout().lock())?;
    let device = instance.request_device(physical).context("Failed to create logical device")?;
    Ok(device)
}

/// Uploads `0..N-1`, runs the kernel once over it and prints both buffers.
///
/// The kernel is loaded before the first pipeline object is created, so a
/// bad kernel path fails after the buffer lines and nothing else.
pub fn run_compute<W: Write>(device: &VulkanDevice, kernel_desc: &KernelDescriptor, output: &mut W) -> Result<()> {
    // 1. Buffers
    let size = kernel_desc.buffer_size();
    let input_buffer = device.create_host_buffer(size).context("Failed to create input buffer")?;
    let output_buffer = device.create_host_buffer(size).context("Failed to create output buffer")?;
    for (label, buffer) in [("Input", &input_buffer), ("Output", &output_buffer)] {
        writeln!(
            output,
            "{} buffer memory type index: {}, heap size: {} bytes",
            label, buffer.memory_type_index, buffer.heap_size
        )?;
    }

    // 2. Upload 0..N-1
    let initial_data = sequence(kernel_desc.element_count);
    input_buffer.write_words(&initial_data).context("Failed to write input data")?;

    // 3. Kernel and pipeline
    let code = kernel::load_spirv(&kernel_desc.path).context("Failed to load compute kernel")?;
    let shader_module = device.create_shader_module(&code).context("Failed to create shader module")?;

    let layout_desc = LayoutDescriptor::storage_pair();
    let set_layout = device
        .create_descriptor_set_layout(&layout_desc)
        .context("Failed to create descriptor set layout")?;
    let pipeline_layout = device
        .create_pipeline_layout(&[&set_layout])
        .context("Failed to create pipeline layout")?;
    let pipeline_cache = device.create_pipeline_cache().context("Failed to create pipeline cache")?;
    let pipeline = device
        .create_compute_pipeline(ComputePipelineDescriptor {
            shader: &shader_module,
            layout: &pipeline_layout,
            cache: Some(&pipeline_cache),
            entry_point: &kernel_desc.entry_point,
        })
        .context("Failed to create compute pipeline")?;

    // 4. Descriptors
    let descriptor_pool = device
        .create_descriptor_pool(&layout_desc)
        .context("Failed to create descriptor pool")?;
    let descriptor_set = descriptor_pool
        .allocate_set(&set_layout)
        .context("Failed to allocate descriptor set")?;
    device.bind_storage_buffers(&descriptor_set, &[(0, &input_buffer), (1, &output_buffer)]);

    // 5. Dispatch
    let command_pool = device.create_command_pool().context("Failed to create command pool")?;
    let mut cmd = command_pool
        .allocate_command_buffer()
        .context("Failed to allocate command buffer")?;

    let [x, y, z] = kernel_desc.dispatch_size();
    cmd.begin().context("Failed to begin command buffer")?;
    cmd.bind_compute_pipeline(&pipeline);
    cmd.bind_descriptor_set(0, &descriptor_set)?;
    cmd.dispatch(x, y, z);
    cmd.end().context("Failed to end command buffer")?;

    device.submit_and_wait(&cmd).context("Compute submission failed")?;

    // 6. Read back
    let count = kernel_desc.element_count as usize;
    let input_values = input_buffer.read_words(count).context("Failed to read input buffer")?;
    let output_values = output_buffer.read_words(count).context("Failed to read output buffer")?;

    writeln!(output, "Input: {}", format_values(&input_values))?;
    writeln!(output, "Output: {}", format_values(&output_values))?;
    Ok(())
}

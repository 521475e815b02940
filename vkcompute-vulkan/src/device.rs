use crate::{PhysicalDeviceInfo, VulkanCommandBuffer, VulkanInstance};
use ash::vk;
use log::info;
use std::sync::Arc;
use vkcompute_core::select::{find_compute_queue_family, MemoryType};
use vkcompute_core::{ComputeError, ComputeResult};

pub struct VulkanDeviceInner {
    pub compute_queue_index: u32,
    pub compute_queue: vk::Queue,
    pub memory_types: Vec<MemoryType>,
    pub memory_heap_sizes: Vec<u64>,
    pub device: ash::Device,
    pub instance: VulkanInstance,
}

impl Drop for VulkanDeviceInner {
    fn drop(&mut self) {
        unsafe {
            info!("Destroying Vulkan Device");
            self.device.destroy_device(None);
        }
    }
}

/// Logical device plus its compute queue. Every resource wrapper holds a
/// clone, so the device is destroyed only after all of them.
#[derive(Clone)]
pub struct VulkanDevice {
    pub inner: Arc<VulkanDeviceInner>,
}

impl std::ops::Deref for VulkanDevice {
    type Target = VulkanDeviceInner;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl VulkanInstance {
    pub fn request_device(&self, physical: &PhysicalDeviceInfo) -> ComputeResult<VulkanDevice> {
        if physical.handle == vk::PhysicalDevice::null() {
            return Err(ComputeError::InvalidDeviceHandle);
        }

        let queue_family_index = find_compute_queue_family(&physical.queue_families)?;
        info!("Using compute queue family {} on {}", queue_family_index, physical.name);

        let priorities = [1.0];
        let queue_create_info = vk::DeviceQueueCreateInfo {
            queue_family_index,
            p_queue_priorities: priorities.as_ptr(),
            queue_count: 1,
            ..Default::default()
        };

        let device_create_info = vk::DeviceCreateInfo {
            p_queue_create_infos: &queue_create_info,
            queue_create_info_count: 1,
            ..Default::default()
        };

        let device = unsafe {
            self.instance
                .create_device(physical.handle, &device_create_info, None)
                .map_err(|e| ComputeError::DeviceCreationFailed(format!("Failed to create logical device: {}", e)))?
        };

        let compute_queue = unsafe { device.get_device_queue(queue_family_index, 0) };

        info!("Vulkan Device created successfully");

        Ok(VulkanDevice {
            inner: Arc::new(VulkanDeviceInner {
                compute_queue_index: queue_family_index,
                compute_queue,
                memory_types: physical.memory_types.clone(),
                memory_heap_sizes: physical.memory_heap_sizes.clone(),
                device,
                instance: self.clone(),
            }),
        })
    }
}

pub struct VulkanFence {
    pub fence: vk::Fence,
    pub device: VulkanDevice,
}

impl Drop for VulkanFence {
    fn drop(&mut self) {
        unsafe {
            self.device.device.destroy_fence(self.fence, None);
        }
    }
}

impl VulkanFence {
    pub fn wait(&self, timeout: u64) -> ComputeResult<()> {
        unsafe {
            self.device
                .device
                .wait_for_fences(&[self.fence], true, timeout)
                .map_err(|e| ComputeError::SyncFailed(format!("Wait for fence failed: {}", e)))
        }
    }
}

impl VulkanDevice {
    pub fn create_fence(&self) -> ComputeResult<VulkanFence> {
        let create_info = vk::FenceCreateInfo::default();
        let fence = unsafe {
            self.device
                .create_fence(&create_info, None)
                .map_err(|e| ComputeError::SyncFailed(format!("Failed to create fence: {}", e)))?
        };
        Ok(VulkanFence {
            fence,
            device: self.clone(),
        })
    }

    pub fn submit(&self, command_buffer: &VulkanCommandBuffer, fence: &VulkanFence) -> ComputeResult<()> {
        let command_buffers = [command_buffer.buffer];
        let submit_info = vk::SubmitInfo {
            command_buffer_count: command_buffers.len() as u32,
            p_command_buffers: command_buffers.as_ptr(),
            ..Default::default()
        };

        unsafe {
            self.device
                .queue_submit(self.compute_queue, &[submit_info], fence.fence)
                .map_err(|e| ComputeError::SubmissionFailed(format!("Failed to submit command buffer: {}", e)))
        }
    }

    /// Submits one recorded command buffer and blocks until the GPU is done.
    pub fn submit_and_wait(&self, command_buffer: &VulkanCommandBuffer) -> ComputeResult<()> {
        let fence = self.create_fence()?;
        self.submit(command_buffer, &fence)?;
        fence.wait(u64::MAX)?;
        info!("Compute submission completed");
        Ok(())
    }
}

use crate::{VulkanComputePipeline, VulkanDescriptorSet, VulkanDevice, VulkanPipelineLayout};
use ash::vk;
use std::sync::Arc;
use vkcompute_core::{ComputeError, ComputeResult};

pub struct VulkanCommandPool {
    pub pool: vk::CommandPool,
    pub device: VulkanDevice,
}

impl Drop for VulkanCommandPool {
    fn drop(&mut self) {
        unsafe {
            self.device.device.destroy_command_pool(self.pool, None);
        }
    }
}

impl VulkanDevice {
    pub fn create_command_pool(&self) -> ComputeResult<VulkanCommandPool> {
        let create_info = vk::CommandPoolCreateInfo {
            queue_family_index: self.compute_queue_index,
            ..Default::default()
        };

        let pool = unsafe {
            self.device
                .create_command_pool(&create_info, None)
                .map_err(|e| ComputeError::ResourceCreationFailed(format!("Failed to create command pool: {}", e)))?
        };

        Ok(VulkanCommandPool {
            pool,
            device: self.clone(),
        })
    }
}

impl VulkanCommandPool {
    pub fn allocate_command_buffer(&self) -> ComputeResult<VulkanCommandBuffer> {
        let allocate_info = vk::CommandBufferAllocateInfo {
            command_pool: self.pool,
            level: vk::CommandBufferLevel::PRIMARY,
            command_buffer_count: 1,
            ..Default::default()
        };

        let command_buffers = unsafe {
            self.device
                .device
                .allocate_command_buffers(&allocate_info)
                .map_err(|e| ComputeError::ResourceCreationFailed(format!("Failed to allocate command buffer: {}", e)))?
        };

        let buffer = command_buffers
            .into_iter()
            .next()
            .ok_or(ComputeError::Generic("Driver returned no command buffer"))?;

        Ok(VulkanCommandBuffer {
            buffer,
            device: self.device.clone(),
            current_pipeline_layout: None,
        })
    }
}

/// Freed with its pool.
pub struct VulkanCommandBuffer {
    pub buffer: vk::CommandBuffer,
    pub device: VulkanDevice,
    pub current_pipeline_layout: Option<Arc<VulkanPipelineLayout>>,
}

impl VulkanCommandBuffer {
    pub fn begin(&mut self) -> ComputeResult<()> {
        let begin_info = vk::CommandBufferBeginInfo {
            flags: vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT,
            ..Default::default()
        };

        unsafe {
            self.device
                .device
                .begin_command_buffer(self.buffer, &begin_info)
                .map_err(|e| ComputeError::CommandRecordingFailed(format!("Failed to begin command buffer: {}", e)))
        }
    }

    pub fn end(&mut self) -> ComputeResult<()> {
        unsafe {
            self.device
                .device
                .end_command_buffer(self.buffer)
                .map_err(|e| ComputeError::CommandRecordingFailed(format!("Failed to end command buffer: {}", e)))
        }
    }

    pub fn bind_compute_pipeline(&mut self, pipeline: &VulkanComputePipeline) {
        unsafe {
            self.device
                .device
                .cmd_bind_pipeline(self.buffer, vk::PipelineBindPoint::COMPUTE, pipeline.pipeline);
        }
        self.current_pipeline_layout = Some(Arc::clone(&pipeline.layout));
    }

    /// Binds `set` at `index` against the layout of the bound pipeline.
    pub fn bind_descriptor_set(&mut self, index: u32, set: &VulkanDescriptorSet) -> ComputeResult<()> {
        let layout = self.current_pipeline_layout.as_ref().ok_or_else(|| {
            ComputeError::CommandRecordingFailed("No compute pipeline bound before descriptor set".to_string())
        })?;

        unsafe {
            self.device.device.cmd_bind_descriptor_sets(
                self.buffer,
                vk::PipelineBindPoint::COMPUTE,
                layout.layout,
                index,
                &[set.set],
                &[],
            );
        }
        Ok(())
    }

    pub fn dispatch(&mut self, x: u32, y: u32, z: u32) {
        unsafe {
            self.device.device.cmd_dispatch(self.buffer, x, y, z);
        }
    }
}

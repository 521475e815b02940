use crate::pipeline::map_descriptor_kind;
use crate::{HostBuffer, VulkanDescriptorSetLayout, VulkanDevice};
use ash::vk;
use vkcompute_core::{ComputeError, ComputeResult, DescriptorKind, LayoutDescriptor};

pub struct VulkanDescriptorPool {
    pub pool: vk::DescriptorPool,
    pub device: VulkanDevice,
}

impl Drop for VulkanDescriptorPool {
    fn drop(&mut self) {
        unsafe {
            self.device.device.destroy_descriptor_pool(self.pool, None);
        }
    }
}

/// Released together with its pool.
pub struct VulkanDescriptorSet {
    pub set: vk::DescriptorSet,
}

impl VulkanDevice {
    /// Pool with room for exactly one set of `layout`.
    pub fn create_descriptor_pool(&self, layout: &LayoutDescriptor) -> ComputeResult<VulkanDescriptorPool> {
        let pool_sizes: Vec<vk::DescriptorPoolSize> = layout
            .pool_sizes()
            .into_iter()
            .map(|(kind, descriptor_count)| vk::DescriptorPoolSize {
                ty: map_descriptor_kind(kind),
                descriptor_count,
            })
            .collect();

        let pool_info = vk::DescriptorPoolCreateInfo {
            pool_size_count: pool_sizes.len() as u32,
            p_pool_sizes: pool_sizes.as_ptr(),
            max_sets: 1,
            ..Default::default()
        };

        let pool = unsafe {
            self.device
                .create_descriptor_pool(&pool_info, None)
                .map_err(|e| ComputeError::ResourceCreationFailed(format!("Failed to create descriptor pool: {}", e)))?
        };

        Ok(VulkanDescriptorPool {
            pool,
            device: self.clone(),
        })
    }

    /// Points each `(binding, buffer)` pair at the whole buffer.
    pub fn bind_storage_buffers(&self, set: &VulkanDescriptorSet, buffers: &[(u32, &HostBuffer)]) {
        let buffer_infos: Vec<vk::DescriptorBufferInfo> = buffers
            .iter()
            .map(|(_, buffer)| vk::DescriptorBufferInfo {
                buffer: buffer.buffer,
                offset: 0,
                range: vk::WHOLE_SIZE,
            })
            .collect();

        let writes: Vec<vk::WriteDescriptorSet> = buffers
            .iter()
            .zip(&buffer_infos)
            .map(|((binding, _), info)| vk::WriteDescriptorSet {
                dst_set: set.set,
                dst_binding: *binding,
                descriptor_count: 1,
                descriptor_type: map_descriptor_kind(DescriptorKind::StorageBuffer),
                p_buffer_info: info,
                ..Default::default()
            })
            .collect();

        unsafe {
            self.device.update_descriptor_sets(&writes, &[]);
        }
    }
}

impl VulkanDescriptorPool {
    pub fn allocate_set(&self, layout: &VulkanDescriptorSetLayout) -> ComputeResult<VulkanDescriptorSet> {
        let allocate_info = vk::DescriptorSetAllocateInfo {
            descriptor_pool: self.pool,
            descriptor_set_count: 1,
            p_set_layouts: &layout.layout,
            ..Default::default()
        };

        let sets = unsafe {
            self.device
                .device
                .allocate_descriptor_sets(&allocate_info)
                .map_err(|e| ComputeError::ResourceCreationFailed(format!("Failed to allocate descriptor set: {}", e)))?
        };

        let set = sets
            .into_iter()
            .next()
            .ok_or(ComputeError::Generic("Driver returned no descriptor set"))?;

        Ok(VulkanDescriptorSet { set })
    }
}

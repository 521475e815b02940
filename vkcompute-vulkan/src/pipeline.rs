use crate::VulkanDevice;
use ash::vk;
use log::info;
use std::ffi::CString;
use std::sync::Arc;
use vkcompute_core::{ComputeError, ComputeResult, DescriptorKind, LayoutDescriptor};

pub(crate) fn map_descriptor_kind(kind: DescriptorKind) -> vk::DescriptorType {
    match kind {
        DescriptorKind::StorageBuffer => vk::DescriptorType::STORAGE_BUFFER,
    }
}

pub struct VulkanShaderModule {
    pub module: vk::ShaderModule,
    pub device: VulkanDevice,
}

impl Drop for VulkanShaderModule {
    fn drop(&mut self) {
        unsafe {
            self.device.device.destroy_shader_module(self.module, None);
        }
    }
}

pub struct VulkanDescriptorSetLayout {
    pub layout: vk::DescriptorSetLayout,
    pub descriptor: LayoutDescriptor,
    pub device: VulkanDevice,
}

impl Drop for VulkanDescriptorSetLayout {
    fn drop(&mut self) {
        unsafe {
            self.device.device.destroy_descriptor_set_layout(self.layout, None);
        }
    }
}

pub struct VulkanPipelineLayout {
    pub layout: vk::PipelineLayout,
    pub device: VulkanDevice,
}

impl Drop for VulkanPipelineLayout {
    fn drop(&mut self) {
        unsafe {
            self.device.device.destroy_pipeline_layout(self.layout, None);
        }
    }
}

pub struct VulkanPipelineCache {
    pub cache: vk::PipelineCache,
    pub device: VulkanDevice,
}

impl Drop for VulkanPipelineCache {
    fn drop(&mut self) {
        unsafe {
            self.device.device.destroy_pipeline_cache(self.cache, None);
        }
    }
}

/// Keeps its pipeline layout alive so descriptor binds recorded against it
/// stay valid.
pub struct VulkanComputePipeline {
    pub pipeline: vk::Pipeline,
    pub layout: Arc<VulkanPipelineLayout>,
    pub device: VulkanDevice,
}

impl Drop for VulkanComputePipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.device.destroy_pipeline(self.pipeline, None);
        }
    }
}

pub struct ComputePipelineDescriptor<'a> {
    pub shader: &'a VulkanShaderModule,
    pub layout: &'a Arc<VulkanPipelineLayout>,
    pub cache: Option<&'a VulkanPipelineCache>,
    pub entry_point: &'a str,
}

impl VulkanDevice {
    pub fn create_shader_module(&self, code: &[u32]) -> ComputeResult<VulkanShaderModule> {
        let create_info = vk::ShaderModuleCreateInfo {
            code_size: std::mem::size_of_val(code),
            p_code: code.as_ptr(),
            ..Default::default()
        };

        let module = unsafe {
            self.device
                .create_shader_module(&create_info, None)
                .map_err(|e| ComputeError::ShaderLoadFailed(format!("Failed to create shader module: {}", e)))?
        };

        Ok(VulkanShaderModule {
            module,
            device: self.clone(),
        })
    }

    pub fn create_descriptor_set_layout(&self, descriptor: &LayoutDescriptor) -> ComputeResult<VulkanDescriptorSetLayout> {
        let bindings: Vec<vk::DescriptorSetLayoutBinding> = descriptor
            .bindings
            .iter()
            .map(|entry| vk::DescriptorSetLayoutBinding {
                binding: entry.binding,
                descriptor_type: map_descriptor_kind(entry.kind),
                descriptor_count: 1,
                stage_flags: vk::ShaderStageFlags::COMPUTE,
                ..Default::default()
            })
            .collect();

        let create_info = vk::DescriptorSetLayoutCreateInfo {
            binding_count: bindings.len() as u32,
            p_bindings: bindings.as_ptr(),
            ..Default::default()
        };

        let layout = unsafe {
            self.device
                .create_descriptor_set_layout(&create_info, None)
                .map_err(|e| ComputeError::PipelineCreationFailed(format!("Failed to create descriptor set layout: {}", e)))?
        };

        info!("Descriptor set layout created with {} bindings", bindings.len());

        Ok(VulkanDescriptorSetLayout {
            layout,
            descriptor: descriptor.clone(),
            device: self.clone(),
        })
    }

    pub fn create_pipeline_layout(&self, set_layouts: &[&VulkanDescriptorSetLayout]) -> ComputeResult<Arc<VulkanPipelineLayout>> {
        let set_layouts: Vec<vk::DescriptorSetLayout> = set_layouts.iter().map(|l| l.layout).collect();

        let create_info = vk::PipelineLayoutCreateInfo {
            set_layout_count: set_layouts.len() as u32,
            p_set_layouts: set_layouts.as_ptr(),
            ..Default::default()
        };

        let layout = unsafe {
            self.device
                .create_pipeline_layout(&create_info, None)
                .map_err(|e| ComputeError::PipelineCreationFailed(format!("Failed to create pipeline layout: {}", e)))?
        };

        Ok(Arc::new(VulkanPipelineLayout {
            layout,
            device: self.clone(),
        }))
    }

    pub fn create_pipeline_cache(&self) -> ComputeResult<VulkanPipelineCache> {
        let create_info = vk::PipelineCacheCreateInfo::default();
        let cache = unsafe {
            self.device
                .create_pipeline_cache(&create_info, None)
                .map_err(|e| ComputeError::PipelineCreationFailed(format!("Failed to create pipeline cache: {}", e)))?
        };

        Ok(VulkanPipelineCache {
            cache,
            device: self.clone(),
        })
    }

    pub fn create_compute_pipeline(&self, descriptor: ComputePipelineDescriptor) -> ComputeResult<VulkanComputePipeline> {
        let entry_name = CString::new(descriptor.entry_point)
            .map_err(|_| ComputeError::Generic("Entry point contains a NUL byte"))?;

        let stage_info = vk::PipelineShaderStageCreateInfo {
            stage: vk::ShaderStageFlags::COMPUTE,
            module: descriptor.shader.module,
            p_name: entry_name.as_ptr(),
            ..Default::default()
        };

        let create_info = vk::ComputePipelineCreateInfo {
            stage: stage_info,
            layout: descriptor.layout.layout,
            ..Default::default()
        };

        let cache = descriptor.cache.map(|c| c.cache).unwrap_or_else(vk::PipelineCache::null);

        let pipelines = unsafe {
            self.device
                .create_compute_pipelines(cache, &[create_info], None)
                .map_err(|(_, e)| ComputeError::PipelineCreationFailed(format!("Failed to create compute pipeline: {:?}", e)))?
        };

        let pipeline = pipelines
            .into_iter()
            .next()
            .ok_or(ComputeError::Generic("Driver returned no compute pipeline"))?;

        info!("Compute pipeline created (entry point {})", descriptor.entry_point);

        Ok(VulkanComputePipeline {
            pipeline,
            layout: Arc::clone(descriptor.layout),
            device: self.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_kinds_map_to_buffer_types() {
        assert_eq!(map_descriptor_kind(DescriptorKind::StorageBuffer), vk::DescriptorType::STORAGE_BUFFER);
    }
}

use crate::VulkanDevice;
use ash::vk;
use log::{debug, info};
use vkcompute_core::select::{find_host_coherent_memory_type, memory_heap_size};
use vkcompute_core::{ComputeError, ComputeResult};

/// Storage buffer bound to its own host-visible, host-coherent allocation at
/// offset 0.
pub struct HostBuffer {
    pub buffer: vk::Buffer,
    pub memory: vk::DeviceMemory,
    pub size: u64,
    pub memory_type_index: u32,
    pub heap_size: u64,
    pub device: VulkanDevice,
}

impl Drop for HostBuffer {
    fn drop(&mut self) {
        unsafe {
            self.device.device.destroy_buffer(self.buffer, None);
            self.device.device.free_memory(self.memory, None);
        }
    }
}

impl VulkanDevice {
    pub fn create_host_buffer(&self, size: u64) -> ComputeResult<HostBuffer> {
        let create_info = vk::BufferCreateInfo {
            size,
            usage: vk::BufferUsageFlags::STORAGE_BUFFER,
            sharing_mode: vk::SharingMode::EXCLUSIVE,
            ..Default::default()
        };

        let buffer = unsafe {
            self.device
                .create_buffer(&create_info, None)
                .map_err(|e| ComputeError::ResourceCreationFailed(format!("Failed to create buffer: {}", e)))?
        };

        // Null memory until allocated; dropping early only destroys the buffer.
        let mut host_buffer = HostBuffer {
            buffer,
            memory: vk::DeviceMemory::null(),
            size,
            memory_type_index: 0,
            heap_size: 0,
            device: self.clone(),
        };

        let requirements = unsafe { self.device.get_buffer_memory_requirements(buffer) };
        let memory_type_index = find_host_coherent_memory_type(&self.memory_types, requirements.memory_type_bits)?;
        let heap_size = memory_heap_size(&self.memory_types, &self.memory_heap_sizes, memory_type_index)?;
        debug!(
            "Buffer of {} bytes needs {} bytes, memory type {}",
            size, requirements.size, memory_type_index
        );

        let allocate_info = vk::MemoryAllocateInfo {
            allocation_size: requirements.size,
            memory_type_index,
            ..Default::default()
        };

        host_buffer.memory = unsafe {
            self.device
                .allocate_memory(&allocate_info, None)
                .map_err(|e| ComputeError::MemoryAllocationFailed(format!("Failed to allocate buffer memory: {}", e)))?
        };
        host_buffer.memory_type_index = memory_type_index;
        host_buffer.heap_size = heap_size;

        unsafe {
            self.device
                .bind_buffer_memory(buffer, host_buffer.memory, 0)
                .map_err(|e| ComputeError::BufferBindFailed(format!("Failed to bind buffer memory: {}", e)))?;
        }

        info!("Created host buffer of {} bytes (memory type {})", size, memory_type_index);
        Ok(host_buffer)
    }
}

impl HostBuffer {
    fn check_range(&self, offset: u64, len: usize) -> ComputeResult<()> {
        if offset.checked_add(len as u64).is_none_or(|end| end > self.size) {
            return Err(ComputeError::Generic("Buffer access out of range"));
        }
        Ok(())
    }

    /// Maps the range, copies `data` in, and unmaps again.
    pub fn write_data(&self, offset: u64, data: &[u8]) -> ComputeResult<()> {
        self.check_range(offset, data.len())?;
        if data.is_empty() {
            return Ok(());
        }

        unsafe {
            let ptr = self
                .device
                .device
                .map_memory(self.memory, offset, data.len() as u64, vk::MemoryMapFlags::empty())
                .map_err(|e| ComputeError::BackendError(format!("Failed to map buffer memory: {}", e)))?;
            std::ptr::copy_nonoverlapping(data.as_ptr(), ptr as *mut u8, data.len());
            self.device.device.unmap_memory(self.memory);
        }
        Ok(())
    }

    pub fn read_data(&self, offset: u64, data: &mut [u8]) -> ComputeResult<()> {
        self.check_range(offset, data.len())?;
        if data.is_empty() {
            return Ok(());
        }

        unsafe {
            let ptr = self
                .device
                .device
                .map_memory(self.memory, offset, data.len() as u64, vk::MemoryMapFlags::empty())
                .map_err(|e| ComputeError::BackendError(format!("Failed to map buffer memory: {}", e)))?;
            std::ptr::copy_nonoverlapping(ptr as *const u8, data.as_mut_ptr(), data.len());
            self.device.device.unmap_memory(self.memory);
        }
        Ok(())
    }

    pub fn write_words(&self, values: &[u32]) -> ComputeResult<()> {
        self.write_data(0, bytemuck::cast_slice(values))
    }

    pub fn read_words(&self, count: usize) -> ComputeResult<Vec<u32>> {
        let mut values = vec![0u32; count];
        self.read_data(0, bytemuck::cast_slice_mut(&mut values))?;
        Ok(values)
    }
}

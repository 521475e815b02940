use ash::{vk, Entry};
use log::{debug, error, info, warn};
use std::ffi::{c_char, CStr, CString};
use std::sync::Arc;
use vkcompute_core::config::VALIDATION_LAYER;
use vkcompute_core::select::{MemoryPropertyFlags, MemoryType, QueueFamily, QueueFlags};
use vkcompute_core::{ComputeError, ComputeResult, InstanceDescriptor};

unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::os::raw::c_void,
) -> vk::Bool32 {
    let callback_data = unsafe { *p_callback_data };

    let message_id_name = if callback_data.p_message_id_name.is_null() {
        std::borrow::Cow::from("")
    } else {
        unsafe { CStr::from_ptr(callback_data.p_message_id_name).to_string_lossy() }
    };

    let message = if callback_data.p_message.is_null() {
        std::borrow::Cow::from("")
    } else {
        unsafe { CStr::from_ptr(callback_data.p_message).to_string_lossy() }
    };

    let log_level = match message_severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE => log::Level::Debug,
        vk::DebugUtilsMessageSeverityFlagsEXT::INFO => log::Level::Info,
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => log::Level::Warn,
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => log::Level::Error,
        _ => log::Level::Info,
    };

    log::log!(
        log_level,
        "[Vulkan] {:?} [{} ({})]: {}",
        message_type,
        message_id_name,
        callback_data.message_id_number,
        message
    );

    vk::FALSE
}

fn debug_messenger_info<'a>() -> vk::DebugUtilsMessengerCreateInfoEXT<'a> {
    vk::DebugUtilsMessengerCreateInfoEXT {
        message_severity: vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
            | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        message_type: vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
            | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE
            | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION,
        pfn_user_callback: Some(vulkan_debug_callback),
        ..Default::default()
    }
}

pub struct VulkanInstanceInner {
    pub debug_messenger: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
    pub instance: ash::Instance,
    pub entry: ash::Entry,
}

impl Drop for VulkanInstanceInner {
    fn drop(&mut self) {
        unsafe {
            if let Some((loader, messenger)) = self.debug_messenger.take() {
                loader.destroy_debug_utils_messenger(messenger, None);
            }
            info!("Destroying Vulkan Instance");
            self.instance.destroy_instance(None);
        }
    }
}

/// Shared handle to the API context. Devices keep a clone so the instance
/// outlives everything created from it.
#[derive(Clone)]
pub struct VulkanInstance {
    pub inner: Arc<VulkanInstanceInner>,
}

impl std::ops::Deref for VulkanInstance {
    type Target = VulkanInstanceInner;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// Everything the selection steps need to know about one accelerator.
#[derive(Clone, Debug)]
pub struct PhysicalDeviceInfo {
    pub handle: vk::PhysicalDevice,
    pub name: String,
    pub device_type: vk::PhysicalDeviceType,
    pub api_version: (u32, u32, u32),
    pub max_compute_shared_memory_size: u32,
    pub queue_families: Vec<QueueFamily>,
    pub memory_types: Vec<MemoryType>,
    pub memory_heap_sizes: Vec<u64>,
}

pub fn map_queue_flags(flags: vk::QueueFlags) -> QueueFlags {
    let mut mapped = QueueFlags::default();
    if flags.contains(vk::QueueFlags::GRAPHICS) { mapped = mapped | QueueFlags::GRAPHICS; }
    if flags.contains(vk::QueueFlags::COMPUTE) { mapped = mapped | QueueFlags::COMPUTE; }
    if flags.contains(vk::QueueFlags::TRANSFER) { mapped = mapped | QueueFlags::TRANSFER; }
    mapped
}

pub fn map_memory_properties(flags: vk::MemoryPropertyFlags) -> MemoryPropertyFlags {
    let mut mapped = MemoryPropertyFlags::default();
    if flags.contains(vk::MemoryPropertyFlags::DEVICE_LOCAL) { mapped = mapped | MemoryPropertyFlags::DEVICE_LOCAL; }
    if flags.contains(vk::MemoryPropertyFlags::HOST_VISIBLE) { mapped = mapped | MemoryPropertyFlags::HOST_VISIBLE; }
    if flags.contains(vk::MemoryPropertyFlags::HOST_COHERENT) { mapped = mapped | MemoryPropertyFlags::HOST_COHERENT; }
    if flags.contains(vk::MemoryPropertyFlags::HOST_CACHED) { mapped = mapped | MemoryPropertyFlags::HOST_CACHED; }
    mapped
}

impl VulkanInstance {
    pub fn new(descriptor: InstanceDescriptor) -> ComputeResult<Self> {
        info!("Initializing Vulkan Instance for application: {}", descriptor.name);

        let entry = unsafe {
            Entry::load().map_err(|e| ComputeError::InstanceCreationFailed(format!("Failed to load Vulkan entry: {}", e)))?
        };

        let app_name = CString::new(descriptor.name)
            .map_err(|_| ComputeError::Generic("Application name contains a NUL byte"))?;
        let layer_name = CString::new(VALIDATION_LAYER)
            .map_err(|_| ComputeError::Generic("Layer name contains a NUL byte"))?;

        let app_info = vk::ApplicationInfo {
            p_application_name: app_name.as_ptr(),
            application_version: vk::make_api_version(0, 1, 0, 0),
            engine_version: vk::make_api_version(0, 0, 0, 0),
            api_version: vk::API_VERSION_1_0,
            ..Default::default()
        };

        let mut layer_names: Vec<*const c_char> = Vec::new();
        let mut extension_names: Vec<*const c_char> = Vec::new();
        if descriptor.enable_validation {
            layer_names.push(layer_name.as_ptr());
            extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
        }

        let debug_create_info = debug_messenger_info();

        let mut create_info = vk::InstanceCreateInfo {
            p_application_info: &app_info,
            pp_enabled_layer_names: layer_names.as_ptr(),
            enabled_layer_count: layer_names.len() as u32,
            pp_enabled_extension_names: extension_names.as_ptr(),
            enabled_extension_count: extension_names.len() as u32,
            ..Default::default()
        };
        if descriptor.enable_validation {
            create_info.p_next = &debug_create_info as *const _ as *const std::os::raw::c_void;
        }

        let instance = unsafe {
            entry.create_instance(&create_info, None).map_err(|e| {
                error!("Instance creation error: {:?}", e);
                ComputeError::InstanceCreationFailed(format!("Failed to create instance: {}", e))
            })?
        };

        let debug_messenger = if descriptor.enable_validation {
            let loader = ash::ext::debug_utils::Instance::new(&entry, &instance);
            match unsafe { loader.create_debug_utils_messenger(&debug_create_info, None) } {
                Ok(messenger) => Some((loader, messenger)),
                Err(e) => {
                    warn!("Failed to create debug messenger: {:?}", e);
                    None
                }
            }
        } else {
            None
        };

        info!("Vulkan Instance created successfully");

        Ok(Self {
            inner: Arc::new(VulkanInstanceInner {
                debug_messenger,
                instance,
                entry,
            }),
        })
    }

    pub fn enumerate_physical_devices(&self) -> ComputeResult<Vec<PhysicalDeviceInfo>> {
        let handles = unsafe {
            self.instance
                .enumerate_physical_devices()
                .map_err(|e| ComputeError::BackendError(format!("Failed to enumerate physical devices: {}", e)))?
        };

        info!("Found {} physical devices", handles.len());
        if handles.is_empty() {
            return Err(ComputeError::NoPhysicalDevices);
        }

        Ok(handles.into_iter().map(|handle| self.describe_physical_device(handle)).collect())
    }

    fn describe_physical_device(&self, handle: vk::PhysicalDevice) -> PhysicalDeviceInfo {
        let props = unsafe { self.instance.get_physical_device_properties(handle) };
        let families = unsafe { self.instance.get_physical_device_queue_family_properties(handle) };
        let memory = unsafe { self.instance.get_physical_device_memory_properties(handle) };

        let name = unsafe { CStr::from_ptr(props.device_name.as_ptr()) }
            .to_string_lossy()
            .into_owned();
        debug!("Physical device {:?}: {}", handle, name);

        let queue_families = families
            .iter()
            .map(|q| QueueFamily {
                flags: map_queue_flags(q.queue_flags),
                queue_count: q.queue_count,
            })
            .collect();

        let memory_types = memory.memory_types[..memory.memory_type_count as usize]
            .iter()
            .map(|t| MemoryType {
                property_flags: map_memory_properties(t.property_flags),
                heap_index: t.heap_index,
            })
            .collect();

        let memory_heap_sizes = memory.memory_heaps[..memory.memory_heap_count as usize]
            .iter()
            .map(|h| h.size)
            .collect();

        PhysicalDeviceInfo {
            handle,
            name,
            device_type: props.device_type,
            api_version: (
                vk::api_version_major(props.api_version),
                vk::api_version_minor(props.api_version),
                vk::api_version_patch(props.api_version),
            ),
            max_compute_shared_memory_size: props.limits.max_compute_shared_memory_size,
            queue_families,
            memory_types,
            memory_heap_sizes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_flags_keep_compute_bit() {
        let mapped = map_queue_flags(vk::QueueFlags::COMPUTE | vk::QueueFlags::SPARSE_BINDING);
        assert!(mapped.contains(QueueFlags::COMPUTE));
        assert!(!mapped.contains(QueueFlags::GRAPHICS));

        let all = map_queue_flags(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER);
        assert_eq!(all, QueueFlags::GRAPHICS | QueueFlags::COMPUTE | QueueFlags::TRANSFER);
    }

    #[test]
    fn memory_flags_map_host_bits() {
        let mapped = map_memory_properties(vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT);
        assert!(mapped.contains(MemoryPropertyFlags::HOST_VISIBLE | MemoryPropertyFlags::HOST_COHERENT));
        assert!(!mapped.contains(MemoryPropertyFlags::DEVICE_LOCAL));
        assert_eq!(map_memory_properties(vk::MemoryPropertyFlags::LAZILY_ALLOCATED), MemoryPropertyFlags::default());
    }
}

use std::path::PathBuf;

pub const VALIDATION_LAYER: &str = "VK_LAYER_KHRONOS_validation";
pub const DEFAULT_KERNEL_PATH: &str = "compute_shader.comp.spv";
pub const DEFAULT_ENTRY_POINT: &str = "main";
/// Number of `u32` elements in each of the two storage buffers.
pub const ELEMENT_COUNT: u32 = 10;

#[derive(Clone, Debug)]
pub struct InstanceDescriptor<'a> {
    pub name: &'a str,
    /// Enables `VK_LAYER_KHRONOS_validation` and the debug messenger.
    pub enable_validation: bool,
}

impl Default for InstanceDescriptor<'_> {
    fn default() -> Self {
        Self {
            name: "vkcompute",
            enable_validation: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KernelDescriptor {
    pub path: PathBuf,
    pub entry_point: String,
    pub element_count: u32,
}

impl Default for KernelDescriptor {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_KERNEL_PATH),
            entry_point: DEFAULT_ENTRY_POINT.to_string(),
            element_count: ELEMENT_COUNT,
        }
    }
}

impl KernelDescriptor {
    /// Default descriptor with the kernel path taken from `path` when given.
    pub fn with_path_override(path: Option<String>) -> Self {
        let mut descriptor = Self::default();
        if let Some(path) = path {
            descriptor.path = PathBuf::from(path);
        }
        descriptor
    }

    pub fn buffer_size(&self) -> u64 {
        self.element_count as u64 * std::mem::size_of::<u32>() as u64
    }

    /// Work-group counts: one group per element on X.
    pub fn dispatch_size(&self) -> [u32; 3] {
        [self.element_count, 1, 1]
    }
}

/// The upload pattern `0, 1, .., n - 1`.
pub fn sequence(n: u32) -> Vec<u32> {
    (0..n).collect()
}

/// Space-separated decimal rendering used for the buffer dumps.
pub fn format_values(values: &[u32]) -> String {
    values.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_kernel_is_forty_bytes() {
        let descriptor = KernelDescriptor::default();
        assert_eq!(descriptor.path, PathBuf::from("compute_shader.comp.spv"));
        assert_eq!(descriptor.entry_point, "main");
        assert_eq!(descriptor.buffer_size(), 40);
        assert_eq!(descriptor.dispatch_size(), [10, 1, 1]);
    }

    #[test]
    fn path_override() {
        let descriptor = KernelDescriptor::with_path_override(Some("kernels/copy.spv".to_string()));
        assert_eq!(descriptor.path, PathBuf::from("kernels/copy.spv"));
        assert_eq!(KernelDescriptor::with_path_override(None), KernelDescriptor::default());
    }

    #[test]
    fn sequence_renders_space_separated() {
        assert_eq!(format_values(&sequence(10)), "0 1 2 3 4 5 6 7 8 9");
        assert_eq!(format_values(&[]), "");
    }
}

use std::fmt;

#[derive(Debug)]
pub enum ComputeError {
    InstanceCreationFailed(String),
    NoPhysicalDevices,
    InvalidDeviceHandle,
    NoComputeQueueFamily,
    DeviceCreationFailed(String),
    ResourceCreationFailed(String),
    NoSuitableMemoryType,
    MemoryAllocationFailed(String),
    BufferBindFailed(String),
    ShaderLoadFailed(String),
    ShaderCompilationFailed(String),
    PipelineCreationFailed(String),
    CommandRecordingFailed(String),
    SubmissionFailed(String),
    SyncFailed(String),
    InputClosed,
    BackendError(String),
    Generic(&'static str),
}

impl fmt::Display for ComputeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComputeError::InstanceCreationFailed(msg) => write!(f, "Instance Creation Failed: {}", msg),
            ComputeError::NoPhysicalDevices => write!(f, "No physical devices found"),
            ComputeError::InvalidDeviceHandle => write!(f, "Invalid physical device handle"),
            ComputeError::NoComputeQueueFamily => write!(f, "No queue family with compute support"),
            ComputeError::DeviceCreationFailed(msg) => write!(f, "Device Creation Failed: {}", msg),
            ComputeError::ResourceCreationFailed(msg) => write!(f, "Resource Creation Failed: {}", msg),
            ComputeError::NoSuitableMemoryType => write!(f, "No host-visible, host-coherent memory type"),
            ComputeError::MemoryAllocationFailed(msg) => write!(f, "Memory Allocation Failed: {}", msg),
            ComputeError::BufferBindFailed(msg) => write!(f, "Buffer Bind Failed: {}", msg),
            ComputeError::ShaderLoadFailed(msg) => write!(f, "Shader Load Failed: {}", msg),
            ComputeError::ShaderCompilationFailed(msg) => write!(f, "Shader Compilation Failed: {}", msg),
            ComputeError::PipelineCreationFailed(msg) => write!(f, "Pipeline Creation Failed: {}", msg),
            ComputeError::CommandRecordingFailed(msg) => write!(f, "Command Recording Failed: {}", msg),
            ComputeError::SubmissionFailed(msg) => write!(f, "Submission Failed: {}", msg),
            ComputeError::SyncFailed(msg) => write!(f, "Synchronization Failed: {}", msg),
            ComputeError::InputClosed => write!(f, "Console input closed before a device was selected"),
            ComputeError::BackendError(msg) => write!(f, "Backend Error: {}", msg),
            ComputeError::Generic(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for ComputeError {}

pub type ComputeResult<T> = Result<T, ComputeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_detail() {
        let err = ComputeError::MemoryAllocationFailed("ERROR_OUT_OF_DEVICE_MEMORY".to_string());
        assert_eq!(err.to_string(), "Memory Allocation Failed: ERROR_OUT_OF_DEVICE_MEMORY");
        assert_eq!(ComputeError::Generic("boom").to_string(), "Error: boom");
    }
}

use crate::{ComputeError, ComputeResult};
use log::info;
use naga::back::spv;
use naga::front::glsl;
use std::path::Path;

pub const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Copies `input_values` into `output_values`, one invocation per work group.
pub const PASS_THROUGH_WGSL: &str = r#"
@group(0) @binding(0) var<storage, read> input_values: array<u32>;
@group(0) @binding(1) var<storage, read_write> output_values: array<u32>;

@compute @workgroup_size(1)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    let i = id.x;
    if (i < arrayLength(&input_values)) {
        output_values[i] = input_values[i];
    }
}
"#;

pub enum KernelSource<'a> {
    Glsl {
        source: &'a str,
        defines: naga::FastHashMap<String, String>,
    },
    Wgsl(&'a str),
}

/// Reads a precompiled SPIR-V kernel into words.
pub fn load_spirv(path: impl AsRef<Path>) -> ComputeResult<Vec<u32>> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)
        .map_err(|e| ComputeError::ShaderLoadFailed(format!("{}: {}", path.display(), e)))?;

    if bytes.is_empty() || bytes.len() % 4 != 0 {
        return Err(ComputeError::ShaderLoadFailed(format!(
            "{}: size {} is not a whole number of SPIR-V words",
            path.display(),
            bytes.len()
        )));
    }

    let words: Vec<u32> = bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();

    if words[0] != SPIRV_MAGIC {
        return Err(ComputeError::ShaderLoadFailed(format!(
            "{}: bad SPIR-V magic {:#010x}",
            path.display(),
            words[0]
        )));
    }

    info!("Loaded kernel {} ({} bytes)", path.display(), bytes.len());
    Ok(words)
}

pub fn write_spirv(path: impl AsRef<Path>, words: &[u32]) -> ComputeResult<()> {
    let path = path.as_ref();
    let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
    std::fs::write(path, bytes)
        .map_err(|e| ComputeError::ShaderLoadFailed(format!("{}: {}", path.display(), e)))
}

pub fn compile_kernel(source: KernelSource) -> ComputeResult<Vec<u32>> {
    let module = match source {
        KernelSource::Wgsl(src) => naga::front::wgsl::Frontend::new()
            .parse(src)
            .map_err(|e| ComputeError::ShaderCompilationFailed(format!("WGSL parse error: {:?}", e)))?,
        KernelSource::Glsl { source, defines } => {
            let mut parser = glsl::Frontend::default();
            let options = glsl::Options {
                stage: naga::ShaderStage::Compute,
                defines,
            };
            parser
                .parse(&options, source)
                .map_err(|e| ComputeError::ShaderCompilationFailed(format!("GLSL parse error: {:?}", e)))?
        }
    };

    let info = naga::valid::Validator::new(naga::valid::ValidationFlags::all(), naga::valid::Capabilities::all())
        .validate(&module)
        .map_err(|e| ComputeError::ShaderCompilationFailed(format!("Naga validation error: {:?}", e)))?;

    spv::write_vec(&module, &info, &spv::Options::default(), None)
        .map_err(|e| ComputeError::ShaderCompilationFailed(format!("SPIR-V write error: {:?}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_through_compiles_to_spirv() {
        let words = compile_kernel(KernelSource::Wgsl(PASS_THROUGH_WGSL)).unwrap();
        assert_eq!(words[0], SPIRV_MAGIC);
        assert!(words.len() > 5);
    }

    #[test]
    fn written_kernel_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("compute_shader.comp.spv");
        let words = compile_kernel(KernelSource::Wgsl(PASS_THROUGH_WGSL)).unwrap();

        write_spirv(&path, &words).unwrap();
        assert_eq!(load_spirv(&path).unwrap(), words);
    }

    #[test]
    fn missing_kernel_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_spirv(dir.path().join("compute_shader.comp.spv")).unwrap_err();
        assert!(matches!(err, ComputeError::ShaderLoadFailed(_)));
    }

    #[test]
    fn truncated_or_foreign_files_are_rejected() {
        let dir = tempfile::tempdir().unwrap();

        let truncated = dir.path().join("truncated.spv");
        std::fs::write(&truncated, [0x03u8, 0x02, 0x23, 0x07, 0x00]).unwrap();
        assert!(matches!(load_spirv(&truncated), Err(ComputeError::ShaderLoadFailed(_))));

        let empty = dir.path().join("empty.spv");
        std::fs::write(&empty, b"").unwrap();
        assert!(load_spirv(&empty).is_err());

        let foreign = dir.path().join("foreign.spv");
        std::fs::write(&foreign, b"#version 450\n\0\0\0").unwrap();
        assert!(matches!(load_spirv(&foreign), Err(ComputeError::ShaderLoadFailed(_))));
    }

    #[test]
    fn broken_wgsl_reports_parse_error() {
        let err = compile_kernel(KernelSource::Wgsl("fn main( {")).unwrap_err();
        assert!(matches!(err, ComputeError::ShaderCompilationFailed(_)));
    }
}

use anyhow::{Context, Result};
use std::path::Path;
use vkcompute_core::config::DEFAULT_KERNEL_PATH;
use vkcompute_core::kernel::{compile_kernel, write_spirv, KernelSource, PASS_THROUGH_WGSL};

/// `build_kernel [source.wgsl|source.comp] [output.spv]`
///
/// Without a source, the built-in pass-through kernel is compiled.
fn main() -> Result<()> {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();

    let source_text = match args.get(1) {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("Failed to read kernel source: {}", path))?,
        None => PASS_THROUGH_WGSL.to_string(),
    };
    let is_glsl = args
        .get(1)
        .is_some_and(|path| Path::new(path).extension().is_some_and(|ext| ext != "wgsl"));

    let source = if is_glsl {
        KernelSource::Glsl {
            source: &source_text,
            defines: Default::default(),
        }
    } else {
        KernelSource::Wgsl(&source_text)
    };

    let words = compile_kernel(source).context("Failed to compile kernel")?;
    let output = args.get(2).map(String::as_str).unwrap_or(DEFAULT_KERNEL_PATH);
    write_spirv(output, &words).with_context(|| format!("Failed to write {}", output))?;

    println!("Wrote {} ({} bytes)", output, words.len() * 4);
    Ok(())
}

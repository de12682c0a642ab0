// build.rs
// Compiles the lesson GLSL shaders to SPIR-V under target/shaders

use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

const SHADER_STAGES: [&str; 3] = ["vert", "frag", "comp"];

fn find_glslc() -> Option<PathBuf> {
    println!("cargo:rerun-if-env-changed=VULKAN_SDK");
    if let Ok(sdk) = env::var("VULKAN_SDK") {
        let glslc = if cfg!(target_os = "windows") {
            Path::new(&sdk).join("Bin").join("glslc.exe")
        } else {
            Path::new(&sdk).join("bin").join("glslc")
        };
        if glslc.exists() {
            return Some(glslc);
        }
        eprintln!("warning: glslc not found at: {}", glslc.display());
    }

    // Fall back to a glslc on PATH
    match Command::new("glslc").arg("--version").output() {
        Ok(output) if output.status.success() => Some(PathBuf::from("glslc")),
        _ => None,
    }
}

fn is_stale(source: &Path, output: &Path) -> bool {
    let modified = |path: &Path| std::fs::metadata(path).and_then(|m| m.modified()).ok();
    match (modified(source), modified(output)) {
        (Some(src), Some(dst)) => src > dst,
        _ => true,
    }
}

fn main() {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".into()));
    let shader_dir = manifest_dir.join("../resources/shaders");
    let target_dir = manifest_dir.join("../target/shaders");

    println!("cargo:rerun-if-changed={}", shader_dir.display());

    if env::var("SKIP_SHADERS").is_ok() {
        eprintln!("info: Skipping shader compilation (SKIP_SHADERS set)");
        return;
    }

    let Some(glslc) = find_glslc() else {
        eprintln!("warning: glslc not found, shader compilation skipped");
        eprintln!("hint: Install the Vulkan SDK and set VULKAN_SDK");
        return;
    };

    if let Err(e) = std::fs::create_dir_all(&target_dir) {
        eprintln!("warning: Failed to create target directory: {}", e);
        return;
    }

    let entries = match std::fs::read_dir(&shader_dir) {
        Ok(entries) => entries,
        Err(_) => {
            eprintln!("info: No shader directory found at: {:?}", shader_dir);
            return;
        }
    };

    let mut compiled_count = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        let is_shader = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| SHADER_STAGES.contains(&ext));
        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if !is_shader {
            continue;
        }

        // texture.vert -> texture.vert.spv, so stages of one lesson never collide
        let out_file = target_dir.join(format!("{file_name}.spv"));
        if !is_stale(&path, &out_file) {
            eprintln!("info: Shader {} is up to date", file_name);
            continue;
        }

        let status = Command::new(&glslc).arg(&path).arg("-o").arg(&out_file).status();
        match status {
            Ok(s) if s.success() => {
                eprintln!("info: Compiled {} -> {}.spv", file_name, file_name);
                compiled_count += 1;
            }
            Ok(s) => {
                eprintln!("error: glslc failed for {:?} with exit code: {}", path, s.code().unwrap_or(-1));
                panic!("Shader compilation failed");
            }
            Err(e) => {
                eprintln!("error: Failed to run glslc for {:?}: {}", path, e);
                panic!("Failed to execute shader compiler");
            }
        }
    }

    if compiled_count > 0 {
        eprintln!("info: Successfully compiled {} shader(s)", compiled_count);
    }
}

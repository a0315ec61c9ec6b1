use std::io::prelude::*;
use std::{env, error::Error, fs, fs::File, path::Path};

// Stamp the GLSL version onto every shader at build time.
fn main() -> Result<(), Box<dyn Error>> {
    let out_dir = env::var_os("OUT_DIR").ok_or("missing output directory")?;
    let target = env::var("TARGET")?;

    let version = match target.as_str() {
        "wasm32-unknown-unknown" => "300 es",

        // Below OpenGL 3.3, the GLSL and OpenGL version numbers do not match.
        // https://www.khronos.org/opengl/wiki/Core_Language_(GLSL)#OpenGL_and_GLSL_versions
        _ => "330 core",
    };

    println!("cargo:rerun-if-changed=shaders");

    let shader_dir = Path::new(&out_dir).join("shaders");
    fs::create_dir_all(&shader_dir)?;

    for entry in fs::read_dir("shaders")? {
        let path = entry?.path();
        let mut shader_source = File::open(&path)?;

        let mut versioned_source = format!("#version {}\n", version);
        shader_source.read_to_string(&mut versioned_source)?;

        let file_name = path.file_name().ok_or("shader without a file name")?;
        fs::write(shader_dir.join(file_name), versioned_source.as_bytes())?;
    }

    Ok(())
}

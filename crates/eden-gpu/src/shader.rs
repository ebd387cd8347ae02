//! SPIR-V discovery and loading.
//!
//! Compiled shaders are looked up at runtime through a fixed, ordered list
//! of relative locations so the same binary works from the workspace root,
//! a crate directory or the build output.

use crate::error::{GpuError, Result};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Relative directories probed for every shader name, in order.
pub const SHADER_SEARCH_DIRS: [&str; 8] = [
    ".",
    "..",
    "../..",
    "shaders",
    "../shaders",
    "../../shaders",
    "apps/eden-viewer",
    "target/shaders",
];

/// Ordered shader search over one or more asset roots.
#[derive(Debug, Clone)]
pub struct ShaderSearch {
    roots: Vec<PathBuf>,
}

impl ShaderSearch {
    /// Search relative to each of `roots`.
    pub fn new(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        let roots: Vec<PathBuf> = roots.into_iter().collect();
        Self {
            roots: if roots.is_empty() {
                vec![PathBuf::from(".")]
            } else {
                roots
            },
        }
    }

    /// Every path probed for `name`, in probe order.
    pub fn candidates(&self, name: &str) -> Vec<PathBuf> {
        self.roots
            .iter()
            .flat_map(|root| {
                SHADER_SEARCH_DIRS
                    .iter()
                    .map(move |dir| root.join(dir).join(name))
            })
            .collect()
    }

    /// First existing file for `name`.
    pub fn find(&self, name: &str) -> Result<PathBuf> {
        let candidates = self.candidates(name);
        let searched = candidates.len();
        candidates
            .into_iter()
            .find(|path| path.is_file())
            .ok_or_else(|| GpuError::ShaderNotFound {
                name: name.to_string(),
                searched,
            })
    }

    /// Find and load `name` as SPIR-V words.
    pub fn load(&self, name: &str) -> Result<Vec<u32>> {
        let path = self.find(name)?;
        tracing::debug!("Loading shader {}", path.display());
        load_spirv(&path)
    }
}

impl Default for ShaderSearch {
    fn default() -> Self {
        Self::new([PathBuf::from(".")])
    }
}

/// Find `name` relative to the current directory.
pub fn find_shader(name: &str) -> Result<PathBuf> {
    ShaderSearch::default().find(name)
}

/// Read a SPIR-V binary, checking alignment and the magic number.
pub fn load_spirv(path: &Path) -> Result<Vec<u32>> {
    let mut file = File::open(path)
        .map_err(|e| GpuError::InvalidShader(format!("{}: {e}", path.display())))?;
    ash::util::read_spv(&mut file)
        .map_err(|e| GpuError::InvalidShader(format!("{}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const SPIRV_MAGIC: u32 = 0x0723_0203;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("eden-shader-{tag}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn candidates_follow_probe_order() {
        let search = ShaderSearch::new([PathBuf::from("root")]);
        let candidates = search.candidates("cube.vert.spv");
        assert_eq!(candidates.len(), SHADER_SEARCH_DIRS.len());
        assert_eq!(candidates[0], Path::new("root/./cube.vert.spv"));
        assert_eq!(candidates[3], Path::new("root/shaders/cube.vert.spv"));
        assert_eq!(candidates[7], Path::new("root/target/shaders/cube.vert.spv"));
    }

    #[test]
    fn first_hit_wins() {
        let root = scratch_dir("first-hit");
        fs::create_dir_all(root.join("shaders")).unwrap();
        fs::create_dir_all(root.join("target/shaders")).unwrap();
        fs::write(root.join("shaders/a.spv"), SPIRV_MAGIC.to_le_bytes()).unwrap();
        fs::write(root.join("target/shaders/a.spv"), SPIRV_MAGIC.to_le_bytes()).unwrap();

        let found = ShaderSearch::new([root.clone()]).find("a.spv").unwrap();
        assert_eq!(found, root.join("shaders").join("a.spv"));

        fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn missing_shader_reports_search_count() {
        let root = scratch_dir("missing");
        let err = ShaderSearch::new([root.clone()]).find("nope.spv").unwrap_err();
        match err {
            GpuError::ShaderNotFound { name, searched } => {
                assert_eq!(name, "nope.spv");
                assert_eq!(searched, SHADER_SEARCH_DIRS.len());
            }
            other => panic!("unexpected error: {other}"),
        }
        fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn load_reads_words() {
        let root = scratch_dir("load");
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&SPIRV_MAGIC.to_le_bytes());
        bytes.extend_from_slice(&0x0001_0000u32.to_le_bytes());
        fs::write(root.join("ok.spv"), &bytes).unwrap();

        let words = ShaderSearch::new([root.clone()]).load("ok.spv").unwrap();
        assert_eq!(words, vec![SPIRV_MAGIC, 0x0001_0000]);
        fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn unaligned_binary_is_rejected() {
        let root = scratch_dir("unaligned");
        let path = root.join("bad.spv");
        fs::write(&path, [1u8, 2, 3]).unwrap();
        assert!(matches!(load_spirv(&path), Err(GpuError::InvalidShader(_))));
        fs::remove_dir_all(root).unwrap();
    }
}

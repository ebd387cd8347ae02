//! Renderer configuration and asset lookup.

use std::path::{Path, PathBuf};

use eden_core::constants::DEFAULT_FAR_PLANE;

/// Swapchain images requested at startup.
pub const DEFAULT_IMAGE_COUNT: u32 = 3;

/// Capacity of the per-frame line vertex buffer.
pub const LINE_BUFFER_BYTES: usize = 1024 * 1024;

/// Capacity of the per-frame colored cube vertex buffer.
pub const COLORED_CUBE_BUFFER_BYTES: usize = 10 * 1024 * 1024;

/// Texture switches allowed per swapchain image within one frame.
pub const MAX_TEXTURE_SWITCHES_PER_FRAME: usize = 16;

/// Relative locations probed for mesh files.
pub const MESH_SEARCH_DIRS: [&str; 4] = [".", "..", "models", "../models"];

/// Relative locations probed for the default texture.
pub const DEFAULT_TEXTURE_CANDIDATES: [&str; 3] =
    ["textures/default.bmp", "../textures/default.bmp", "default.bmp"];

/// Relative locations probed for the texture directory.
pub const TEXTURE_DIR_CANDIDATES: [&str; 2] = ["textures", "../textures"];

/// Renderer configuration.
#[derive(Clone, Debug)]
pub struct RendererConfig {
    /// Application name reported to the Vulkan driver.
    pub app_name: String,
    /// Enable the validation layer and debug messenger.
    pub validation: bool,
    /// Requested swapchain image count.
    pub image_count: u32,
    /// Size of the line vertex buffer in bytes.
    pub line_buffer_bytes: usize,
    /// Size of the colored cube vertex buffer in bytes.
    pub colored_cube_buffer_bytes: usize,
    /// Far plane used by `update_camera`.
    pub default_far_plane: f32,
    /// Directories every relative asset lookup starts from.
    pub asset_roots: Vec<PathBuf>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            app_name: "Eden".to_string(),
            validation: cfg!(debug_assertions),
            image_count: DEFAULT_IMAGE_COUNT,
            line_buffer_bytes: LINE_BUFFER_BYTES,
            colored_cube_buffer_bytes: COLORED_CUBE_BUFFER_BYTES,
            default_far_plane: DEFAULT_FAR_PLANE,
            asset_roots: vec![PathBuf::from(".")],
        }
    }
}

impl RendererConfig {
    /// Create a config with the given application name.
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            ..Default::default()
        }
    }

    /// Enable or disable validation layers.
    pub fn with_validation(mut self, validation: bool) -> Self {
        self.validation = validation;
        self
    }

    /// Add an extra root for asset lookups, searched after existing ones.
    pub fn with_asset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.asset_roots.push(root.into());
        self
    }
}

/// Every `root/dir/name` combination, in probe order.
pub fn candidate_paths(roots: &[PathBuf], dirs: &[&str], name: &str) -> Vec<PathBuf> {
    roots
        .iter()
        .flat_map(|root| dirs.iter().map(move |dir| root.join(dir).join(name)))
        .collect()
}

/// First existing file among `candidates`.
pub fn first_existing(candidates: &[PathBuf]) -> Option<&Path> {
    candidates
        .iter()
        .map(PathBuf::as_path)
        .find(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = RendererConfig::default();
        assert_eq!(config.image_count, 3);
        assert_eq!(config.line_buffer_bytes, 1024 * 1024);
        assert_eq!(config.colored_cube_buffer_bytes, 10 * 1024 * 1024);
        assert_eq!(config.default_far_plane, 5000.0);
        assert_eq!(config.asset_roots, vec![PathBuf::from(".")]);
    }

    #[test]
    fn mesh_candidates_in_probe_order() {
        let roots = [PathBuf::from("a"), PathBuf::from("b")];
        let paths = candidate_paths(&roots, &MESH_SEARCH_DIRS, "cube.txt");
        assert_eq!(paths.len(), 8);
        assert_eq!(paths[0], Path::new("a/cube.txt"));
        assert_eq!(paths[2], Path::new("a/models/cube.txt"));
        assert_eq!(paths[4], Path::new("b/cube.txt"));
        assert_eq!(paths[7], Path::new("b/../models/cube.txt"));
    }

    #[test]
    fn first_existing_skips_missing() {
        let dir = std::env::temp_dir().join(format!("eden-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let present = dir.join("here.txt");
        std::fs::write(&present, "x").unwrap();

        let candidates = vec![dir.join("missing.txt"), present.clone()];
        assert_eq!(first_existing(&candidates), Some(present.as_path()));
        assert_eq!(first_existing(&candidates[..1]), None);

        std::fs::remove_dir_all(dir).unwrap();
    }
}

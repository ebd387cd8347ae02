//! Graphics pipelines for subpass 0 of the scene render pass.
//!
//! The renderer needs two flavours: depth-tested triangles and unculled
//! lines drawn on top of everything. Both are expressed through
//! [`GraphicsPipelineConfig`].

use crate::error::{GpuError, Result};
use ash::vk;

/// Graphics pipeline configuration.
#[derive(Clone)]
pub struct GraphicsPipelineConfig {
    pub vertex_shader: Vec<u32>,
    pub fragment_shader: Vec<u32>,
    pub vertex_bindings: Vec<vk::VertexInputBindingDescription>,
    pub vertex_attributes: Vec<vk::VertexInputAttributeDescription>,
    pub topology: vk::PrimitiveTopology,
    pub polygon_mode: vk::PolygonMode,
    pub cull_mode: vk::CullModeFlags,
    pub front_face: vk::FrontFace,
    pub depth_test: bool,
    pub depth_write: bool,
    /// `Some` bakes a fixed viewport and scissor into the pipeline;
    /// `None` makes both dynamic state.
    pub static_extent: Option<vk::Extent2D>,
}

impl Default for GraphicsPipelineConfig {
    fn default() -> Self {
        Self {
            vertex_shader: Vec::new(),
            fragment_shader: Vec::new(),
            vertex_bindings: Vec::new(),
            vertex_attributes: Vec::new(),
            topology: vk::PrimitiveTopology::TRIANGLE_LIST,
            polygon_mode: vk::PolygonMode::FILL,
            cull_mode: vk::CullModeFlags::NONE,
            front_face: vk::FrontFace::COUNTER_CLOCKWISE,
            depth_test: true,
            depth_write: true,
            static_extent: None,
        }
    }
}

impl GraphicsPipelineConfig {
    /// Opaque writes to all four channels.
    fn blend_attachment() -> vk::PipelineColorBlendAttachmentState {
        vk::PipelineColorBlendAttachmentState::default()
            .color_write_mask(vk::ColorComponentFlags::RGBA)
    }

    /// Viewport and scissor covering a fixed extent, if one is baked in.
    fn fixed_viewport(&self) -> Option<(vk::Viewport, vk::Rect2D)> {
        self.static_extent.map(|extent| {
            let viewport = vk::Viewport {
                width: extent.width as f32,
                height: extent.height as f32,
                max_depth: 1.0,
                ..Default::default()
            };
            let scissor = vk::Rect2D {
                offset: vk::Offset2D::default(),
                extent,
            };
            (viewport, scissor)
        })
    }

    /// The render pass always carries a depth attachment, so this state is
    /// present even when testing is off.
    fn depth_state(&self) -> vk::PipelineDepthStencilStateCreateInfo<'static> {
        vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(self.depth_test)
            .depth_write_enable(self.depth_write)
            .depth_compare_op(vk::CompareOp::LESS)
    }

    fn rasterization_state(&self) -> vk::PipelineRasterizationStateCreateInfo<'static> {
        vk::PipelineRasterizationStateCreateInfo::default()
            .polygon_mode(self.polygon_mode)
            .cull_mode(self.cull_mode)
            .front_face(self.front_face)
            .line_width(1.0)
    }
}

/// Vertex and fragment modules, destroyed once the pipeline is linked.
struct StageModules<'d> {
    device: &'d ash::Device,
    vertex: vk::ShaderModule,
    fragment: vk::ShaderModule,
}

impl<'d> StageModules<'d> {
    unsafe fn new(device: &'d ash::Device, config: &GraphicsPipelineConfig) -> Result<Self> {
        let mut modules = Self {
            device,
            vertex: vk::ShaderModule::null(),
            fragment: vk::ShaderModule::null(),
        };
        // SAFETY: forwarded from caller; `Drop` releases whatever was created
        unsafe {
            modules.vertex = create_shader_module(device, &config.vertex_shader, "vertex")?;
            modules.fragment = create_shader_module(device, &config.fragment_shader, "fragment")?;
        }
        Ok(modules)
    }

    fn stages(&self) -> [vk::PipelineShaderStageCreateInfo<'static>; 2] {
        [
            (vk::ShaderStageFlags::VERTEX, self.vertex),
            (vk::ShaderStageFlags::FRAGMENT, self.fragment),
        ]
        .map(|(stage, module)| {
            vk::PipelineShaderStageCreateInfo::default()
                .stage(stage)
                .module(module)
                .name(c"main")
        })
    }
}

impl Drop for StageModules<'_> {
    fn drop(&mut self) {
        for module in [self.vertex, self.fragment] {
            if module != vk::ShaderModule::null() {
                // SAFETY: created on this device and referenced by no live pipeline build
                unsafe { self.device.destroy_shader_module(module, None) };
            }
        }
    }
}

/// A pipeline plus the layout its descriptor sets and push constants use.
pub struct GraphicsPipeline {
    pub pipeline: vk::Pipeline,
    pub layout: vk::PipelineLayout,
}

impl GraphicsPipeline {
    /// Create a graphics pipeline for subpass 0 of `render_pass`.
    ///
    /// # Safety
    /// The device must be valid and shader code must be valid SPIR-V.
    pub unsafe fn new(
        device: &ash::Device,
        render_pass: vk::RenderPass,
        config: &GraphicsPipelineConfig,
        descriptor_set_layouts: &[vk::DescriptorSetLayout],
        push_constant_ranges: &[vk::PushConstantRange],
    ) -> Result<Self> {
        // SAFETY: forwarded from caller
        let modules = unsafe { StageModules::new(device, config) }?;

        let layout_info = vk::PipelineLayoutCreateInfo::default()
            .set_layouts(descriptor_set_layouts)
            .push_constant_ranges(push_constant_ranges);
        // SAFETY: caller guarantees a valid device
        let layout = unsafe { device.create_pipeline_layout(&layout_info, None) }
            .map_err(|e| GpuError::PipelineCreation(e.to_string()))?;

        // SAFETY: `modules` and `layout` live on this device
        match unsafe { link(device, render_pass, config, &modules, layout) } {
            Ok(pipeline) => Ok(Self { pipeline, layout }),
            Err(e) => {
                // SAFETY: no pipeline references the layout
                unsafe { device.destroy_pipeline_layout(layout, None) };
                Err(e)
            }
        }
    }

    /// # Safety
    /// The device must be valid and the pipeline must not be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        // SAFETY: caller guarantees the pipeline is idle
        unsafe {
            device.destroy_pipeline(self.pipeline, None);
            device.destroy_pipeline_layout(self.layout, None);
        }
    }
}

/// Assemble the fixed-function state and create the pipeline object.
unsafe fn link(
    device: &ash::Device,
    render_pass: vk::RenderPass,
    config: &GraphicsPipelineConfig,
    modules: &StageModules<'_>,
    layout: vk::PipelineLayout,
) -> Result<vk::Pipeline> {
    let stages = modules.stages();
    let vertex_input = vk::PipelineVertexInputStateCreateInfo::default()
        .vertex_binding_descriptions(&config.vertex_bindings)
        .vertex_attribute_descriptions(&config.vertex_attributes);
    let input_assembly =
        vk::PipelineInputAssemblyStateCreateInfo::default().topology(config.topology);

    let fixed = config.fixed_viewport();
    let viewports: Vec<vk::Viewport> = fixed.iter().map(|(v, _)| *v).collect();
    let scissors: Vec<vk::Rect2D> = fixed.iter().map(|(_, s)| *s).collect();
    let viewport_state = if fixed.is_some() {
        vk::PipelineViewportStateCreateInfo::default()
            .viewports(&viewports)
            .scissors(&scissors)
    } else {
        vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1)
    };

    let rasterization = config.rasterization_state();
    let multisample = vk::PipelineMultisampleStateCreateInfo::default()
        .rasterization_samples(vk::SampleCountFlags::TYPE_1);
    let depth = config.depth_state();
    let blend_attachments = [GraphicsPipelineConfig::blend_attachment()];
    let blend = vk::PipelineColorBlendStateCreateInfo::default().attachments(&blend_attachments);
    let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
    let dynamic = vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

    let mut info = vk::GraphicsPipelineCreateInfo::default()
        .stages(&stages)
        .vertex_input_state(&vertex_input)
        .input_assembly_state(&input_assembly)
        .viewport_state(&viewport_state)
        .rasterization_state(&rasterization)
        .multisample_state(&multisample)
        .depth_stencil_state(&depth)
        .color_blend_state(&blend)
        .layout(layout)
        .render_pass(render_pass)
        .subpass(0);
    if fixed.is_none() {
        info = info.dynamic_state(&dynamic);
    }

    // SAFETY: every referenced state struct outlives this call
    let created =
        unsafe { device.create_graphics_pipelines(vk::PipelineCache::null(), &[info], None) };
    created
        .map_err(|(_, e)| GpuError::PipelineCreation(e.to_string()))?
        .into_iter()
        .next()
        .ok_or_else(|| GpuError::PipelineCreation("driver returned no pipeline".into()))
}

unsafe fn create_shader_module(
    device: &ash::Device,
    code: &[u32],
    stage: &str,
) -> Result<vk::ShaderModule> {
    let info = vk::ShaderModuleCreateInfo::default().code(code);
    // SAFETY: caller guarantees a valid device
    unsafe { device.create_shader_module(&info, None) }
        .map_err(|e| GpuError::InvalidShader(format!("({stage}): {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_disables_culling_and_blending() {
        let config = GraphicsPipelineConfig::default();
        assert_eq!(config.cull_mode, vk::CullModeFlags::NONE);
        assert_eq!(config.front_face, vk::FrontFace::COUNTER_CLOCKWISE);
        let blend = GraphicsPipelineConfig::blend_attachment();
        assert_eq!(blend.blend_enable, vk::FALSE);
        assert_eq!(blend.color_write_mask, vk::ColorComponentFlags::RGBA);
        assert!(config.fixed_viewport().is_none());
    }

    #[test]
    fn static_extent_fills_viewport_and_scissor() {
        let config = GraphicsPipelineConfig {
            static_extent: Some(vk::Extent2D {
                width: 640,
                height: 480,
            }),
            ..Default::default()
        };
        let (viewport, scissor) = config.fixed_viewport().unwrap();
        assert_eq!((viewport.x, viewport.y), (0.0, 0.0));
        assert_eq!((viewport.width, viewport.height), (640.0, 480.0));
        assert_eq!((viewport.min_depth, viewport.max_depth), (0.0, 1.0));
        assert_eq!((scissor.offset.x, scissor.offset.y), (0, 0));
        assert_eq!(scissor.extent.width, 640);
    }

    #[test]
    fn line_config_turns_depth_off() {
        let config = GraphicsPipelineConfig {
            topology: vk::PrimitiveTopology::LINE_LIST,
            depth_test: false,
            depth_write: false,
            ..Default::default()
        };
        let depth = config.depth_state();
        assert_eq!(depth.depth_test_enable, vk::FALSE);
        assert_eq!(depth.depth_write_enable, vk::FALSE);
        assert_eq!(depth.depth_compare_op, vk::CompareOp::LESS);
    }
}

//! Descriptor layouts, pools and writes.
//!
//! Every descriptor in the renderer has a count of one, so a layout is
//! described by its `(binding, type, stages)` triples and a pool can be
//! sized directly from the layout it serves.

use crate::error::Result;
use ash::vk;

/// Collects bindings for one descriptor set layout.
#[derive(Clone, Default)]
pub struct DescriptorSetLayoutBuilder<'a> {
    bindings: Vec<vk::DescriptorSetLayoutBinding<'a>>,
}

impl<'a> DescriptorSetLayoutBuilder<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    fn with(mut self, binding: u32, ty: vk::DescriptorType, stages: vk::ShaderStageFlags) -> Self {
        self.bindings.push(
            vk::DescriptorSetLayoutBinding::default()
                .binding(binding)
                .descriptor_type(ty)
                .descriptor_count(1)
                .stage_flags(stages),
        );
        self
    }

    pub fn uniform_buffer(self, binding: u32, stages: vk::ShaderStageFlags) -> Self {
        self.with(binding, vk::DescriptorType::UNIFORM_BUFFER, stages)
    }

    pub fn sampled_image(self, binding: u32, stages: vk::ShaderStageFlags) -> Self {
        self.with(binding, vk::DescriptorType::COMBINED_IMAGE_SAMPLER, stages)
    }

    pub fn bindings(&self) -> &[vk::DescriptorSetLayoutBinding<'a>] {
        &self.bindings
    }

    /// Pool sizes for `sets` sets of this layout, one entry per type.
    pub fn pool_sizes(&self, sets: u32) -> Vec<vk::DescriptorPoolSize> {
        let mut sizes: Vec<vk::DescriptorPoolSize> = Vec::new();
        for binding in &self.bindings {
            let ty = binding.descriptor_type;
            match sizes.iter_mut().find(|size| size.ty == ty) {
                Some(size) => size.descriptor_count += sets,
                None => sizes.push(vk::DescriptorPoolSize {
                    ty,
                    descriptor_count: sets,
                }),
            }
        }
        sizes
    }

    /// # Safety
    /// The device must be valid.
    pub unsafe fn build(&self, device: &ash::Device) -> Result<vk::DescriptorSetLayout> {
        let info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&self.bindings);
        // SAFETY: caller guarantees a valid device
        Ok(unsafe { device.create_descriptor_set_layout(&info, None) }?)
    }
}

/// Descriptor pool. Sets may be freed one by one.
pub struct DescriptorPool {
    pool: vk::DescriptorPool,
}

impl DescriptorPool {
    /// # Safety
    /// The device must be valid.
    pub unsafe fn new(
        device: &ash::Device,
        max_sets: u32,
        pool_sizes: &[vk::DescriptorPoolSize],
    ) -> Result<Self> {
        let info = vk::DescriptorPoolCreateInfo::default()
            .max_sets(max_sets)
            .pool_sizes(pool_sizes)
            .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET);
        // SAFETY: caller guarantees a valid device
        let pool = unsafe { device.create_descriptor_pool(&info, None) }?;
        Ok(Self { pool })
    }

    /// Pool with room for `max_sets` sets laid out like `layout`.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn for_layout(
        device: &ash::Device,
        layout: &DescriptorSetLayoutBuilder<'_>,
        max_sets: u32,
    ) -> Result<Self> {
        // SAFETY: forwarded from caller
        unsafe { Self::new(device, max_sets, &layout.pool_sizes(max_sets)) }
    }

    pub fn handle(&self) -> vk::DescriptorPool {
        self.pool
    }

    /// Allocate `count` sets of the same layout.
    ///
    /// # Safety
    /// `layout` must belong to `device` and the pool must have room.
    pub unsafe fn allocate(
        &self,
        device: &ash::Device,
        layout: vk::DescriptorSetLayout,
        count: usize,
    ) -> Result<Vec<vk::DescriptorSet>> {
        let layouts = vec![layout; count];
        let info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(self.pool)
            .set_layouts(&layouts);
        // SAFETY: caller guarantees valid handles
        Ok(unsafe { device.allocate_descriptor_sets(&info) }?)
    }

    /// # Safety
    /// No set from this pool may still be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        // SAFETY: caller guarantees the pool is idle
        unsafe { device.destroy_descriptor_pool(self.pool, None) };
    }
}

/// Point `binding` of `set` at the first `range` bytes of `buffer`.
///
/// # Safety
/// All handles must be valid and `set` must not be in use by the GPU.
pub unsafe fn write_uniform_buffer(
    device: &ash::Device,
    set: vk::DescriptorSet,
    binding: u32,
    buffer: vk::Buffer,
    range: u64,
) {
    let info = [vk::DescriptorBufferInfo {
        buffer,
        offset: 0,
        range,
    }];
    let write = vk::WriteDescriptorSet::default()
        .dst_set(set)
        .dst_binding(binding)
        .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
        .buffer_info(&info);
    // SAFETY: caller guarantees valid, idle handles
    unsafe { device.update_descriptor_sets(&[write], &[]) };
}

/// Point `binding` of `set` at a shader-readable image.
///
/// # Safety
/// All handles must be valid and `set` must not be in use by the GPU.
pub unsafe fn write_combined_image_sampler(
    device: &ash::Device,
    set: vk::DescriptorSet,
    binding: u32,
    view: vk::ImageView,
    sampler: vk::Sampler,
) {
    let info = [vk::DescriptorImageInfo {
        sampler,
        image_view: view,
        image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
    }];
    let write = vk::WriteDescriptorSet::default()
        .dst_set(set)
        .dst_binding(binding)
        .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
        .image_info(&info);
    // SAFETY: caller guarantees valid, idle handles
    unsafe { device.update_descriptor_sets(&[write], &[]) };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene_layout() -> DescriptorSetLayoutBuilder<'static> {
        DescriptorSetLayoutBuilder::new()
            .uniform_buffer(0, vk::ShaderStageFlags::VERTEX)
            .sampled_image(1, vk::ShaderStageFlags::FRAGMENT)
    }

    #[test]
    fn bindings_keep_declaration_order() {
        let layout = scene_layout();
        let bindings = layout.bindings();
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0].descriptor_type, vk::DescriptorType::UNIFORM_BUFFER);
        assert_eq!(bindings[0].stage_flags, vk::ShaderStageFlags::VERTEX);
        assert_eq!(bindings[1].binding, 1);
        assert_eq!(bindings[1].stage_flags, vk::ShaderStageFlags::FRAGMENT);
        assert!(bindings.iter().all(|b| b.descriptor_count == 1));
    }

    #[test]
    fn pool_sizes_scale_with_set_count() {
        let sizes = scene_layout().pool_sizes(51);
        assert_eq!(sizes.len(), 2);
        assert!(sizes.iter().all(|s| s.descriptor_count == 51));
    }

    #[test]
    fn pool_sizes_merge_repeated_types() {
        let layout = DescriptorSetLayoutBuilder::new()
            .sampled_image(0, vk::ShaderStageFlags::FRAGMENT)
            .sampled_image(1, vk::ShaderStageFlags::FRAGMENT);
        let sizes = layout.pool_sizes(4);
        assert_eq!(sizes.len(), 1);
        assert_eq!(sizes[0].ty, vk::DescriptorType::COMBINED_IMAGE_SAMPLER);
        assert_eq!(sizes[0].descriptor_count, 8);
    }

    #[test]
    fn empty_layout_needs_no_pool_space() {
        assert!(DescriptorSetLayoutBuilder::new().pool_sizes(10).is_empty());
    }
}

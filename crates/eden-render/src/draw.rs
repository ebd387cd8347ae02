//! Draw submission through a command recording seam.
//!
//! Draw calls are expressed against [`CommandRecorder`] so the sequence of
//! binds, pushes and draws can be checked without a GPU.

use std::ops::Range;

use ash::vk;
use eden_core::Pose;
use glam::{Mat4, Vec3};

use crate::geometry::CUBE_VERTEX_COUNT;
use crate::mesh_store::Mesh;
use crate::vertex::PushConstants;

/// The two pipelines sharing the main layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineKind {
    /// Filled triangles, depth tested.
    Solid,
    /// Line list drawn over everything.
    Line,
}

/// Sink for the commands the renderer records inside its render pass.
pub trait CommandRecorder {
    type Buffer: Copy;
    type DescriptorSet: Copy;

    fn bind_pipeline(&mut self, kind: PipelineKind);
    fn bind_descriptor_set(&mut self, set: Self::DescriptorSet);
    fn bind_vertex_buffer(&mut self, buffer: Self::Buffer);
    fn push_model(&mut self, model: Mat4);
    fn draw(&mut self, vertex_count: u32);
    fn draw_range(&mut self, first_vertex: u32, vertex_count: u32);
}

/// Initial state after the render pass begins: solid pipeline, the frame's
/// descriptor set and the cube buffer.
pub fn record_frame_start<R: CommandRecorder>(
    recorder: &mut R,
    set: R::DescriptorSet,
    cube: R::Buffer,
) {
    recorder.bind_pipeline(PipelineKind::Solid);
    recorder.bind_descriptor_set(set);
    recorder.bind_vertex_buffer(cube);
}

/// Draw the bound unit cube at `pose`, scaled per axis.
pub fn record_cube<R: CommandRecorder>(recorder: &mut R, pose: &Pose, scale: Vec3) {
    recorder.push_model(pose.scaled_model_matrix(scale));
    recorder.draw(CUBE_VERTEX_COUNT as u32);
}

/// Draw a stored mesh at `pose`, then rebind the cube buffer so later cube
/// draws see the state they expect.
pub fn record_mesh<R: CommandRecorder>(
    recorder: &mut R,
    mesh: &Mesh<R::Buffer>,
    pose: &Pose,
    cube: R::Buffer,
) {
    recorder.push_model(pose.model_matrix());
    recorder.bind_vertex_buffer(mesh.buffer);
    recorder.draw(mesh.vertex_count);
    recorder.bind_vertex_buffer(cube);
}

/// Draw world-space colored cubes from `range` of the batch buffer with the
/// solid pipeline, then rebind the cube buffer.
pub fn record_colored_cubes<R: CommandRecorder>(
    recorder: &mut R,
    batch: R::Buffer,
    range: Range<u32>,
    cube: R::Buffer,
) {
    if range.is_empty() {
        return;
    }
    recorder.push_model(Mat4::IDENTITY);
    recorder.bind_vertex_buffer(batch);
    recorder.draw_range(range.start, range.end - range.start);
    recorder.bind_vertex_buffer(cube);
}

/// Draw the frame's uploaded lines in one call. Nothing is recorded for an
/// empty batch.
pub fn record_lines<R: CommandRecorder>(recorder: &mut R, lines: R::Buffer, vertex_count: u32) {
    if vertex_count == 0 {
        return;
    }
    recorder.bind_pipeline(PipelineKind::Line);
    recorder.push_model(Mat4::IDENTITY);
    recorder.bind_vertex_buffer(lines);
    recorder.draw(vertex_count);
}

/// Records into a Vulkan command buffer inside the main render pass.
pub struct VkRecorder<'a> {
    device: &'a ash::Device,
    cmd: vk::CommandBuffer,
    layout: vk::PipelineLayout,
    solid: vk::Pipeline,
    line: vk::Pipeline,
}

impl<'a> VkRecorder<'a> {
    /// # Safety
    /// `cmd` must be recording inside a render pass compatible with both
    /// pipelines, which must use `layout`.
    pub unsafe fn new(
        device: &'a ash::Device,
        cmd: vk::CommandBuffer,
        layout: vk::PipelineLayout,
        solid: vk::Pipeline,
        line: vk::Pipeline,
    ) -> Self {
        Self {
            device,
            cmd,
            layout,
            solid,
            line,
        }
    }
}

// SAFETY (all methods): `new` requires a command buffer in the recording
// state with compatible pipelines and layout.
impl CommandRecorder for VkRecorder<'_> {
    type Buffer = vk::Buffer;
    type DescriptorSet = vk::DescriptorSet;

    fn bind_pipeline(&mut self, kind: PipelineKind) {
        let pipeline = match kind {
            PipelineKind::Solid => self.solid,
            PipelineKind::Line => self.line,
        };
        unsafe {
            self.device
                .cmd_bind_pipeline(self.cmd, vk::PipelineBindPoint::GRAPHICS, pipeline);
        }
    }

    fn bind_descriptor_set(&mut self, set: vk::DescriptorSet) {
        unsafe {
            self.device.cmd_bind_descriptor_sets(
                self.cmd,
                vk::PipelineBindPoint::GRAPHICS,
                self.layout,
                0,
                &[set],
                &[],
            );
        }
    }

    fn bind_vertex_buffer(&mut self, buffer: vk::Buffer) {
        unsafe {
            self.device
                .cmd_bind_vertex_buffers(self.cmd, 0, &[buffer], &[0]);
        }
    }

    fn push_model(&mut self, model: Mat4) {
        let constants = PushConstants { model };
        unsafe {
            self.device.cmd_push_constants(
                self.cmd,
                self.layout,
                vk::ShaderStageFlags::VERTEX,
                0,
                bytemuck::bytes_of(&constants),
            );
        }
    }

    fn draw(&mut self, vertex_count: u32) {
        unsafe {
            self.device.cmd_draw(self.cmd, vertex_count, 1, 0, 0);
        }
    }

    fn draw_range(&mut self, first_vertex: u32, vertex_count: u32) {
        unsafe {
            self.device
                .cmd_draw(self.cmd, vertex_count, 1, first_vertex, 0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq)]
    enum Command {
        Pipeline(PipelineKind),
        Set(u32),
        Vertices(u32),
        Push(Mat4),
        Draw(u32),
        DrawRange(u32, u32),
    }

    #[derive(Default)]
    struct Recording {
        commands: Vec<Command>,
    }

    impl Recording {
        fn pushes(&self) -> Vec<Mat4> {
            self.commands
                .iter()
                .filter_map(|c| match c {
                    Command::Push(m) => Some(*m),
                    _ => None,
                })
                .collect()
        }

        fn draws(&self) -> usize {
            self.commands
                .iter()
                .filter(|c| matches!(c, Command::Draw(_) | Command::DrawRange(..)))
                .count()
        }
    }

    impl CommandRecorder for Recording {
        type Buffer = u32;
        type DescriptorSet = u32;

        fn bind_pipeline(&mut self, kind: PipelineKind) {
            self.commands.push(Command::Pipeline(kind));
        }
        fn bind_descriptor_set(&mut self, set: u32) {
            self.commands.push(Command::Set(set));
        }
        fn bind_vertex_buffer(&mut self, buffer: u32) {
            self.commands.push(Command::Vertices(buffer));
        }
        fn push_model(&mut self, model: Mat4) {
            self.commands.push(Command::Push(model));
        }
        fn draw(&mut self, vertex_count: u32) {
            self.commands.push(Command::Draw(vertex_count));
        }
        fn draw_range(&mut self, first_vertex: u32, vertex_count: u32) {
            self.commands
                .push(Command::DrawRange(first_vertex, vertex_count));
        }
    }

    const CUBE: u32 = 1;
    const LINES: u32 = 2;
    const BATCH: u32 = 3;

    #[test]
    fn every_draw_gets_its_own_push() {
        let a = Pose::at(Vec3::new(1.0, 0.0, 0.0));
        let b = Pose::new(Vec3::new(0.0, 5.0, 0.0), Vec3::new(0.0, 45.0, 0.0));
        let a_moved = Pose::at(Vec3::new(-3.0, 0.0, 0.0));
        let mesh = Mesh {
            buffer: 9,
            vertex_count: 12,
        };

        let mut rec = Recording::default();
        record_frame_start(&mut rec, 0, CUBE);
        record_cube(&mut rec, &a, Vec3::ONE);
        record_mesh(&mut rec, &mesh, &b, CUBE);
        record_cube(&mut rec, &a_moved, Vec3::splat(2.0));
        record_lines(&mut rec, LINES, 6);

        assert_eq!(rec.pushes().len(), rec.draws());
        let pushes = rec.pushes();
        assert_eq!(pushes[0], a.scaled_model_matrix(Vec3::ONE));
        assert_eq!(pushes[1], b.model_matrix());
        assert_eq!(pushes[2], a_moved.scaled_model_matrix(Vec3::splat(2.0)));
        assert_eq!(pushes[3], Mat4::IDENTITY);
    }

    #[test]
    fn frame_start_binds_solid_state() {
        let mut rec = Recording::default();
        record_frame_start(&mut rec, 4, CUBE);
        assert_eq!(
            rec.commands,
            vec![
                Command::Pipeline(PipelineKind::Solid),
                Command::Set(4),
                Command::Vertices(CUBE)
            ]
        );
    }

    #[test]
    fn mesh_draw_restores_cube_buffer() {
        let mesh = Mesh {
            buffer: 7,
            vertex_count: 3,
        };
        let mut rec = Recording::default();
        record_mesh(&mut rec, &mesh, &Pose::default(), CUBE);
        assert_eq!(rec.commands[1], Command::Vertices(7));
        assert_eq!(rec.commands[2], Command::Draw(3));
        assert_eq!(rec.commands.last(), Some(&Command::Vertices(CUBE)));
    }

    #[test]
    fn cube_draws_all_vertices() {
        let mut rec = Recording::default();
        record_cube(&mut rec, &Pose::default(), Vec3::ONE);
        assert_eq!(rec.commands.last(), Some(&Command::Draw(36)));
    }

    #[test]
    fn lines_switch_pipeline_with_identity_model() {
        let mut rec = Recording::default();
        record_lines(&mut rec, LINES, 8);
        assert_eq!(
            rec.commands,
            vec![
                Command::Pipeline(PipelineKind::Line),
                Command::Push(Mat4::IDENTITY),
                Command::Vertices(LINES),
                Command::Draw(8)
            ]
        );
    }

    #[test]
    fn empty_line_batch_records_nothing() {
        let mut rec = Recording::default();
        record_lines(&mut rec, LINES, 0);
        assert!(rec.commands.is_empty());
    }

    #[test]
    fn colored_cubes_draw_pending_range_in_world_space() {
        let mut rec = Recording::default();
        record_colored_cubes(&mut rec, BATCH, 72..144, CUBE);
        assert_eq!(
            rec.commands,
            vec![
                Command::Push(Mat4::IDENTITY),
                Command::Vertices(BATCH),
                Command::DrawRange(72, 72),
                Command::Vertices(CUBE)
            ]
        );
    }

    #[test]
    fn flushed_colored_cubes_record_nothing() {
        let mut rec = Recording::default();
        record_colored_cubes(&mut rec, BATCH, 36..36, CUBE);
        assert!(rec.commands.is_empty());
    }
}

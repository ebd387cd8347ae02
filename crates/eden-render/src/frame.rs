//! Frame-scoped CPU state and the begin/end protocol bookkeeping.
//!
//! The GPU side lives in [`crate::renderer`]; this module decides which
//! swapchain image a frame targets, whether recording is active, and owns
//! everything that resets at begin-frame.

use eden_gpu::AcquiredImage;

use crate::config::MAX_TEXTURE_SWITCHES_PER_FRAME;
use crate::cube_batch::ColoredCubeBatch;
use crate::error::{RendererError, Result};
use crate::lines::LineBatch;

/// Where the frame protocol currently stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FramePhase {
    /// Between frames, or after a skipped acquisition.
    Idle,
    /// A command buffer for `image` is being recorded.
    Recording { image: u32 },
}

/// Frame bookkeeping.
#[derive(Debug)]
pub struct FrameState {
    image_count: u32,
    phase: FramePhase,
    current_image: u32,
    frames_completed: u64,
    frames_skipped: u64,
    texture_switches: usize,
    /// Lines accumulated since the last begin-frame.
    pub lines: LineBatch,
    /// Colored cubes accumulated since the last begin-frame.
    pub colored_cubes: ColoredCubeBatch,
}

impl FrameState {
    pub fn new(image_count: u32, line_capacity_bytes: usize, cube_capacity_bytes: usize) -> Self {
        Self {
            image_count,
            phase: FramePhase::Idle,
            current_image: 0,
            frames_completed: 0,
            frames_skipped: 0,
            texture_switches: 0,
            lines: LineBatch::new(line_capacity_bytes),
            colored_cubes: ColoredCubeBatch::new(cube_capacity_bytes),
        }
    }

    /// Start a frame with the outcome of image acquisition.
    ///
    /// Frame-scoped state is reset either way. Returns the image to record
    /// into, or `None` when the frame is skipped.
    pub fn begin(&mut self, acquired: AcquiredImage) -> Result<Option<u32>> {
        if self.is_recording() {
            return Err(RendererError::FrameState("begin_frame while recording"));
        }
        self.lines.clear();
        self.colored_cubes.clear();
        self.texture_switches = 0;

        match acquired {
            AcquiredImage::OutOfDate => {
                self.frames_skipped += 1;
                Ok(None)
            }
            AcquiredImage::Ready { index, .. } => {
                if index >= self.image_count {
                    return Err(RendererError::FrameState("acquired image out of range"));
                }
                self.current_image = index;
                self.phase = FramePhase::Recording { image: index };
                Ok(Some(index))
            }
        }
    }

    /// Leave the recording phase. Returns the image that was recorded, or
    /// `None` when no frame was active.
    pub fn finish(&mut self) -> Option<u32> {
        match self.phase {
            FramePhase::Recording { image } => {
                self.phase = FramePhase::Idle;
                self.frames_completed += 1;
                Some(image)
            }
            FramePhase::Idle => None,
        }
    }

    /// Abandon recording after a failure, without counting the frame.
    pub fn abort(&mut self) {
        self.phase = FramePhase::Idle;
    }

    /// Claim the next per-image texture descriptor slot for this frame.
    pub fn claim_texture_slot(&mut self) -> Option<usize> {
        if self.texture_switches >= MAX_TEXTURE_SWITCHES_PER_FRAME {
            return None;
        }
        let slot = self.texture_switches;
        self.texture_switches += 1;
        Some(slot)
    }

    #[inline]
    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    #[inline]
    pub fn is_recording(&self) -> bool {
        matches!(self.phase, FramePhase::Recording { .. })
    }

    /// Image of the most recent successful acquisition.
    #[inline]
    pub fn current_image(&self) -> u32 {
        self.current_image
    }

    #[inline]
    pub fn image_count(&self) -> u32 {
        self.image_count
    }

    #[inline]
    pub fn frames_completed(&self) -> u64 {
        self.frames_completed
    }

    #[inline]
    pub fn frames_skipped(&self) -> u64 {
        self.frames_skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    /// Presentation engine that hands images out in order.
    struct RoundRobin {
        next: u32,
        count: u32,
    }

    impl RoundRobin {
        fn acquire(&mut self) -> AcquiredImage {
            let index = self.next;
            self.next = (self.next + 1) % self.count;
            AcquiredImage::Ready {
                index,
                suboptimal: false,
            }
        }
    }

    #[test]
    fn frame_index_cycles_modulo_image_count() {
        let mut frames = FrameState::new(3, 1024, 64 * 1024);
        let mut engine = RoundRobin { next: 0, count: 3 };

        for k in 0..10u32 {
            assert_eq!(frames.begin(engine.acquire()).unwrap(), Some(k % 3));
            assert_eq!(frames.current_image(), k % 3);
            assert_eq!(frames.finish(), Some(k % 3));
        }
        assert_eq!(frames.frames_completed(), 10);
        assert_eq!(engine.next, 10 % 3);
    }

    #[test]
    fn batches_reset_at_begin_frame() {
        let mut frames = FrameState::new(3, 64 * 1024, 64 * 1024);
        let mut engine = RoundRobin { next: 0, count: 3 };

        frames.begin(engine.acquire()).unwrap();
        assert!(frames.lines.is_empty());
        for i in 0..5 {
            frames
                .lines
                .push(Vec3::ZERO, Vec3::splat(i as f32), Vec3::ONE)
                .unwrap();
        }
        frames
            .colored_cubes
            .push(&eden_core::Pose::default(), Vec3::ONE, Vec3::X)
            .unwrap();
        frames.colored_cubes.mark_flushed();
        frames.finish();
        assert_eq!(frames.lines.len(), 10);

        frames.begin(engine.acquire()).unwrap();
        assert!(frames.lines.is_empty());
        assert!(frames.colored_cubes.is_empty());
        assert_eq!(frames.colored_cubes.pending(), 0..0);
    }

    #[test]
    fn out_of_date_skips_frame() {
        let mut frames = FrameState::new(3, 1024, 64 * 1024);
        frames
            .lines
            .push(Vec3::ZERO, Vec3::X, Vec3::ONE)
            .unwrap();

        assert_eq!(frames.begin(AcquiredImage::OutOfDate).unwrap(), None);
        assert_eq!(frames.phase(), FramePhase::Idle);
        assert!(frames.lines.is_empty());
        assert_eq!(frames.finish(), None);
        assert_eq!(frames.frames_skipped(), 1);
        assert_eq!(frames.frames_completed(), 0);
    }

    #[test]
    fn double_begin_is_rejected() {
        let mut frames = FrameState::new(2, 1024, 64 * 1024);
        let ready = AcquiredImage::Ready {
            index: 1,
            suboptimal: false,
        };
        frames.begin(ready).unwrap();
        assert!(frames.begin(ready).is_err());
        assert_eq!(frames.phase(), FramePhase::Recording { image: 1 });
    }

    #[test]
    fn out_of_range_image_is_rejected() {
        let mut frames = FrameState::new(2, 1024, 64 * 1024);
        let result = frames.begin(AcquiredImage::Ready {
            index: 5,
            suboptimal: false,
        });
        assert!(result.is_err());
        assert!(!frames.is_recording());
    }

    #[test]
    fn texture_slots_are_bounded_per_frame() {
        let mut frames = FrameState::new(3, 1024, 64 * 1024);
        let mut engine = RoundRobin { next: 0, count: 3 };
        frames.begin(engine.acquire()).unwrap();

        for expected in 0..MAX_TEXTURE_SWITCHES_PER_FRAME {
            assert_eq!(frames.claim_texture_slot(), Some(expected));
        }
        assert_eq!(frames.claim_texture_slot(), None);

        frames.finish();
        frames.begin(engine.acquire()).unwrap();
        assert_eq!(frames.claim_texture_slot(), Some(0));
    }
}

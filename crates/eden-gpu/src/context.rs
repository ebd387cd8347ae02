//! Instance, device and queue ownership.
//!
//! The renderer draws and presents from one queue, so context creation picks
//! a single family that can do both for the window's surface.

use crate::error::{GpuError, Result};
use crate::instance::{create_instance, select_physical_device, DebugMessenger};
use crate::memory::GpuAllocator;
use crate::surface::SurfaceContext;
use ash::vk;
use parking_lot::Mutex;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::sync::Arc;

/// Device-level state shared by every renderer subsystem.
pub struct GpuContext {
    // Holds the loaded Vulkan library open.
    _entry: ash::Entry,
    instance: ash::Instance,
    debug_messenger: Option<DebugMessenger>,
    physical_device: vk::PhysicalDevice,
    device: Arc<ash::Device>,
    allocator: Mutex<GpuAllocator>,
    queue_family: u32,
    queue: vk::Queue,
}

impl GpuContext {
    pub fn instance(&self) -> &ash::Instance {
        &self.instance
    }

    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    /// Queue used for graphics and presentation.
    pub fn queue(&self) -> vk::Queue {
        self.queue
    }

    /// Family index of [`Self::queue`].
    pub fn queue_family(&self) -> u32 {
        self.queue_family
    }

    pub fn allocator(&self) -> &Mutex<GpuAllocator> {
        &self.allocator
    }

    /// Block until the device has finished all submitted work.
    pub fn wait_idle(&self) -> Result<()> {
        // SAFETY: the device lives as long as `self`
        unsafe { self.device.device_wait_idle() }?;
        Ok(())
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        // SAFETY: the context is the last owner of these objects. Memory goes
        // back to the allocator before the device that owns it is destroyed.
        unsafe {
            let _ = self.device.device_wait_idle();
            self.allocator.lock().shutdown();
            self.device.destroy_device(None);
            if let Some(messenger) = self.debug_messenger.take() {
                messenger.destroy();
            }
            self.instance.destroy_instance(None);
        }
    }
}

/// Options for [`GpuContextBuilder::build`].
pub struct GpuContextBuilder {
    app_name: String,
    validation: bool,
}

impl Default for GpuContextBuilder {
    fn default() -> Self {
        Self {
            app_name: "Eden".to_string(),
            validation: cfg!(debug_assertions),
        }
    }
}

impl GpuContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Application name reported to the driver.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    /// Request the Khronos validation layer. Ignored when it is not installed.
    pub fn validation(mut self, enable: bool) -> Self {
        self.validation = enable;
        self
    }

    /// Build the GPU context and a presentation surface for `window`.
    ///
    /// The surface must exist before the queue family is chosen, so both are
    /// created together. The caller destroys the surface before dropping the
    /// context.
    pub fn build<W>(self, window: &W) -> Result<(GpuContext, SurfaceContext)>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        // SAFETY: loading the system Vulkan library has no preconditions here
        let entry = unsafe { ash::Entry::load() }.map_err(|e| GpuError::Loading(e.to_string()))?;
        let display = window
            .display_handle()
            .map_err(|e| GpuError::SurfaceCreation(format!("display handle unavailable: {e}")))?
            .as_raw();

        // SAFETY: `entry` was just loaded
        let (instance, validation) =
            unsafe { create_instance(&entry, display, &self.app_name, self.validation) }?;
        let mut partial = PartialInstance {
            instance: &instance,
            messenger: None,
            surface: None,
            armed: true,
        };
        if validation {
            // SAFETY: the instance enables the debug utils extension with validation
            partial.messenger = Some(unsafe { DebugMessenger::new(&entry, &instance) }?);
        }

        // SAFETY: the instance was created with this window's surface extensions
        let (surface, surface_loader) =
            unsafe { SurfaceContext::create_surface(&entry, &instance, window) }?;
        partial.surface = Some((surface, surface_loader.clone()));

        // SAFETY: all handles below come from `instance`
        let (physical_device, queue_family, device) = unsafe {
            let physical_device = select_physical_device(&instance)?;
            let families = instance.get_physical_device_queue_family_properties(physical_device);
            let queue_family = pick_queue_family(&families, |index| {
                Ok(surface_loader.get_physical_device_surface_support(
                    physical_device,
                    index,
                    surface,
                )?)
            })?;
            let device = create_device(&instance, physical_device, queue_family)?;
            (physical_device, queue_family, Arc::new(device))
        };

        // SAFETY: `device` was just created from `physical_device`
        let allocator =
            unsafe { GpuAllocator::new(&instance, device.clone(), physical_device) };
        let allocator = match allocator {
            Ok(allocator) => allocator,
            Err(e) => {
                // SAFETY: nothing has been created on the device yet
                unsafe { device.destroy_device(None) };
                return Err(e);
            }
        };
        // SAFETY: the family was requested with one queue
        let queue = unsafe { device.get_device_queue(queue_family, 0) };
        tracing::info!("Using queue family {queue_family} for graphics and present");

        let debug_messenger = partial.disarm();
        let surface_context = SurfaceContext::new(&instance, &device, surface, surface_loader);
        let gpu = GpuContext {
            _entry: entry,
            instance,
            debug_messenger,
            physical_device,
            device,
            allocator: Mutex::new(allocator),
            queue_family,
            queue,
        };
        Ok((gpu, surface_context))
    }
}

/// Instance-level objects created before the context exists.
///
/// Destroys them in reverse order unless disarmed.
struct PartialInstance<'a> {
    instance: &'a ash::Instance,
    messenger: Option<DebugMessenger>,
    surface: Option<(vk::SurfaceKHR, ash::khr::surface::Instance)>,
    armed: bool,
}

impl PartialInstance<'_> {
    fn disarm(mut self) -> Option<DebugMessenger> {
        self.armed = false;
        self.messenger.take()
    }
}

impl Drop for PartialInstance<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        // SAFETY: construction failed, so nothing else references these objects
        unsafe {
            if let Some((surface, loader)) = self.surface.take() {
                loader.destroy_surface(surface, None);
            }
            if let Some(messenger) = self.messenger.take() {
                messenger.destroy();
            }
            self.instance.destroy_instance(None);
        }
    }
}

/// Index of the first family with graphics support for which `can_present`
/// reports true.
pub fn pick_queue_family(
    families: &[vk::QueueFamilyProperties],
    mut can_present: impl FnMut(u32) -> Result<bool>,
) -> Result<u32> {
    for (index, family) in (0u32..).zip(families) {
        if family.queue_count > 0
            && family.queue_flags.contains(vk::QueueFlags::GRAPHICS)
            && can_present(index)?
        {
            return Ok(index);
        }
    }
    Err(GpuError::NoSuitableDevice)
}

/// Logical device with one queue from `queue_family` and the swapchain
/// extension enabled.
///
/// # Safety
/// The instance and physical device must be valid.
unsafe fn create_device(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    queue_family: u32,
) -> Result<ash::Device> {
    let priorities = [1.0_f32];
    let queues = [vk::DeviceQueueCreateInfo::default()
        .queue_family_index(queue_family)
        .queue_priorities(&priorities)];
    let extensions = [ash::khr::swapchain::NAME.as_ptr()];
    let features = vk::PhysicalDeviceFeatures::default();

    let info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queues)
        .enabled_extension_names(&extensions)
        .enabled_features(&features);
    // SAFETY: caller guarantees valid handles
    Ok(unsafe { instance.create_device(physical_device, &info, None) }?)
}

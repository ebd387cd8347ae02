//! Vulkan instance creation, validation messenger and device selection.

use crate::error::{GpuError, Result};
use ash::vk;
use raw_window_handle::RawDisplayHandle;
use std::ffi::{c_char, c_void, CStr, CString};

/// Khronos validation layer.
pub const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Check whether the validation layer is installed.
///
/// # Safety
/// The entry must be a valid Vulkan entry point.
pub unsafe fn validation_layer_available(entry: &ash::Entry) -> bool {
    // SAFETY: caller guarantees a valid entry
    let Ok(layers) = (unsafe { entry.enumerate_instance_layer_properties() }) else {
        return false;
    };
    layers
        .iter()
        .any(|props| props.layer_name_as_c_str() == Ok(VALIDATION_LAYER))
}

/// Create a Vulkan instance able to present to `display`.
///
/// Validation is only enabled when requested and the layer is installed;
/// otherwise a warning is logged and the instance is created without it.
/// Returns the instance and whether validation ended up enabled.
///
/// # Safety
/// The entry must be a valid Vulkan entry point.
pub unsafe fn create_instance(
    entry: &ash::Entry,
    display: RawDisplayHandle,
    app_name: &str,
    enable_validation: bool,
) -> Result<(ash::Instance, bool)> {
    let app_name = CString::new(app_name)
        .map_err(|e| GpuError::InstanceCreation(format!("invalid application name: {e}")))?;

    let app_info = vk::ApplicationInfo::default()
        .application_name(&app_name)
        .application_version(vk::make_api_version(0, 0, 1, 0))
        .engine_name(c"Eden")
        .engine_version(vk::make_api_version(0, 0, 1, 0))
        .api_version(vk::API_VERSION_1_1);

    let validation = if enable_validation {
        // SAFETY: caller guarantees a valid entry
        let available = unsafe { validation_layer_available(entry) };
        if !available {
            tracing::warn!(
                "Validation layer {} not available",
                VALIDATION_LAYER.to_string_lossy()
            );
        }
        available
    } else {
        false
    };

    let mut extension_names: Vec<*const c_char> = ash_window::enumerate_required_extensions(display)
        .map_err(|e| GpuError::InstanceCreation(format!("surface extensions: {e}")))?
        .to_vec();
    if validation {
        extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
    }
    #[cfg(target_os = "macos")]
    extension_names.push(ash::khr::portability_enumeration::NAME.as_ptr());

    let layer_names: Vec<*const c_char> = if validation {
        vec![VALIDATION_LAYER.as_ptr()]
    } else {
        vec![]
    };

    // Required for MoltenVK on macOS
    #[cfg(target_os = "macos")]
    let create_flags = vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR;
    #[cfg(not(target_os = "macos"))]
    let create_flags = vk::InstanceCreateFlags::empty();

    let create_info = vk::InstanceCreateInfo::default()
        .application_info(&app_info)
        .enabled_extension_names(&extension_names)
        .enabled_layer_names(&layer_names)
        .flags(create_flags);

    // SAFETY: every pointer in create_info outlives this call
    let instance = unsafe { entry.create_instance(&create_info, None) }
        .map_err(|e| GpuError::InstanceCreation(e.to_string()))?;

    Ok((instance, validation))
}

/// Debug-utils messenger routing validation output into `tracing`.
pub struct DebugMessenger {
    loader: ash::ext::debug_utils::Instance,
    messenger: vk::DebugUtilsMessengerEXT,
}

impl DebugMessenger {
    /// Install the messenger on `instance`.
    ///
    /// # Safety
    /// The instance must have been created with the debug-utils extension.
    pub unsafe fn new(entry: &ash::Entry, instance: &ash::Instance) -> Result<Self> {
        let loader = ash::ext::debug_utils::Instance::new(entry, instance);

        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                    | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                    | vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(debug_callback));

        // SAFETY: caller guarantees the extension is enabled
        let messenger = unsafe { loader.create_debug_utils_messenger(&create_info, None) }?;

        Ok(Self { loader, messenger })
    }

    /// Destroy the messenger.
    ///
    /// # Safety
    /// Must be called before the owning instance is destroyed.
    pub unsafe fn destroy(&self) {
        // SAFETY: caller guarantees the instance is still alive
        unsafe {
            self.loader
                .destroy_debug_utils_messenger(self.messenger, None);
        }
    }
}

/// Whether a message of this severity is shown in the current build.
///
/// Errors and warnings always pass; info and verbose only in debug builds.
pub fn severity_enabled(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> bool {
    severity.intersects(
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING,
    ) || cfg!(debug_assertions)
}

unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut c_void,
) -> vk::Bool32 {
    if !severity_enabled(message_severity) {
        return vk::FALSE;
    }

    let message = if callback_data.is_null() {
        String::from("(no message)")
    } else {
        // SAFETY: the driver passes valid callback data for the duration of the call
        let data = unsafe { &*callback_data };
        if data.p_message.is_null() {
            String::from("(null message)")
        } else {
            // SAFETY: p_message is a null-terminated string owned by the driver
            unsafe { CStr::from_ptr(data.p_message) }
                .to_string_lossy()
                .into_owned()
        }
    };

    let kind = if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
        "validation"
    } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        "performance"
    } else {
        "general"
    };

    if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        tracing::error!(target: "vulkan", kind, "{message}");
    } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        tracing::warn!(target: "vulkan", kind, "{message}");
    } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        tracing::info!(target: "vulkan", kind, "{message}");
    } else {
        tracing::debug!(target: "vulkan", kind, "{message}");
    }

    // Never abort the call that triggered the message.
    vk::FALSE
}

/// Select the first enumerated physical device.
///
/// # Safety
/// The instance must be valid.
pub unsafe fn select_physical_device(instance: &ash::Instance) -> Result<vk::PhysicalDevice> {
    // SAFETY: caller guarantees a valid instance
    let devices = unsafe { instance.enumerate_physical_devices() }?;
    let device = devices.first().copied().ok_or(GpuError::NoSuitableDevice)?;

    // SAFETY: the device handle came from this instance
    let properties = unsafe { instance.get_physical_device_properties(device) };
    let name = properties
        .device_name_as_c_str()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    tracing::info!(
        "Selected GPU: {name} ({:?}, Vulkan {}.{})",
        properties.device_type,
        vk::api_version_major(properties.api_version),
        vk::api_version_minor(properties.api_version)
    );

    Ok(device)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_and_warnings_always_pass() {
        assert!(severity_enabled(
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
        ));
        assert!(severity_enabled(
            vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
        ));
    }

    #[test]
    fn verbose_only_in_debug_builds() {
        assert_eq!(
            severity_enabled(vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE),
            cfg!(debug_assertions)
        );
        assert_eq!(
            severity_enabled(vk::DebugUtilsMessageSeverityFlagsEXT::INFO),
            cfg!(debug_assertions)
        );
    }
}

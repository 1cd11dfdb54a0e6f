//! Vulkan instance management.
//!
//! This module handles VkInstance creation, validation layers, and debug
//! messengers.
//!
//! # Overview
//!
//! The [`Instance`] struct provides a safe abstraction over the Vulkan
//! instance, including optional validation layer support for debugging.
//!
//! # Example
//!
//! ```no_run
//! use raw_window_handle::RawDisplayHandle;
//! use triangle_rhi::instance::Instance;
//!
//! # fn example(display_handle: RawDisplayHandle) {
//! // Create an instance with validation layers enabled (debug build)
//! let instance = Instance::new(cfg!(debug_assertions), display_handle)
//!     .expect("Failed to create Vulkan instance");
//!
//! let vk_instance = instance.handle();
//! let entry = instance.entry();
//! # }
//! ```

use std::ffi::{CStr, c_char};

use ash::{Entry, vk};
use raw_window_handle::RawDisplayHandle;
use tracing::{error, info, warn};

use crate::error::RhiError;

/// The Khronos validation layer name.
const VALIDATION_LAYER_NAME: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Vulkan instance wrapper with optional validation layer support.
///
/// This struct manages the lifetime of the Vulkan instance and its
/// associated debug utilities. When dropped, it cleans up all Vulkan
/// resources it owns.
pub struct Instance {
    /// Vulkan entry point loader
    entry: Entry,
    /// Vulkan instance handle
    instance: ash::Instance,
    /// Debug utils extension loader (only present when validation is enabled)
    debug_utils: Option<ash::ext::debug_utils::Instance>,
    /// Debug messenger handle (only present when validation is enabled)
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
}

impl Instance {
    /// Creates a new Vulkan 1.3 instance.
    ///
    /// # Arguments
    ///
    /// * `enable_validation` - If true, enables validation layers and the
    ///   debug messenger when the layer is available
    /// * `display_handle` - Display the instance must be able to create
    ///   surfaces for; decides the surface extensions to request
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The Vulkan library cannot be loaded
    /// - The display has no matching surface extension
    /// - Instance creation fails
    /// - Debug messenger setup fails (when validation is enabled)
    pub fn new(
        enable_validation: bool,
        display_handle: RawDisplayHandle,
    ) -> Result<Self, RhiError> {
        // Load the Vulkan library
        let entry = unsafe { Entry::load()? };

        let validation_available = if enable_validation {
            let layers = unsafe { entry.enumerate_instance_layer_properties()? };
            validation_layer_present(&layers)
        } else {
            false
        };

        if enable_validation && !validation_available {
            warn!("Validation layer requested but not available, proceeding without it");
        }

        // Set up application info
        let app_info = vk::ApplicationInfo::default()
            .application_name(c"First Triangle")
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(c"No Engine")
            .engine_version(vk::make_api_version(0, 1, 0, 0))
            .api_version(vk::API_VERSION_1_3);

        // Collect required extensions
        let mut extensions = required_extensions(display_handle)?;
        if validation_available {
            extensions.push(ash::ext::debug_utils::NAME.as_ptr());
        }

        // Set up layers
        let layers = if validation_available {
            vec![VALIDATION_LAYER_NAME.as_ptr()]
        } else {
            vec![]
        };

        // Create instance
        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&extensions)
            .enabled_layer_names(&layers);

        let instance = unsafe {
            entry
                .create_instance(&create_info, None)
                .map_err(RhiError::from)?
        };

        info!("Vulkan instance created (API version 1.3)");

        // Set up debug messenger if validation is enabled
        let (debug_utils, debug_messenger) = if validation_available {
            let debug_utils = ash::ext::debug_utils::Instance::new(&entry, &instance);
            let messenger = Self::setup_debug_messenger(&debug_utils)?;
            info!("Validation layers enabled");
            (Some(debug_utils), Some(messenger))
        } else {
            (None, None)
        };

        Ok(Self {
            entry,
            instance,
            debug_utils,
            debug_messenger,
        })
    }

    /// Returns the Vulkan instance handle.
    #[inline]
    pub fn handle(&self) -> &ash::Instance {
        &self.instance
    }

    /// Returns the Vulkan entry point loader.
    #[inline]
    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    /// Returns whether validation layers are enabled.
    #[inline]
    pub fn has_validation(&self) -> bool {
        self.debug_messenger.is_some()
    }

    /// Sets up the debug messenger for validation layer callbacks.
    fn setup_debug_messenger(
        debug_utils: &ash::ext::debug_utils::Instance,
    ) -> Result<vk::DebugUtilsMessengerEXT, RhiError> {
        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(debug_callback));

        let messenger = unsafe {
            debug_utils
                .create_debug_utils_messenger(&create_info, None)
                .map_err(RhiError::from)?
        };

        Ok(messenger)
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        unsafe {
            // Destroy debug messenger before instance
            if let (Some(debug_utils), Some(messenger)) = (&self.debug_utils, self.debug_messenger)
            {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
        info!("Vulkan instance destroyed");
    }
}

/// Instance extensions required to create surfaces for `display_handle`.
///
/// Asking ash-window keeps the list down to the surface extension plus the
/// one matching the display server actually in use, so the instance never
/// requests an extension the driver does not expose.
fn required_extensions(display_handle: RawDisplayHandle) -> Result<Vec<*const c_char>, RhiError> {
    let extensions = ash_window::enumerate_required_extensions(display_handle)?;
    Ok(extensions.to_vec())
}

/// Checks whether the Khronos validation layer appears in an enumerated
/// layer list.
fn validation_layer_present(layers: &[vk::LayerProperties]) -> bool {
    layers.iter().any(|layer| {
        // SAFETY: Vulkan guarantees layer_name is a null-terminated string.
        let name = unsafe { CStr::from_ptr(layer.layer_name.as_ptr()) };
        name == VALIDATION_LAYER_NAME
    })
}

/// Debug callback function for validation layer messages.
///
/// Called by the Vulkan validation layer when it detects issues with API
/// usage. Messages are forwarded to the tracing crate.
///
/// # Safety
///
/// This function is called from the Vulkan driver and must follow the
/// Vulkan specification for debug callbacks.
unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() {
        return vk::FALSE;
    }

    let callback_data = unsafe { &*p_callback_data };
    let message = if callback_data.p_message.is_null() {
        std::borrow::Cow::Borrowed("(no message)")
    } else {
        unsafe { CStr::from_ptr(callback_data.p_message).to_string_lossy() }
    };

    let type_str = match message_type {
        vk::DebugUtilsMessageTypeFlagsEXT::GENERAL => "General",
        vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION => "Validation",
        vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE => "Performance",
        _ => "Unknown",
    };

    match message_severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => {
            error!("[Vulkan {}] {}", type_str, message);
        }
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => {
            warn!("[Vulkan {}] {}", type_str, message);
        }
        _ => {
            info!("[Vulkan {}] {}", type_str, message);
        }
    }

    // Returning VK_FALSE indicates the call should not be aborted
    vk::FALSE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer_properties(name: &CStr) -> vk::LayerProperties {
        let mut props = vk::LayerProperties::default();
        for (dst, src) in props
            .layer_name
            .iter_mut()
            .zip(name.to_bytes_with_nul().iter())
        {
            *dst = *src as std::ffi::c_char;
        }
        props
    }

    #[test]
    fn test_validation_layer_detection() {
        let layers = [
            layer_properties(c"VK_LAYER_MESA_overlay"),
            layer_properties(c"VK_LAYER_KHRONOS_validation"),
        ];
        assert!(validation_layer_present(&layers));
    }

    #[test]
    fn test_validation_layer_absent() {
        let layers = [layer_properties(c"VK_LAYER_MESA_overlay")];
        assert!(!validation_layer_present(&layers));
        assert!(!validation_layer_present(&[]));
    }

    fn extension_names(display_handle: RawDisplayHandle) -> Vec<&'static CStr> {
        let extensions =
            required_extensions(display_handle).expect("display server should be supported");
        // SAFETY: extension names are static null-terminated strings.
        extensions
            .iter()
            .map(|&ext| unsafe { CStr::from_ptr(ext) })
            .collect()
    }

    #[test]
    fn test_required_extensions_for_xlib() {
        let display =
            RawDisplayHandle::Xlib(raw_window_handle::XlibDisplayHandle::new(None, 0));
        let names = extension_names(display);
        assert!(names.contains(&ash::khr::surface::NAME));
        assert!(names.contains(&ash::khr::xlib_surface::NAME));
        // Only the display server in use gets its extension requested.
        assert!(!names.contains(&ash::khr::wayland_surface::NAME));
    }

    #[test]
    fn test_required_extensions_for_wayland() {
        let display = RawDisplayHandle::Wayland(raw_window_handle::WaylandDisplayHandle::new(
            std::ptr::NonNull::dangling(),
        ));
        let names = extension_names(display);
        assert!(names.contains(&ash::khr::surface::NAME));
        assert!(names.contains(&ash::khr::wayland_surface::NAME));
        assert!(!names.contains(&ash::khr::xlib_surface::NAME));
    }
}

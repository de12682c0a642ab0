//! Vulkan instance creation
//!
//! Loads the Vulkan library, creates the instance with the extensions the
//! window system asks for, and optionally hooks the Khronos validation layer
//! up to the `log` facade.

use super::{VulkanError, VulkanResult};
use ash::extensions::ext::DebugUtils;
use ash::{vk, Entry, Instance};
use std::ffi::{c_char, CStr, CString};

const VALIDATION_LAYER: &str = "VK_LAYER_KHRONOS_validation";

/// Vulkan instance wrapper with RAII cleanup
pub struct VulkanInstance {
    /// Vulkan entry point
    pub entry: Entry,
    /// Vulkan instance handle
    pub instance: Instance,
    debug: Option<(DebugUtils, vk::DebugUtilsMessengerEXT)>,
}

impl VulkanInstance {
    /// Create a new Vulkan instance
    ///
    /// Validation is only switched on when requested and the layer is
    /// actually installed; otherwise a warning is logged and creation
    /// continues without it.
    pub fn new(
        required_extensions: &[String],
        app_name: &str,
        enable_validation: bool,
    ) -> VulkanResult<Self> {
        let entry = unsafe { Entry::load() }.map_err(|e| {
            VulkanError::Initialization(format!("Failed to load Vulkan: {e}"))
        })?;

        let app_name_cstr = c_string(app_name)?;
        let engine_name_cstr = c_string("vulkan_learn")?;
        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app_name_cstr)
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(&engine_name_cstr)
            .engine_version(vk::make_api_version(0, 1, 0, 0))
            .api_version(vk::API_VERSION_1_0);

        let validation = enable_validation && Self::validation_available(&entry);
        if enable_validation && !validation {
            log::warn!("{} requested but not installed; continuing without it", VALIDATION_LAYER);
        }

        let cstr_extensions = required_extensions
            .iter()
            .map(|ext| c_string(ext))
            .collect::<VulkanResult<Vec<_>>>()?;
        let mut extensions: Vec<*const c_char> = cstr_extensions.iter().map(|ext| ext.as_ptr()).collect();
        if validation {
            extensions.push(DebugUtils::name().as_ptr());
        }

        let layer_names = if validation {
            vec![c_string(VALIDATION_LAYER)?]
        } else {
            Vec::new()
        };
        let layer_names_ptrs: Vec<*const c_char> = layer_names.iter().map(|name| name.as_ptr()).collect();

        let create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_extension_names(&extensions)
            .enabled_layer_names(&layer_names_ptrs);

        let instance = unsafe {
            entry.create_instance(&create_info, None).map_err(|e| {
                VulkanError::Initialization(format!("Instance creation failed: {e:?}"))
            })?
        };
        log::info!(
            "Created Vulkan instance for '{}' ({} extensions, validation {})",
            app_name,
            extensions.len(),
            if validation { "on" } else { "off" }
        );

        let debug = if validation {
            let debug_utils = DebugUtils::new(&entry, &instance);
            match Self::setup_debug_messenger(&debug_utils) {
                Ok(messenger) => Some((debug_utils, messenger)),
                Err(e) => {
                    unsafe { instance.destroy_instance(None) };
                    return Err(e);
                }
            }
        } else {
            None
        };

        Ok(Self {
            entry,
            instance,
            debug,
        })
    }

    fn validation_available(entry: &Entry) -> bool {
        unsafe { entry.enumerate_instance_layer_properties() }
            .map(|layers| {
                layers.iter().any(|layer| {
                    let name = unsafe { CStr::from_ptr(layer.layer_name.as_ptr()) };
                    name.to_bytes() == VALIDATION_LAYER.as_bytes()
                })
            })
            .unwrap_or(false)
    }

    fn setup_debug_messenger(debug_utils: &DebugUtils) -> VulkanResult<vk::DebugUtilsMessengerEXT> {
        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::builder()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                    | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(debug_callback));

        unsafe {
            debug_utils
                .create_debug_utils_messenger(&create_info, None)
                .map_err(|e| {
                    VulkanError::Initialization(format!("Debug messenger creation failed: {e:?}"))
                })
        }
    }

    /// Whether the validation layer is active
    pub fn validation_enabled(&self) -> bool {
        self.debug.is_some()
    }
}

impl Drop for VulkanInstance {
    fn drop(&mut self) {
        unsafe {
            if let Some((debug_utils, messenger)) = self.debug.take() {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }

            self.instance.destroy_instance(None);
        }
        log::debug!("Destroyed Vulkan instance");
    }
}

fn c_string(value: &str) -> VulkanResult<CString> {
    CString::new(value)
        .map_err(|_| VulkanError::Initialization(format!("String contains a NUL byte: {value:?}")))
}

/// Debug callback for validation layers
unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    let callback_data = *callback_data;
    let message = CStr::from_ptr(callback_data.p_message).to_string_lossy();

    if message_severity >= vk::DebugUtilsMessageSeverityFlagsEXT::ERROR {
        log::error!("[Vulkan] {:?} - {}", message_type, message);
    } else if message_severity >= vk::DebugUtilsMessageSeverityFlagsEXT::WARNING {
        log::warn!("[Vulkan] {:?} - {}", message_type, message);
    } else {
        log::debug!("[Vulkan] {:?} - {}", message_type, message);
    }

    vk::FALSE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_c_string_rejects_interior_nul() {
        assert!(c_string("VK_KHR_surface").is_ok());
        assert!(matches!(c_string("bad\0name"), Err(VulkanError::Initialization(_))));
    }
}

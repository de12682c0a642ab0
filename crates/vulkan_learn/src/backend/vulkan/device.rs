//! Physical device selection and logical device creation

use super::{VulkanError, VulkanResult};
use ash::extensions::khr::{Surface, Swapchain as SwapchainLoader};
use ash::{vk, Device, Instance};
use std::ffi::CStr;

/// Pick a physical device by type
///
/// The first discrete GPU wins; otherwise the first enumerated device.
/// Returns `None` only for an empty list.
pub fn select_physical_device(device_types: &[vk::PhysicalDeviceType]) -> Option<usize> {
    if device_types.is_empty() {
        return None;
    }
    device_types
        .iter()
        .position(|&ty| ty == vk::PhysicalDeviceType::DISCRETE_GPU)
        .or(Some(0))
}

/// Find the first queue family with graphics support that can also present
///
/// `supports_present` is queried per candidate family index and may fail.
pub fn find_graphics_present_family<F>(
    families: &[vk::QueueFamilyProperties],
    mut supports_present: F,
) -> VulkanResult<Option<u32>>
where
    F: FnMut(u32) -> VulkanResult<bool>,
{
    for (index, family) in families.iter().enumerate() {
        let index = index as u32;
        if family.queue_flags.contains(vk::QueueFlags::GRAPHICS) && supports_present(index)? {
            return Ok(Some(index));
        }
    }
    Ok(None)
}

/// Error for a failed presentation-support query during device selection
pub fn surface_support_failed(result: vk::Result) -> VulkanError {
    VulkanError::Initialization(format!("Surface support query failed: {result:?}"))
}

/// Physical device selection and capabilities
pub struct PhysicalDeviceInfo {
    /// Vulkan physical device handle
    pub device: vk::PhysicalDevice,
    /// Device properties and limits
    pub properties: vk::PhysicalDeviceProperties,
    /// Supported device features
    pub features: vk::PhysicalDeviceFeatures,
    /// Queue family used for both graphics and presentation
    pub queue_family: u32,
}

impl PhysicalDeviceInfo {
    /// Select a physical device and a graphics+present queue family on it
    pub fn select(
        instance: &Instance,
        surface: vk::SurfaceKHR,
        surface_loader: &Surface,
    ) -> VulkanResult<Self> {
        let devices = unsafe {
            instance.enumerate_physical_devices().map_err(|e| {
                VulkanError::Initialization(format!("Failed to enumerate GPUs: {e:?}"))
            })?
        };

        let device_types: Vec<vk::PhysicalDeviceType> = devices
            .iter()
            .map(|&device| unsafe { instance.get_physical_device_properties(device).device_type })
            .collect();

        let index = select_physical_device(&device_types)
            .ok_or_else(|| VulkanError::Initialization("No Vulkan capable GPU found".to_string()))?;
        let device = devices[index];

        let properties = unsafe { instance.get_physical_device_properties(device) };
        let features = unsafe { instance.get_physical_device_features(device) };
        let queue_families = unsafe { instance.get_physical_device_queue_family_properties(device) };

        let queue_family = find_graphics_present_family(&queue_families, |index| unsafe {
            surface_loader
                .get_physical_device_surface_support(device, index, surface)
                .map_err(surface_support_failed)
        })?
        .ok_or_else(|| {
            VulkanError::Initialization(
                "No queue family supports both graphics and presentation".to_string(),
            )
        })?;

        let info = Self {
            device,
            properties,
            features,
            queue_family,
        };
        log::info!(
            "Selected GPU: {} ({:?}), queue family {}",
            info.name(),
            info.properties.device_type,
            queue_family
        );
        Ok(info)
    }

    /// Device name reported by the driver
    pub fn name(&self) -> String {
        unsafe { CStr::from_ptr(self.properties.device_name.as_ptr()) }
            .to_string_lossy()
            .into_owned()
    }
}

/// Logical device wrapper with RAII cleanup
pub struct LogicalDevice {
    /// Vulkan logical device handle
    pub device: Device,
    /// Combined graphics and present queue
    pub queue: vk::Queue,
    /// Index of the queue family
    pub queue_family: u32,
    /// Swapchain extension loader
    pub swapchain_loader: SwapchainLoader,
}

impl LogicalDevice {
    /// Create a logical device with one queue and the swapchain extension
    pub fn new(instance: &Instance, physical_device: &PhysicalDeviceInfo) -> VulkanResult<Self> {
        let priorities = [1.0];
        let queue_infos = [vk::DeviceQueueCreateInfo::builder()
            .queue_family_index(physical_device.queue_family)
            .queue_priorities(&priorities)
            .build()];

        let required_extensions = [SwapchainLoader::name().as_ptr()];

        // Anisotropic sampling is used by the texture lesson when available
        let device_features = vk::PhysicalDeviceFeatures::builder()
            .sampler_anisotropy(physical_device.features.sampler_anisotropy == vk::TRUE)
            .build();

        let create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_infos)
            .enabled_extension_names(&required_extensions)
            .enabled_features(&device_features);

        let device = unsafe {
            instance
                .create_device(physical_device.device, &create_info, None)
                .map_err(|e| {
                    VulkanError::Initialization(format!("Logical device creation failed: {e:?}"))
                })?
        };

        let queue = unsafe { device.get_device_queue(physical_device.queue_family, 0) };
        let swapchain_loader = SwapchainLoader::new(instance, &device);

        Ok(Self {
            device,
            queue,
            queue_family: physical_device.queue_family,
            swapchain_loader,
        })
    }
}

impl Drop for LogicalDevice {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            self.device.destroy_device(None);
        }
        log::debug!("Destroyed logical device");
    }
}

/// Window surface with RAII cleanup
pub struct SurfaceHandle {
    /// Surface extension loader
    pub loader: Surface,
    /// Surface handle
    pub surface: vk::SurfaceKHR,
}

impl Drop for SurfaceHandle {
    fn drop(&mut self) {
        unsafe {
            self.loader.destroy_surface(self.surface, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family(flags: vk::QueueFlags) -> vk::QueueFamilyProperties {
        vk::QueueFamilyProperties {
            queue_flags: flags,
            queue_count: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_discrete_gpu_is_preferred() {
        let types = [
            vk::PhysicalDeviceType::INTEGRATED_GPU,
            vk::PhysicalDeviceType::CPU,
            vk::PhysicalDeviceType::DISCRETE_GPU,
        ];
        assert_eq!(select_physical_device(&types), Some(2));
    }

    #[test]
    fn test_first_device_without_discrete() {
        let types = [
            vk::PhysicalDeviceType::INTEGRATED_GPU,
            vk::PhysicalDeviceType::VIRTUAL_GPU,
        ];
        assert_eq!(select_physical_device(&types), Some(0));
    }

    #[test]
    fn test_no_devices() {
        assert_eq!(select_physical_device(&[]), None);
    }

    #[test]
    fn test_queue_family_needs_graphics_and_present() {
        let families = [
            family(vk::QueueFlags::COMPUTE),
            family(vk::QueueFlags::GRAPHICS),
            family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::TRANSFER),
        ];

        let found = find_graphics_present_family(&families, |index| Ok(index == 2)).unwrap();
        assert_eq!(found, Some(2));
    }

    #[test]
    fn test_queue_family_none_when_nothing_presents() {
        let families = [family(vk::QueueFlags::GRAPHICS)];
        let found = find_graphics_present_family(&families, |_| Ok(false)).unwrap();
        assert_eq!(found, None);
    }

    #[test]
    fn test_present_query_skips_non_graphics_families() {
        let families = [family(vk::QueueFlags::TRANSFER), family(vk::QueueFlags::GRAPHICS)];
        let mut queried = Vec::new();
        let found = find_graphics_present_family(&families, |index| {
            queried.push(index);
            Ok(true)
        })
        .unwrap();
        assert_eq!(found, Some(1));
        assert_eq!(queried, vec![1]);
    }

    #[test]
    fn test_present_query_error_reports_initialization_failure() {
        let families = [family(vk::QueueFlags::GRAPHICS)];
        let result = find_graphics_present_family(&families, |_| {
            Err(surface_support_failed(vk::Result::ERROR_SURFACE_LOST_KHR))
        });
        match result {
            Err(VulkanError::Initialization(message)) => {
                assert!(message.contains("ERROR_SURFACE_LOST_KHR"));
            }
            other => panic!("expected an initialization error, got {other:?}"),
        }
    }
}

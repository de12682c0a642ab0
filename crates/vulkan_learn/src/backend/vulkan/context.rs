//! Device context
//!
//! [`VulkanContext`] owns the instance, the logical device, one combined
//! graphics/present queue, the swapchain and two fences. Every operation
//! blocks: `submit` returns once the GPU has finished the command buffer and
//! `acquire_next_image` returns once the image is actually available.
//!
//! Objects created through the `create_*` forwarders belong to the caller
//! and must be destroyed before the context is dropped.

use super::device::{LogicalDevice, PhysicalDeviceInfo, SurfaceHandle};
use super::resource::{BufferResource, GpuResource, ImageResource, MemoryClass};
use super::swapchain::{Swapchain, SWAPCHAIN_FORMAT};
use super::sync::Fence;
use super::window::SurfaceProvider;
use super::{VulkanError, VulkanInstance, VulkanResult};
use crate::core::config::ContextConfig;
use ash::extensions::khr::Surface;
use ash::vk;
use std::io::Cursor;
use std::rc::Rc;

const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Decode SPIR-V bytes into words, rejecting anything that is not a module
pub fn spirv_words(code: &[u8]) -> VulkanResult<Vec<u32>> {
    let invalid = VulkanError::ResourceCreation {
        operation: "shader module",
        result: vk::Result::ERROR_INVALID_SHADER_NV,
    };

    let words = ash::util::read_spv(&mut Cursor::new(code)).map_err(|e| {
        log::error!("[SHADER] Invalid SPIR-V ({} bytes): {}", code.len(), e);
        invalid.clone()
    })?;

    if words.first() != Some(&SPIRV_MAGIC) {
        log::error!("[SHADER] Missing SPIR-V magic number ({} bytes)", code.len());
        return Err(invalid);
    }
    Ok(words)
}

/// Everything that exists only after [`VulkanContext::initialize`]
///
/// Field order is destruction order.
struct DeviceState {
    acquire_fence: Fence,
    submit_fence: Fence,
    swapchain: Swapchain,
    allocator: Rc<vk_mem::Allocator>,
    device: LogicalDevice,
    physical_device: PhysicalDeviceInfo,
    surface: SurfaceHandle,
}

impl Drop for DeviceState {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device.device_wait_idle();
        }

        let outstanding = Rc::strong_count(&self.allocator) - 1;
        if outstanding > 0 {
            log::warn!(
                "{} GPU resource(s) still alive at context teardown; release them before the context",
                outstanding
            );
        }
    }
}

/// Main Vulkan context that owns all core Vulkan resources
pub struct VulkanContext {
    device: Option<DeviceState>,
    instance: VulkanInstance,
}

impl VulkanContext {
    /// Load Vulkan and create the instance for `window`
    pub fn new(window: &impl SurfaceProvider, config: &ContextConfig) -> VulkanResult<Self> {
        let extensions = window.required_instance_extensions().map_err(|e| {
            VulkanError::Initialization(format!("Failed to get required extensions: {e}"))
        })?;

        let instance = VulkanInstance::new(
            &extensions,
            &config.application_name,
            config.validation_enabled(),
        )?;

        Ok(Self {
            device: None,
            instance,
        })
    }

    /// Create the surface, device, allocator, swapchain and fences
    ///
    /// A second call is a no-op. On failure, everything created by this
    /// call is released again before the error is returned.
    pub fn initialize(&mut self, window: &mut impl SurfaceProvider) -> VulkanResult<()> {
        if self.device.is_some() {
            log::debug!("Vulkan context already initialized");
            return Ok(());
        }

        let instance = &self.instance.instance;
        let surface_loader = Surface::new(&self.instance.entry, instance);
        let surface = window
            .create_vulkan_surface(instance.handle())
            .map_err(|e| VulkanError::Initialization(format!("Surface creation: {e}")))?;
        let surface = SurfaceHandle {
            loader: surface_loader,
            surface,
        };

        let physical_device = PhysicalDeviceInfo::select(instance, surface.surface, &surface.loader)
            .map_err(VulkanError::during_initialization("Device selection"))?;
        let device = LogicalDevice::new(instance, &physical_device)
            .map_err(VulkanError::during_initialization("Logical device creation"))?;

        let allocator = vk_mem::Allocator::new(vk_mem::AllocatorCreateInfo::new(
            instance,
            &device.device,
            physical_device.device,
        ))
        .map_err(|e| VulkanError::Initialization(format!("Memory allocator creation failed: {e:?}")))?;
        let allocator = Rc::new(allocator);

        let (width, height) = window.framebuffer_size();
        let swapchain = Swapchain::new(
            device.device.clone(),
            device.swapchain_loader.clone(),
            physical_device.device,
            surface.surface,
            &surface.loader,
            vk::Extent2D { width, height },
        )
        .map_err(VulkanError::during_initialization("Swapchain creation"))?;
        let acquire_fence = Fence::new(device.device.clone())
            .map_err(VulkanError::during_initialization("Acquire fence creation"))?;
        swapchain
            .transition_to_present(device.queue, device.queue_family)
            .map_err(VulkanError::during_initialization("Swapchain image transition"))?;

        let submit_fence = Fence::new(device.device.clone())
            .map_err(VulkanError::during_initialization("Submit fence creation"))?;

        log::info!(
            "Vulkan context ready on {} with {} swapbuffers",
            physical_device.name(),
            swapchain.image_count()
        );

        self.device = Some(DeviceState {
            acquire_fence,
            submit_fence,
            swapchain,
            allocator,
            device,
            physical_device,
            surface,
        });
        Ok(())
    }

    fn state(&self) -> VulkanResult<&DeviceState> {
        self.device.as_ref().ok_or_else(|| {
            VulkanError::InvalidState("Vulkan context is not initialized".to_string())
        })
    }

    /// Whether [`Self::initialize`] has completed
    pub fn is_initialized(&self) -> bool {
        self.device.is_some()
    }

    /// Acquire the next swapchain image and wait until it is available
    pub fn acquire_next_image(&self) -> VulkanResult<u32> {
        let state = self.state()?;

        let (index, suboptimal) = unsafe {
            state
                .swapchain
                .loader()
                .acquire_next_image(
                    state.swapchain.handle(),
                    u64::MAX,
                    vk::Semaphore::null(),
                    state.acquire_fence.handle(),
                )
                .map_err(VulkanError::Presentation)?
        };
        if suboptimal {
            log::trace!("Swapchain image {} acquired as suboptimal", index);
        }

        state.acquire_fence.wait_and_reset()?;
        Ok(index)
    }

    /// Present swapbuffer `index`
    pub fn present(&self, index: u32) -> VulkanResult<()> {
        let state = self.state()?;
        if index >= state.swapchain.image_count() {
            return Err(VulkanError::InvalidState(format!(
                "Swapbuffer index {} out of range (count {})",
                index,
                state.swapchain.image_count()
            )));
        }

        let swapchains = [state.swapchain.handle()];
        let image_indices = [index];
        let present_info = vk::PresentInfoKHR::builder()
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        unsafe {
            state
                .swapchain
                .loader()
                .queue_present(state.device.queue, &present_info)
                .map_err(VulkanError::Presentation)?;
        }
        Ok(())
    }

    /// Submit one command buffer and block until the GPU has executed it
    pub fn submit(&self, command_buffer: vk::CommandBuffer) -> VulkanResult<()> {
        let state = self.state()?;

        let command_buffers = [command_buffer];
        let submit_info = vk::SubmitInfo::builder().command_buffers(&command_buffers);

        unsafe {
            state
                .device
                .device
                .queue_submit(
                    state.device.queue,
                    &[submit_info.build()],
                    state.submit_fence.handle(),
                )
                .map_err(VulkanError::Submission)?;
        }

        state.submit_fence.wait_and_reset()
    }

    /// Record a command buffer with `record`, submit it and wait
    ///
    /// The command buffer is allocated from `pool` and freed again whether
    /// or not the submission succeeds.
    pub fn execute_one_shot<F>(&self, pool: vk::CommandPool, record: F) -> VulkanResult<()>
    where
        F: FnOnce(&ash::Device, vk::CommandBuffer),
    {
        let device = self.device()?;
        let command_buffer = self.create_command_buffer(pool)?;

        let result = (|| {
            let begin_info = vk::CommandBufferBeginInfo::builder()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            unsafe {
                device
                    .begin_command_buffer(command_buffer, &begin_info)
                    .map_err(VulkanError::Api)?;
            }
            record(device, command_buffer);
            unsafe {
                device
                    .end_command_buffer(command_buffer)
                    .map_err(VulkanError::Api)?;
            }
            self.submit(command_buffer)
        })();

        unsafe {
            device.free_command_buffers(pool, &[command_buffer]);
        }
        result
    }

    /// Block until the device is idle
    pub fn wait_idle(&self) -> VulkanResult<()> {
        let state = self.state()?;
        unsafe { state.device.device.device_wait_idle().map_err(VulkanError::Api) }
    }

    /// Create a buffer backed by memory of the given class
    pub fn create_buffer(
        &self,
        info: &vk::BufferCreateInfo,
        memory_class: MemoryClass,
    ) -> VulkanResult<BufferResource> {
        GpuResource::create_buffer(&self.state()?.allocator, info, memory_class)
    }

    /// Create an image backed by memory of the given class
    pub fn create_image(
        &self,
        info: &vk::ImageCreateInfo,
        memory_class: MemoryClass,
    ) -> VulkanResult<ImageResource> {
        GpuResource::create_image(&self.state()?.allocator, info, memory_class)
    }

    /// Create a shader module from SPIR-V bytes
    pub fn create_shader_module(&self, code: &[u8]) -> VulkanResult<vk::ShaderModule> {
        let device = self.device()?;
        let words = spirv_words(code)?;
        log::debug!("[SHADER] Creating shader module from {} bytes", code.len());

        let create_info = vk::ShaderModuleCreateInfo::builder().code(&words);
        unsafe {
            device
                .create_shader_module(&create_info, None)
                .map_err(VulkanError::creation("shader module"))
        }
    }

    /// Create a render pass
    pub fn create_render_pass(&self, info: &vk::RenderPassCreateInfo) -> VulkanResult<vk::RenderPass> {
        unsafe {
            self.device()?
                .create_render_pass(info, None)
                .map_err(VulkanError::creation("render pass"))
        }
    }

    /// Create a framebuffer
    pub fn create_framebuffer(&self, info: &vk::FramebufferCreateInfo) -> VulkanResult<vk::Framebuffer> {
        unsafe {
            self.device()?
                .create_framebuffer(info, None)
                .map_err(VulkanError::creation("framebuffer"))
        }
    }

    /// Create a pipeline layout
    pub fn create_pipeline_layout(
        &self,
        info: &vk::PipelineLayoutCreateInfo,
    ) -> VulkanResult<vk::PipelineLayout> {
        unsafe {
            self.device()?
                .create_pipeline_layout(info, None)
                .map_err(VulkanError::creation("pipeline layout"))
        }
    }

    /// Create one graphics pipeline without a pipeline cache
    pub fn create_graphics_pipeline(
        &self,
        info: &vk::GraphicsPipelineCreateInfo,
    ) -> VulkanResult<vk::Pipeline> {
        let pipelines = unsafe {
            self.device()?
                .create_graphics_pipelines(vk::PipelineCache::null(), std::slice::from_ref(info), None)
                .map_err(|(_, result)| VulkanError::ResourceCreation {
                    operation: "graphics pipeline",
                    result,
                })?
        };
        pipelines.into_iter().next().ok_or(VulkanError::ResourceCreation {
            operation: "graphics pipeline",
            result: vk::Result::ERROR_UNKNOWN,
        })
    }

    /// Create a descriptor pool
    pub fn create_descriptor_pool(
        &self,
        info: &vk::DescriptorPoolCreateInfo,
    ) -> VulkanResult<vk::DescriptorPool> {
        unsafe {
            self.device()?
                .create_descriptor_pool(info, None)
                .map_err(VulkanError::creation("descriptor pool"))
        }
    }

    /// Create a descriptor set layout
    pub fn create_descriptor_set_layout(
        &self,
        info: &vk::DescriptorSetLayoutCreateInfo,
    ) -> VulkanResult<vk::DescriptorSetLayout> {
        unsafe {
            self.device()?
                .create_descriptor_set_layout(info, None)
                .map_err(VulkanError::creation("descriptor set layout"))
        }
    }

    /// Create a sampler
    pub fn create_sampler(&self, info: &vk::SamplerCreateInfo) -> VulkanResult<vk::Sampler> {
        unsafe {
            self.device()?
                .create_sampler(info, None)
                .map_err(VulkanError::creation("sampler"))
        }
    }

    /// Allocate one descriptor set with `layout` from `pool`
    pub fn allocate_descriptor_set(
        &self,
        pool: vk::DescriptorPool,
        layout: vk::DescriptorSetLayout,
    ) -> VulkanResult<vk::DescriptorSet> {
        let layouts = [layout];
        let alloc_info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(pool)
            .set_layouts(&layouts);

        let sets = unsafe {
            self.device()?
                .allocate_descriptor_sets(&alloc_info)
                .map_err(VulkanError::creation("descriptor set"))?
        };
        sets.into_iter().next().ok_or(VulkanError::ResourceCreation {
            operation: "descriptor set",
            result: vk::Result::ERROR_UNKNOWN,
        })
    }

    /// Create a command pool on the context's queue family
    pub fn create_command_pool(
        &self,
        flags: vk::CommandPoolCreateFlags,
    ) -> VulkanResult<vk::CommandPool> {
        let state = self.state()?;
        let create_info = vk::CommandPoolCreateInfo::builder()
            .flags(flags)
            .queue_family_index(state.device.queue_family);

        unsafe {
            state
                .device
                .device
                .create_command_pool(&create_info, None)
                .map_err(VulkanError::creation("command pool"))
        }
    }

    /// Allocate one primary command buffer from `pool`
    pub fn create_command_buffer(&self, pool: vk::CommandPool) -> VulkanResult<vk::CommandBuffer> {
        let alloc_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        let buffers = unsafe {
            self.device()?
                .allocate_command_buffers(&alloc_info)
                .map_err(VulkanError::creation("command buffer"))?
        };
        buffers.into_iter().next().ok_or(VulkanError::ResourceCreation {
            operation: "command buffer",
            result: vk::Result::ERROR_UNKNOWN,
        })
    }

    /// Create an image view
    pub fn create_image_view(&self, info: &vk::ImageViewCreateInfo) -> VulkanResult<vk::ImageView> {
        unsafe {
            self.device()?
                .create_image_view(info, None)
                .map_err(VulkanError::creation("image view"))
        }
    }

    /// Logical device
    pub fn device(&self) -> VulkanResult<&ash::Device> {
        Ok(&self.state()?.device.device)
    }

    /// Combined graphics and present queue
    pub fn queue(&self) -> VulkanResult<vk::Queue> {
        Ok(self.state()?.device.queue)
    }

    /// Queue family index of [`Self::queue`]
    pub fn queue_family_index(&self) -> VulkanResult<u32> {
        Ok(self.state()?.device.queue_family)
    }

    /// Number of swapchain images
    pub fn swapbuffer_count(&self) -> VulkanResult<u32> {
        Ok(self.state()?.swapchain.image_count())
    }

    /// Swapchain image `index`
    pub fn swapbuffer(&self, index: u32) -> VulkanResult<vk::Image> {
        let state = self.state()?;
        state
            .swapchain
            .images()
            .get(index as usize)
            .copied()
            .ok_or_else(|| VulkanError::InvalidState(format!("Swapbuffer index {index} out of range")))
    }

    /// View of swapchain image `index`
    pub fn swapbuffer_view(&self, index: u32) -> VulkanResult<vk::ImageView> {
        let state = self.state()?;
        state
            .swapchain
            .image_views()
            .get(index as usize)
            .copied()
            .ok_or_else(|| VulkanError::InvalidState(format!("Swapbuffer index {index} out of range")))
    }

    /// Color format of the swapchain images
    pub fn swapchain_format(&self) -> VulkanResult<vk::Format> {
        self.state()?;
        Ok(SWAPCHAIN_FORMAT.format)
    }

    /// Extent of the swapchain images
    pub fn swapchain_extent(&self) -> VulkanResult<vk::Extent2D> {
        Ok(self.state()?.swapchain.extent())
    }

    /// Name of the selected GPU
    pub fn device_name(&self) -> VulkanResult<String> {
        Ok(self.state()?.physical_device.name())
    }

    /// Device limits and properties of the selected GPU
    pub fn physical_device_properties(&self) -> VulkanResult<&vk::PhysicalDeviceProperties> {
        Ok(&self.state()?.physical_device.properties)
    }

    /// Whether the GPU supports anisotropic sampling (enabled when present)
    pub fn sampler_anisotropy_supported(&self) -> VulkanResult<bool> {
        Ok(self.state()?.physical_device.features.sampler_anisotropy == vk::TRUE)
    }

    /// Whether the validation layer is active
    pub fn validation_enabled(&self) -> bool {
        self.instance.validation_enabled()
    }
}

impl Drop for VulkanContext {
    fn drop(&mut self) {
        // Device-level objects must go before the instance
        self.device.take();
        log::debug!("Vulkan context destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module_bytes(words: &[u32]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    #[test]
    fn test_spirv_words_accepts_module_header() {
        let bytes = module_bytes(&[SPIRV_MAGIC, 0x0001_0000, 0, 1, 0]);
        let words = spirv_words(&bytes).unwrap();
        assert_eq!(words.len(), 5);
        assert_eq!(words[0], SPIRV_MAGIC);
    }

    #[test]
    fn test_spirv_words_rejects_partial_word() {
        let mut bytes = module_bytes(&[SPIRV_MAGIC, 0x0001_0000]);
        bytes.push(0);
        assert!(matches!(
            spirv_words(&bytes),
            Err(VulkanError::ResourceCreation { operation: "shader module", .. })
        ));
    }

    #[test]
    fn test_spirv_words_rejects_missing_magic() {
        let bytes = module_bytes(&[0xdead_beef, 0]);
        assert!(spirv_words(&bytes).is_err());
        assert!(spirv_words(&[]).is_err());
    }
}

//! Swapchain creation
//!
//! The swapchain is built once and never recreated. Its color format and
//! present mode are fixed: `B8G8R8A8_SRGB` with sRGB non-linear color space,
//! presented in FIFO order.

use super::{VulkanError, VulkanResult};
use ash::extensions::khr::{Surface, Swapchain as SwapchainLoader};
use ash::{vk, Device};

/// Color format of every swapchain image
pub const SWAPCHAIN_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
    format: vk::Format::B8G8R8A8_SRGB,
    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
};

/// Present mode used for every swapchain
pub const PRESENT_MODE: vk::PresentModeKHR = vk::PresentModeKHR::FIFO;

/// Minimum number of swapchain images
pub const MIN_SWAPCHAIN_IMAGES: u32 = 2;

/// Image count to request: at least two, at least the surface minimum,
/// and no more than the surface maximum (zero meaning unbounded)
pub fn choose_image_count(caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let wanted = MIN_SWAPCHAIN_IMAGES.max(caps.min_image_count);
    if caps.max_image_count > 0 {
        wanted.min(caps.max_image_count)
    } else {
        wanted
    }
}

/// Use the surface's current extent, or the window size clamped to the
/// surface limits when the surface leaves it to the swapchain
pub fn choose_extent(caps: &vk::SurfaceCapabilitiesKHR, window_extent: vk::Extent2D) -> vk::Extent2D {
    if caps.current_extent.width != u32::MAX {
        caps.current_extent
    } else {
        vk::Extent2D {
            width: window_extent.width.clamp(
                caps.min_image_extent.width,
                caps.max_image_extent.width,
            ),
            height: window_extent.height.clamp(
                caps.min_image_extent.height,
                caps.max_image_extent.height,
            ),
        }
    }
}

/// Swapchain with its images and one view per image
pub struct Swapchain {
    device: Device,
    swapchain_loader: SwapchainLoader,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    extent: vk::Extent2D,
}

impl Swapchain {
    /// Create the swapchain and its image views
    pub fn new(
        device: Device,
        swapchain_loader: SwapchainLoader,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        surface_loader: &Surface,
        window_extent: vk::Extent2D,
    ) -> VulkanResult<Self> {
        let surface_caps = unsafe {
            surface_loader
                .get_physical_device_surface_capabilities(physical_device, surface)
                .map_err(|e| {
                    VulkanError::Initialization(format!("Surface capability query failed: {e:?}"))
                })?
        };

        let image_count = choose_image_count(&surface_caps);
        let extent = choose_extent(&surface_caps, window_extent);

        let swapchain_create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(surface)
            .min_image_count(image_count)
            .image_format(SWAPCHAIN_FORMAT.format)
            .image_color_space(SWAPCHAIN_FORMAT.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(surface_caps.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(PRESENT_MODE)
            .clipped(true)
            .old_swapchain(vk::SwapchainKHR::null());

        let swapchain = unsafe {
            swapchain_loader
                .create_swapchain(&swapchain_create_info, None)
                .map_err(|e| {
                    VulkanError::Initialization(format!("Swapchain creation failed: {e:?}"))
                })?
        };

        // From here on the struct owns the swapchain; views are pushed as
        // they are created so an early return releases everything.
        let mut this = Self {
            device,
            swapchain_loader,
            swapchain,
            images: Vec::new(),
            image_views: Vec::new(),
            extent,
        };

        this.images = unsafe {
            this.swapchain_loader
                .get_swapchain_images(swapchain)
                .map_err(|e| {
                    VulkanError::Initialization(format!("Swapchain image query failed: {e:?}"))
                })?
        };

        if this.images.len() < MIN_SWAPCHAIN_IMAGES as usize {
            return Err(VulkanError::Initialization(format!(
                "Swapchain has {} images, need at least {}",
                this.images.len(),
                MIN_SWAPCHAIN_IMAGES
            )));
        }

        for i in 0..this.images.len() {
            let view = create_color_view(&this.device, this.images[i], SWAPCHAIN_FORMAT.format)
                .map_err(|e| {
                    VulkanError::Initialization(format!("Swapchain image view creation failed: {e:?}"))
                })?;
            this.image_views.push(view);
        }

        log::info!(
            "Created swapchain: {} images, {}x{}, {:?}",
            this.images.len(),
            extent.width,
            extent.height,
            SWAPCHAIN_FORMAT.format
        );

        Ok(this)
    }

    /// Move every image from `UNDEFINED` to `PRESENT_SRC_KHR`
    ///
    /// Uses a throwaway command pool, submits without a fence and waits for
    /// the whole device to go idle before destroying the pool.
    pub fn transition_to_present(&self, queue: vk::Queue, queue_family: u32) -> VulkanResult<()> {
        let pool_info = vk::CommandPoolCreateInfo::builder()
            .flags(vk::CommandPoolCreateFlags::TRANSIENT)
            .queue_family_index(queue_family);
        let pool = unsafe {
            self.device
                .create_command_pool(&pool_info, None)
                .map_err(VulkanError::creation("command pool"))?
        };

        let result = self.record_and_submit_transition(pool, queue);

        unsafe {
            self.device.destroy_command_pool(pool, None);
        }
        result
    }

    fn record_and_submit_transition(&self, pool: vk::CommandPool, queue: vk::Queue) -> VulkanResult<()> {
        let alloc_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        let barriers: Vec<vk::ImageMemoryBarrier> = self
            .images
            .iter()
            .map(|&image| {
                vk::ImageMemoryBarrier::builder()
                    .src_access_mask(vk::AccessFlags::empty())
                    .dst_access_mask(vk::AccessFlags::empty())
                    .old_layout(vk::ImageLayout::UNDEFINED)
                    .new_layout(vk::ImageLayout::PRESENT_SRC_KHR)
                    .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .image(image)
                    .subresource_range(color_subresource_range())
                    .build()
            })
            .collect();

        unsafe {
            let command_buffer = self
                .device
                .allocate_command_buffers(&alloc_info)
                .map_err(VulkanError::creation("command buffer"))?[0];

            let begin_info = vk::CommandBufferBeginInfo::builder()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            self.device
                .begin_command_buffer(command_buffer, &begin_info)
                .map_err(VulkanError::Api)?;
            self.device.cmd_pipeline_barrier(
                command_buffer,
                vk::PipelineStageFlags::TOP_OF_PIPE,
                vk::PipelineStageFlags::BOTTOM_OF_PIPE,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &barriers,
            );
            self.device
                .end_command_buffer(command_buffer)
                .map_err(VulkanError::Api)?;

            let command_buffers = [command_buffer];
            let submit_info = vk::SubmitInfo::builder().command_buffers(&command_buffers);
            self.device
                .queue_submit(queue, &[submit_info.build()], vk::Fence::null())
                .map_err(VulkanError::Submission)?;
            self.device.device_wait_idle().map_err(VulkanError::Api)?;
        }

        log::debug!("Transitioned {} swapchain images to PRESENT_SRC_KHR", self.images.len());
        Ok(())
    }

    /// Swapchain handle
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    /// Swapchain extension loader
    pub fn loader(&self) -> &SwapchainLoader {
        &self.swapchain_loader
    }

    /// Swapchain images in acquisition-index order
    pub fn images(&self) -> &[vk::Image] {
        &self.images
    }

    /// Image views; view `i` belongs to image `i`
    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }

    /// Image extent
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// Number of images
    pub fn image_count(&self) -> u32 {
        self.images.len() as u32
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            for &image_view in &self.image_views {
                self.device.destroy_image_view(image_view, None);
            }

            self.swapchain_loader.destroy_swapchain(self.swapchain, None);
        }
        log::debug!("Destroyed swapchain");
    }
}

/// Subresource range covering the single color mip and layer
pub fn color_subresource_range() -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1,
    }
}

fn create_color_view(device: &Device, image: vk::Image, format: vk::Format) -> Result<vk::ImageView, vk::Result> {
    let create_info = vk::ImageViewCreateInfo::builder()
        .image(image)
        .view_type(vk::ImageViewType::TYPE_2D)
        .format(format)
        .components(vk::ComponentMapping {
            r: vk::ComponentSwizzle::IDENTITY,
            g: vk::ComponentSwizzle::IDENTITY,
            b: vk::ComponentSwizzle::IDENTITY,
            a: vk::ComponentSwizzle::IDENTITY,
        })
        .subresource_range(color_subresource_range());

    unsafe { device.create_image_view(&create_info, None) }
}

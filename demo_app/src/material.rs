//! Sampled texture bound through a combined image sampler descriptor

use ash::vk;
use vulkan_learn::prelude::*;

/// Vulkan objects a [`Material`] owns besides its image
///
/// Handles start out null and are filled in as they are created, so a
/// partially built material can always be released.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MaterialHandles {
    /// 2D view of the texture
    pub view: vk::ImageView,
    /// Linear, repeating sampler
    pub sampler: vk::Sampler,
    /// One combined image sampler at binding 0
    pub set_layout: vk::DescriptorSetLayout,
    /// Pool the set is allocated from
    pub pool: vk::DescriptorPool,
    /// The texture's descriptor set
    pub set: vk::DescriptorSet,
}

impl MaterialHandles {
    /// Move the handles out, leaving every field null
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }
}

/// Texture image with the view, sampler and descriptor set that bind it
pub struct Material {
    texture: ImageResource,
    handles: MaterialHandles,
}

impl Material {
    /// Wrap an uploaded `R8G8B8A8_SRGB` image for sampling in fragment shaders
    ///
    /// Whatever was created before a failing step is destroyed again.
    pub fn new(ctx: &VulkanContext, texture: ImageResource) -> VulkanResult<Self> {
        let mut material = Self {
            texture,
            handles: MaterialHandles::default(),
        };
        if let Err(e) = material.create_objects(ctx) {
            material.destroy(ctx);
            return Err(e);
        }
        Ok(material)
    }

    fn create_objects(&mut self, ctx: &VulkanContext) -> VulkanResult<()> {
        self.handles.view = ctx.create_image_view(
            &vk::ImageViewCreateInfo::builder()
                .image(self.texture.image())
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(vk::Format::R8G8B8A8_SRGB)
                .subresource_range(vulkan_learn::backend::vulkan::color_subresource_range()),
        )?;

        let anisotropy = ctx.sampler_anisotropy_supported()?;
        let max_anisotropy = if anisotropy {
            ctx.physical_device_properties()?.limits.max_sampler_anisotropy
        } else {
            1.0
        };
        self.handles.sampler = ctx.create_sampler(
            &vk::SamplerCreateInfo::builder()
                .mag_filter(vk::Filter::LINEAR)
                .min_filter(vk::Filter::LINEAR)
                .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
                .address_mode_u(vk::SamplerAddressMode::REPEAT)
                .address_mode_v(vk::SamplerAddressMode::REPEAT)
                .address_mode_w(vk::SamplerAddressMode::REPEAT)
                .anisotropy_enable(anisotropy)
                .max_anisotropy(max_anisotropy)
                .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
                .compare_op(vk::CompareOp::ALWAYS),
        )?;

        let bindings = [vk::DescriptorSetLayoutBinding::builder()
            .binding(0)
            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .descriptor_count(1)
            .stage_flags(vk::ShaderStageFlags::FRAGMENT)
            .build()];
        self.handles.set_layout = ctx.create_descriptor_set_layout(
            &vk::DescriptorSetLayoutCreateInfo::builder().bindings(&bindings),
        )?;

        let pool_sizes = [vk::DescriptorPoolSize {
            ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            descriptor_count: 1,
        }];
        self.handles.pool = ctx.create_descriptor_pool(
            &vk::DescriptorPoolCreateInfo::builder()
                .max_sets(1)
                .pool_sizes(&pool_sizes),
        )?;
        self.handles.set = ctx.allocate_descriptor_set(self.handles.pool, self.handles.set_layout)?;

        let image_info = [vk::DescriptorImageInfo {
            sampler: self.handles.sampler,
            image_view: self.handles.view,
            image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        }];
        let writes = [vk::WriteDescriptorSet::builder()
            .dst_set(self.handles.set)
            .dst_binding(0)
            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .image_info(&image_info)
            .build()];
        unsafe { ctx.device()?.update_descriptor_sets(&writes, &[]) };

        log::debug!("Texture descriptor ready, anisotropy {}", max_anisotropy);
        Ok(())
    }

    /// Layout of the material's descriptor set
    pub fn set_layout(&self) -> vk::DescriptorSetLayout {
        self.handles.set_layout
    }

    /// Descriptor set binding the texture at binding 0
    pub fn descriptor_set(&self) -> vk::DescriptorSet {
        self.handles.set
    }

    /// Destroy the Vulkan objects; the image itself is released on drop
    ///
    /// Null handles are skipped and a second call does nothing.
    pub fn destroy(&mut self, ctx: &VulkanContext) {
        let Ok(device) = ctx.device() else { return };
        let handles = self.handles.take();
        // The set is freed with its pool.
        unsafe {
            if handles.pool != vk::DescriptorPool::null() {
                device.destroy_descriptor_pool(handles.pool, None);
            }
            if handles.set_layout != vk::DescriptorSetLayout::null() {
                device.destroy_descriptor_set_layout(handles.set_layout, None);
            }
            if handles.sampler != vk::Sampler::null() {
                device.destroy_sampler(handles.sampler, None);
            }
            if handles.view != vk::ImageView::null() {
                device.destroy_image_view(handles.view, None);
            }
        }
        log::debug!("Released texture material for {:?}", self.texture.image());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    #[test]
    fn test_new_handles_are_null() {
        let handles = MaterialHandles::default();
        assert_eq!(handles.view, vk::ImageView::null());
        assert_eq!(handles.sampler, vk::Sampler::null());
        assert_eq!(handles.set_layout, vk::DescriptorSetLayout::null());
        assert_eq!(handles.pool, vk::DescriptorPool::null());
        assert_eq!(handles.set, vk::DescriptorSet::null());
    }

    #[test]
    fn test_take_keeps_partially_created_handles() {
        // View and sampler exist, layout creation failed.
        let mut handles = MaterialHandles {
            view: vk::ImageView::from_raw(7),
            sampler: vk::Sampler::from_raw(9),
            ..MaterialHandles::default()
        };

        let released = handles.take();
        assert_eq!(released.view.as_raw(), 7);
        assert_eq!(released.sampler.as_raw(), 9);
        assert_eq!(released.set_layout, vk::DescriptorSetLayout::null());
        assert_eq!(released.pool, vk::DescriptorPool::null());

        assert_eq!(handles, MaterialHandles::default());
        assert_eq!(handles.take(), MaterialHandles::default());
    }
}

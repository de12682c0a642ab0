//! Staging uploads into device-local memory

use ash::vk;
use bytemuck::Pod;
use vulkan_learn::backend::vulkan::color_subresource_range;
use vulkan_learn::prelude::*;

/// Copy `data` into a new device-local buffer with `usage`
///
/// The data goes through a host-visible staging buffer that is released
/// once the copy has completed.
pub fn upload_buffer<T: Pod>(
    ctx: &VulkanContext,
    pool: vk::CommandPool,
    data: &[T],
    usage: vk::BufferUsageFlags,
) -> VulkanResult<BufferResource> {
    let size = std::mem::size_of_val(data) as vk::DeviceSize;

    let staging = ctx.create_buffer(
        &buffer_info(size, vk::BufferUsageFlags::TRANSFER_SRC),
        MemoryClass::CpuOnly,
    )?;
    staging.write(data)?;

    let buffer = ctx.create_buffer(
        &buffer_info(size, usage | vk::BufferUsageFlags::TRANSFER_DST),
        MemoryClass::GpuOnly,
    )?;

    ctx.execute_one_shot(pool, |device, cmd| unsafe {
        let region = [vk::BufferCopy {
            src_offset: 0,
            dst_offset: 0,
            size,
        }];
        device.cmd_copy_buffer(cmd, staging.buffer(), buffer.buffer(), &region);
    })?;

    log::debug!("Uploaded {} bytes", size);
    Ok(buffer)
}

/// Copy RGBA pixels into a new sampled image
///
/// The image ends up in `SHADER_READ_ONLY_OPTIMAL`, ready for the fragment
/// stage.
pub fn upload_texture(
    ctx: &VulkanContext,
    pool: vk::CommandPool,
    image: &ImageData,
    format: vk::Format,
) -> AppResult<ImageResource> {
    if image.channel_count != 4 {
        return Err(AppError::Custom(format!(
            "texture upload expects 4 channels, got {}",
            image.channel_count
        )));
    }

    let staging = ctx.create_buffer(
        &buffer_info(image.size_bytes() as vk::DeviceSize, vk::BufferUsageFlags::TRANSFER_SRC),
        MemoryClass::CpuOnly,
    )?;
    staging.write(&image.pixels)?;

    let extent = vk::Extent3D {
        width: image.width,
        height: image.height,
        depth: 1,
    };
    let texture = ctx.create_image(
        &vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::TYPE_2D)
            .format(format)
            .extent(extent)
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED),
        MemoryClass::GpuOnly,
    )?;

    ctx.execute_one_shot(pool, |device, cmd| unsafe {
        let to_transfer = [vk::ImageMemoryBarrier::builder()
            .old_layout(vk::ImageLayout::UNDEFINED)
            .new_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(texture.image())
            .subresource_range(color_subresource_range())
            .src_access_mask(vk::AccessFlags::empty())
            .dst_access_mask(vk::AccessFlags::TRANSFER_WRITE)
            .build()];
        device.cmd_pipeline_barrier(
            cmd,
            vk::PipelineStageFlags::TOP_OF_PIPE,
            vk::PipelineStageFlags::TRANSFER,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &to_transfer,
        );

        let region = [vk::BufferImageCopy::builder()
            .buffer_offset(0)
            .buffer_row_length(0)
            .buffer_image_height(0)
            .image_subresource(vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: 0,
                base_array_layer: 0,
                layer_count: 1,
            })
            .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
            .image_extent(extent)
            .build()];
        device.cmd_copy_buffer_to_image(
            cmd,
            staging.buffer(),
            texture.image(),
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            &region,
        );

        let to_shader = [vk::ImageMemoryBarrier::builder()
            .old_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
            .new_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(texture.image())
            .subresource_range(color_subresource_range())
            .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
            .dst_access_mask(vk::AccessFlags::SHADER_READ)
            .build()];
        device.cmd_pipeline_barrier(
            cmd,
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::FRAGMENT_SHADER,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &to_shader,
        );
    })?;

    log::info!("Uploaded {}x{} texture", image.width, image.height);
    Ok(texture)
}

fn buffer_info(size: vk::DeviceSize, usage: vk::BufferUsageFlags) -> vk::BufferCreateInfo {
    vk::BufferCreateInfo::builder()
        .size(size)
        .usage(usage)
        .sharing_mode(vk::SharingMode::EXCLUSIVE)
        .build()
}

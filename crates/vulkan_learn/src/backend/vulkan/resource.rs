//! GPU resource handles
//!
//! A [`GpuResource`] owns exactly one buffer or image together with the
//! memory allocation backing it. Handles are shared through `Rc`; the
//! native destroy call runs once, when the last owner lets go.
//!
//! Memory comes from a [`ResourceAllocator`], implemented for
//! `vk_mem::Allocator`. The allocator is shared with the device context so
//! it stays alive for as long as any resource allocated from it.

use super::{VulkanError, VulkanResult};
use ash::vk;
use bytemuck::Pod;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use vk_mem::Alloc;

/// Where an allocation lives and how the host may touch it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryClass {
    /// Device-local, not mappable
    GpuOnly,
    /// Host memory, used for staging uploads
    CpuOnly,
    /// Host-visible memory the GPU reads frequently
    CpuToGpu,
    /// Host-visible memory for GPU readback
    GpuToCpu,
}

impl MemoryClass {
    /// Whether `map` is permitted for this class
    pub fn is_host_visible(self) -> bool {
        !matches!(self, Self::GpuOnly)
    }

    /// Translate to the allocator's usage hint
    #[allow(deprecated)]
    pub fn memory_usage(self) -> vk_mem::MemoryUsage {
        match self {
            Self::GpuOnly => vk_mem::MemoryUsage::GpuOnly,
            Self::CpuOnly => vk_mem::MemoryUsage::CpuOnly,
            Self::CpuToGpu => vk_mem::MemoryUsage::CpuToGpu,
            Self::GpuToCpu => vk_mem::MemoryUsage::GpuToCpu,
        }
    }
}

/// Native handle of a resource, tagged by kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// A `VkBuffer`
    Buffer(vk::Buffer),
    /// A `VkImage`
    Image(vk::Image),
}

/// Memory allocator backing GPU resources
///
/// # Safety
///
/// Every method forwards to native allocator calls. Callers must pass
/// allocations obtained from the same allocator, never free one twice and
/// keep map/unmap balanced. [`GpuResource`] upholds all of this.
pub trait ResourceAllocator {
    /// Per-resource allocation record
    type Allocation;

    /// Create a buffer and bind fresh memory to it
    ///
    /// # Safety
    ///
    /// `info` must describe a valid buffer for the allocator's device.
    unsafe fn allocate_buffer(
        &self,
        info: &vk::BufferCreateInfo,
        class: MemoryClass,
    ) -> VulkanResult<(vk::Buffer, Self::Allocation)>;

    /// Create an image and bind fresh memory to it
    ///
    /// # Safety
    ///
    /// `info` must describe a valid image for the allocator's device.
    unsafe fn allocate_image(
        &self,
        info: &vk::ImageCreateInfo,
        class: MemoryClass,
    ) -> VulkanResult<(vk::Image, Self::Allocation)>;

    /// Map host-visible memory
    ///
    /// # Safety
    ///
    /// The allocation must be host-visible and not currently mapped.
    unsafe fn map(&self, allocation: &mut Self::Allocation) -> VulkanResult<*mut u8>;

    /// Unmap previously mapped memory
    ///
    /// # Safety
    ///
    /// The allocation must currently be mapped.
    unsafe fn unmap(&self, allocation: &mut Self::Allocation);

    /// Destroy a buffer and free its memory
    ///
    /// # Safety
    ///
    /// The buffer must not be in use by the GPU and must not be used afterwards.
    unsafe fn free_buffer(&self, buffer: vk::Buffer, allocation: &mut Self::Allocation);

    /// Destroy an image and free its memory
    ///
    /// # Safety
    ///
    /// The image must not be in use by the GPU and must not be used afterwards.
    unsafe fn free_image(&self, image: vk::Image, allocation: &mut Self::Allocation);
}

impl ResourceAllocator for vk_mem::Allocator {
    type Allocation = vk_mem::Allocation;

    unsafe fn allocate_buffer(
        &self,
        info: &vk::BufferCreateInfo,
        class: MemoryClass,
    ) -> VulkanResult<(vk::Buffer, Self::Allocation)> {
        let create_info = vk_mem::AllocationCreateInfo {
            usage: class.memory_usage(),
            ..Default::default()
        };
        self.create_buffer(info, &create_info)
            .map_err(VulkanError::Allocation)
    }

    unsafe fn allocate_image(
        &self,
        info: &vk::ImageCreateInfo,
        class: MemoryClass,
    ) -> VulkanResult<(vk::Image, Self::Allocation)> {
        let create_info = vk_mem::AllocationCreateInfo {
            usage: class.memory_usage(),
            ..Default::default()
        };
        self.create_image(info, &create_info)
            .map_err(VulkanError::Allocation)
    }

    unsafe fn map(&self, allocation: &mut Self::Allocation) -> VulkanResult<*mut u8> {
        self.map_memory(allocation).map_err(VulkanError::Api)
    }

    unsafe fn unmap(&self, allocation: &mut Self::Allocation) {
        self.unmap_memory(allocation);
    }

    unsafe fn free_buffer(&self, buffer: vk::Buffer, allocation: &mut Self::Allocation) {
        self.destroy_buffer(buffer, allocation);
    }

    unsafe fn free_image(&self, image: vk::Image, allocation: &mut Self::Allocation) {
        self.destroy_image(image, allocation);
    }
}

/// One buffer or image plus its allocation
pub struct GpuResource<A: ResourceAllocator = vk_mem::Allocator> {
    allocator: Rc<A>,
    kind: ResourceKind,
    allocation: RefCell<A::Allocation>,
    memory_class: MemoryClass,
    mapped: Cell<bool>,
    size: vk::DeviceSize,
}

/// Shared handle to a buffer resource
pub type BufferResource = Rc<GpuResource>;

/// Shared handle to an image resource
pub type ImageResource = Rc<GpuResource>;

impl<A: ResourceAllocator> GpuResource<A> {
    /// Create a buffer with memory of the given class
    pub fn create_buffer(
        allocator: &Rc<A>,
        info: &vk::BufferCreateInfo,
        memory_class: MemoryClass,
    ) -> VulkanResult<Rc<Self>> {
        let (buffer, allocation) = unsafe { allocator.allocate_buffer(info, memory_class)? };
        log::debug!(
            "Allocated {} byte buffer ({:?})",
            info.size,
            memory_class
        );

        Ok(Rc::new(Self {
            allocator: Rc::clone(allocator),
            kind: ResourceKind::Buffer(buffer),
            allocation: RefCell::new(allocation),
            memory_class,
            mapped: Cell::new(false),
            size: info.size,
        }))
    }

    /// Create an image with memory of the given class
    pub fn create_image(
        allocator: &Rc<A>,
        info: &vk::ImageCreateInfo,
        memory_class: MemoryClass,
    ) -> VulkanResult<Rc<Self>> {
        let (image, allocation) = unsafe { allocator.allocate_image(info, memory_class)? };
        log::debug!(
            "Allocated {}x{} {:?} image ({:?})",
            info.extent.width,
            info.extent.height,
            info.format,
            memory_class
        );

        Ok(Rc::new(Self {
            allocator: Rc::clone(allocator),
            kind: ResourceKind::Image(image),
            allocation: RefCell::new(allocation),
            memory_class,
            mapped: Cell::new(false),
            size: 0,
        }))
    }

    /// Map the allocation into host address space
    pub fn map(&self) -> VulkanResult<*mut u8> {
        if !self.memory_class.is_host_visible() {
            return Err(VulkanError::InvalidState(format!(
                "Cannot map {:?} memory",
                self.memory_class
            )));
        }
        if self.mapped.get() {
            return Err(VulkanError::InvalidState(
                "Resource is already mapped".to_string(),
            ));
        }

        let ptr = unsafe { self.allocator.map(&mut self.allocation.borrow_mut())? };
        self.mapped.set(true);
        Ok(ptr)
    }

    /// Unmap a previously mapped allocation
    pub fn unmap(&self) -> VulkanResult<()> {
        if !self.mapped.get() {
            return Err(VulkanError::InvalidState(
                "Resource is not mapped".to_string(),
            ));
        }

        unsafe { self.allocator.unmap(&mut self.allocation.borrow_mut()) };
        self.mapped.set(false);
        Ok(())
    }

    /// Copy `data` to the start of a host-visible buffer
    pub fn write<T: Pod>(&self, data: &[T]) -> VulkanResult<()> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        self.expect_buffer("write")?;
        if bytes.len() as vk::DeviceSize > self.size {
            return Err(VulkanError::InvalidState(format!(
                "Write of {} bytes exceeds buffer size {}",
                bytes.len(),
                self.size
            )));
        }

        let ptr = self.map()?;
        unsafe { std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr, bytes.len()) };
        self.unmap()
    }

    /// Copy the whole contents of a host-visible buffer
    pub fn read_bytes(&self) -> VulkanResult<Vec<u8>> {
        self.expect_buffer("read")?;
        let len = usize::try_from(self.size).map_err(|_| {
            VulkanError::InvalidState(format!("Buffer size {} exceeds address space", self.size))
        })?;

        let ptr = self.map()?;
        let mut out = vec![0u8; len];
        unsafe { std::ptr::copy_nonoverlapping(ptr, out.as_mut_ptr(), len) };
        self.unmap()?;
        Ok(out)
    }

    fn expect_buffer(&self, operation: &str) -> VulkanResult<()> {
        match self.kind {
            ResourceKind::Buffer(_) => Ok(()),
            ResourceKind::Image(_) => Err(VulkanError::InvalidState(format!(
                "Cannot {operation} an image resource directly"
            ))),
        }
    }

    /// Native handle tagged by kind
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Buffer handle, or null for images
    pub fn buffer(&self) -> vk::Buffer {
        match self.kind {
            ResourceKind::Buffer(buffer) => buffer,
            ResourceKind::Image(_) => vk::Buffer::null(),
        }
    }

    /// Image handle, or null for buffers
    pub fn image(&self) -> vk::Image {
        match self.kind {
            ResourceKind::Image(image) => image,
            ResourceKind::Buffer(_) => vk::Image::null(),
        }
    }

    /// Memory class chosen at creation
    pub fn memory_class(&self) -> MemoryClass {
        self.memory_class
    }

    /// Whether the allocation is currently mapped
    pub fn is_mapped(&self) -> bool {
        self.mapped.get()
    }

    /// Byte size for buffers; zero for images
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }
}

impl<A: ResourceAllocator> fmt::Debug for GpuResource<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuResource")
            .field("kind", &self.kind)
            .field("memory_class", &self.memory_class)
            .field("mapped", &self.mapped.get())
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

impl<A: ResourceAllocator> Drop for GpuResource<A> {
    fn drop(&mut self) {
        let allocation = self.allocation.get_mut();
        unsafe {
            if self.mapped.get() {
                self.allocator.unmap(allocation);
                self.mapped.set(false);
            }
            match self.kind {
                ResourceKind::Buffer(buffer) => self.allocator.free_buffer(buffer, allocation),
                ResourceKind::Image(image) => self.allocator.free_image(image, allocation),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    #[derive(Default)]
    struct CountingAllocator {
        next_handle: Cell<u64>,
        buffers_freed: Cell<u32>,
        images_freed: Cell<u32>,
        maps: Cell<u32>,
        unmaps: Cell<u32>,
        fail_with: Cell<Option<vk::Result>>,
    }

    struct FakeAllocation {
        memory: Vec<u8>,
    }

    impl CountingAllocator {
        fn next(&self) -> u64 {
            self.next_handle.set(self.next_handle.get() + 1);
            self.next_handle.get()
        }
    }

    impl ResourceAllocator for CountingAllocator {
        type Allocation = FakeAllocation;

        unsafe fn allocate_buffer(
            &self,
            info: &vk::BufferCreateInfo,
            _class: MemoryClass,
        ) -> VulkanResult<(vk::Buffer, FakeAllocation)> {
            if let Some(result) = self.fail_with.get() {
                return Err(VulkanError::Allocation(result));
            }
            let memory = vec![0; info.size as usize];
            Ok((vk::Buffer::from_raw(self.next()), FakeAllocation { memory }))
        }

        unsafe fn allocate_image(
            &self,
            _info: &vk::ImageCreateInfo,
            _class: MemoryClass,
        ) -> VulkanResult<(vk::Image, FakeAllocation)> {
            Ok((vk::Image::from_raw(self.next()), FakeAllocation { memory: Vec::new() }))
        }

        unsafe fn map(&self, allocation: &mut FakeAllocation) -> VulkanResult<*mut u8> {
            self.maps.set(self.maps.get() + 1);
            Ok(allocation.memory.as_mut_ptr())
        }

        unsafe fn unmap(&self, _allocation: &mut FakeAllocation) {
            self.unmaps.set(self.unmaps.get() + 1);
        }

        unsafe fn free_buffer(&self, _buffer: vk::Buffer, _allocation: &mut FakeAllocation) {
            self.buffers_freed.set(self.buffers_freed.get() + 1);
        }

        unsafe fn free_image(&self, _image: vk::Image, _allocation: &mut FakeAllocation) {
            self.images_freed.set(self.images_freed.get() + 1);
        }
    }

    fn buffer_info(size: vk::DeviceSize) -> vk::BufferCreateInfo {
        vk::BufferCreateInfo::builder()
            .size(size)
            .usage(vk::BufferUsageFlags::VERTEX_BUFFER)
            .build()
    }

    fn image_info() -> vk::ImageCreateInfo {
        vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::TYPE_2D)
            .format(vk::Format::R8G8B8A8_SRGB)
            .extent(vk::Extent3D { width: 4, height: 4, depth: 1 })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .build()
    }

    #[test]
    fn test_buffer_is_freed_once_on_drop() {
        let allocator = Rc::new(CountingAllocator::default());
        let buffer = GpuResource::create_buffer(&allocator, &buffer_info(64), MemoryClass::GpuOnly)
            .unwrap();
        assert_eq!(buffer.size(), 64);
        assert_ne!(buffer.buffer(), vk::Buffer::null());
        assert_eq!(buffer.image(), vk::Image::null());

        drop(buffer);
        assert_eq!(allocator.buffers_freed.get(), 1);
        assert_eq!(allocator.images_freed.get(), 0);
    }

    #[test]
    fn test_shared_handle_frees_after_last_owner() {
        let allocator = Rc::new(CountingAllocator::default());
        let first = GpuResource::create_buffer(&allocator, &buffer_info(16), MemoryClass::CpuOnly)
            .unwrap();
        let second = Rc::clone(&first);

        drop(first);
        assert_eq!(allocator.buffers_freed.get(), 0);
        assert_eq!(second.kind(), ResourceKind::Buffer(second.buffer()));

        drop(second);
        assert_eq!(allocator.buffers_freed.get(), 1);
    }

    #[test]
    fn test_image_uses_image_free_path() {
        let allocator = Rc::new(CountingAllocator::default());
        let image = GpuResource::create_image(&allocator, &image_info(), MemoryClass::GpuOnly)
            .unwrap();
        assert!(matches!(image.kind(), ResourceKind::Image(_)));

        drop(image);
        assert_eq!(allocator.images_freed.get(), 1);
        assert_eq!(allocator.buffers_freed.get(), 0);
    }

    #[test]
    fn test_resource_keeps_allocator_alive() {
        let allocator = Rc::new(CountingAllocator::default());
        let buffer = GpuResource::create_buffer(&allocator, &buffer_info(8), MemoryClass::GpuOnly)
            .unwrap();
        assert_eq!(Rc::strong_count(&allocator), 2);
        drop(buffer);
        assert_eq!(Rc::strong_count(&allocator), 1);
    }

    #[test]
    fn test_allocation_failure_is_reported() {
        let allocator = Rc::new(CountingAllocator::default());
        allocator.fail_with.set(Some(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY));

        let err = GpuResource::create_buffer(&allocator, &buffer_info(8), MemoryClass::GpuOnly)
            .unwrap_err();
        assert_eq!(err, VulkanError::Allocation(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY));
        assert_eq!(allocator.buffers_freed.get(), 0);
    }

    #[test]
    fn test_map_rejects_device_only_memory() {
        let allocator = Rc::new(CountingAllocator::default());
        let buffer = GpuResource::create_buffer(&allocator, &buffer_info(8), MemoryClass::GpuOnly)
            .unwrap();
        assert!(matches!(buffer.map(), Err(VulkanError::InvalidState(_))));
        assert_eq!(allocator.maps.get(), 0);
    }

    #[test]
    fn test_map_does_not_nest() {
        let allocator = Rc::new(CountingAllocator::default());
        let buffer = GpuResource::create_buffer(&allocator, &buffer_info(8), MemoryClass::CpuToGpu)
            .unwrap();

        assert!(matches!(buffer.unmap(), Err(VulkanError::InvalidState(_))));
        buffer.map().unwrap();
        assert!(buffer.is_mapped());
        assert!(matches!(buffer.map(), Err(VulkanError::InvalidState(_))));
        buffer.unmap().unwrap();
        assert!(matches!(buffer.unmap(), Err(VulkanError::InvalidState(_))));
        assert_eq!(allocator.maps.get(), 1);
        assert_eq!(allocator.unmaps.get(), 1);
    }

    #[test]
    fn test_drop_unmaps_before_free() {
        let allocator = Rc::new(CountingAllocator::default());
        let buffer = GpuResource::create_buffer(&allocator, &buffer_info(8), MemoryClass::GpuToCpu)
            .unwrap();
        buffer.map().unwrap();

        drop(buffer);
        assert_eq!(allocator.unmaps.get(), 1);
        assert_eq!(allocator.buffers_freed.get(), 1);
    }

    #[test]
    fn test_write_then_read_back() {
        let allocator = Rc::new(CountingAllocator::default());
        let buffer = GpuResource::create_buffer(&allocator, &buffer_info(12), MemoryClass::CpuOnly)
            .unwrap();

        buffer.write(&[1.0f32, 2.0, 3.0]).unwrap();
        let bytes = buffer.read_bytes().unwrap();
        assert_eq!(bytes, bytemuck::cast_slice::<f32, u8>(&[1.0, 2.0, 3.0]));
        assert!(!buffer.is_mapped());
    }

    #[test]
    fn test_write_past_end_is_rejected() {
        let allocator = Rc::new(CountingAllocator::default());
        let buffer = GpuResource::create_buffer(&allocator, &buffer_info(4), MemoryClass::CpuOnly)
            .unwrap();

        assert!(matches!(buffer.write(&[0u32, 1]), Err(VulkanError::InvalidState(_))));
        assert_eq!(allocator.maps.get(), 0);
    }

    #[test]
    fn test_images_cannot_be_written_directly() {
        let allocator = Rc::new(CountingAllocator::default());
        let image = GpuResource::create_image(&allocator, &image_info(), MemoryClass::CpuOnly)
            .unwrap();
        assert!(matches!(image.write(&[0u8; 4]), Err(VulkanError::InvalidState(_))));
    }
}

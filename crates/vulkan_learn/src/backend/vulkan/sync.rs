//! Fence wrapper for blocking CPU/GPU synchronization
//!
//! Every wait in this crate is unbounded: the host thread blocks until the
//! GPU signals. A fence is always created unsignaled and is reset straight
//! after each successful wait, so it is ready for the next use.

use super::{VulkanError, VulkanResult};
use ash::{vk, Device};

/// Run `wait` until it stops reporting `TIMEOUT`
///
/// Drivers may return `TIMEOUT` even for an infinite wait; the call is then
/// simply repeated. Any other error is returned as [`VulkanError::Api`].
/// Returns the number of attempts made.
pub fn wait_retrying_on_timeout<F>(mut wait: F) -> VulkanResult<u32>
where
    F: FnMut() -> Result<(), vk::Result>,
{
    let mut attempts = 0;
    loop {
        attempts += 1;
        match wait() {
            Ok(()) => return Ok(attempts),
            Err(vk::Result::TIMEOUT) => {
                log::trace!("Fence wait timed out, retrying (attempt {})", attempts);
            }
            Err(e) => return Err(VulkanError::Api(e)),
        }
    }
}

/// RAII wrapper for a Vulkan fence
pub struct Fence {
    device: Device,
    fence: vk::Fence,
}

impl Fence {
    /// Create a new unsignaled fence
    pub fn new(device: Device) -> VulkanResult<Self> {
        let create_info = vk::FenceCreateInfo::builder();

        let fence = unsafe {
            device
                .create_fence(&create_info, None)
                .map_err(VulkanError::creation("fence"))?
        };

        Ok(Self { device, fence })
    }

    /// Block until the fence is signaled, then reset it
    pub fn wait_and_reset(&self) -> VulkanResult<()> {
        wait_retrying_on_timeout(|| unsafe {
            self.device.wait_for_fences(&[self.fence], true, u64::MAX)
        })?;
        self.reset()
    }

    /// Reset fence
    pub fn reset(&self) -> VulkanResult<()> {
        unsafe {
            self.device
                .reset_fences(&[self.fence])
                .map_err(VulkanError::Api)
        }
    }

    /// Get the fence handle
    pub fn handle(&self) -> vk::Fence {
        self.fence
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_fence(self.fence, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_immediate_success_takes_one_attempt() {
        assert_eq!(wait_retrying_on_timeout(|| Ok(())), Ok(1));
    }

    #[test]
    fn test_timeouts_are_retried() {
        let mut remaining_timeouts = 3;
        let attempts = wait_retrying_on_timeout(|| {
            if remaining_timeouts > 0 {
                remaining_timeouts -= 1;
                Err(vk::Result::TIMEOUT)
            } else {
                Ok(())
            }
        });
        assert_eq!(attempts, Ok(4));
    }

    #[test]
    fn test_other_errors_are_not_retried() {
        let mut calls = 0;
        let result = wait_retrying_on_timeout(|| {
            calls += 1;
            Err(vk::Result::ERROR_DEVICE_LOST)
        });
        assert_eq!(result, Err(VulkanError::Api(vk::Result::ERROR_DEVICE_LOST)));
        assert_eq!(calls, 1);
    }
}

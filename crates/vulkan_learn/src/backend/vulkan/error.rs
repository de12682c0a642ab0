//! Vulkan error taxonomy

use ash::vk;
use thiserror::Error;

/// Vulkan-specific error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VulkanError {
    /// Instance, device, surface or swapchain setup failed
    #[error("Initialization failed: {0}")]
    Initialization(String),

    /// A `create_*` forwarder was rejected by the driver
    #[error("Failed to create {operation}: {result:?}")]
    ResourceCreation {
        /// Name of the operation that failed
        operation: &'static str,
        /// Native result code
        result: vk::Result,
    },

    /// The memory allocator could not satisfy a request
    #[error("Allocation failed: {0:?}")]
    Allocation(vk::Result),

    /// Queue submission was rejected
    #[error("Queue submission failed: {0:?}")]
    Submission(vk::Result),

    /// Presentation failed (including out-of-date and lost surfaces)
    #[error("Presentation failed: {0:?}")]
    Presentation(vk::Result),

    /// Operation attempted in a state where it is not valid
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// General Vulkan API error with result code
    #[error("Vulkan API error: {0:?}")]
    Api(vk::Result),
}

impl VulkanError {
    /// Build a `map_err` adapter for a named creation call
    pub fn creation(operation: &'static str) -> impl Fn(vk::Result) -> Self {
        move |result| Self::ResourceCreation { operation, result }
    }

    /// Build a `map_err` adapter that reports a failed setup step as
    /// [`VulkanError::Initialization`]
    ///
    /// Errors that already are initialization errors pass through unchanged.
    pub fn during_initialization(step: &'static str) -> impl Fn(Self) -> Self {
        move |err| match err {
            Self::Initialization(_) => err,
            other => Self::Initialization(format!("{step}: {other}")),
        }
    }
}

/// Result type for Vulkan operations
pub type VulkanResult<T> = Result<T, VulkanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creation_adapter_carries_operation_name() {
        let err = VulkanError::creation("sampler")(vk::Result::ERROR_OUT_OF_HOST_MEMORY);
        assert_eq!(
            err,
            VulkanError::ResourceCreation {
                operation: "sampler",
                result: vk::Result::ERROR_OUT_OF_HOST_MEMORY,
            }
        );
        assert!(err.to_string().contains("sampler"));
    }

    #[test]
    fn test_setup_failures_become_initialization_errors() {
        let wrap = VulkanError::during_initialization("Fence creation");

        let err = wrap(VulkanError::creation("fence")(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY));
        match err {
            VulkanError::Initialization(message) => {
                assert!(message.starts_with("Fence creation"));
                assert!(message.contains("fence"));
            }
            other => panic!("expected an initialization error, got {other:?}"),
        }

        let err = wrap(VulkanError::Submission(vk::Result::ERROR_DEVICE_LOST));
        assert!(matches!(err, VulkanError::Initialization(_)));
    }

    #[test]
    fn test_initialization_errors_pass_through() {
        let setup_error = VulkanError::Initialization("No Vulkan capable GPU found".to_string());
        let wrapped = VulkanError::during_initialization("Device selection")(setup_error.clone());
        assert_eq!(wrapped, setup_error);
    }
}

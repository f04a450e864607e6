// Copyright (c) 2025 the accel-rt authors
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The backend error taxonomy.
//!
//! The numeric codes returned by [`BackendError::code`] are part of the
//! backend ABI and must never change. Code `0x0000` is reserved for
//! success, which in this crate is simply `Ok(())`.

/// Result alias used across the backend API.
pub type Result<T> = std::result::Result<T, BackendError>;

/// ABI code reserved for the absence of an error.
pub const SUCCESS_CODE: u32 = 0x0000;

/// Every failure an API call can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum BackendError {
    /// Catch-all for failures with no dedicated kind.
    #[error("unknown error")]
    UnknownError,

    /// A parameter is not valid in the context of the operation.
    #[error("a parameter is not valid in the context of the operation")]
    IncorrectParameter,

    /// The host is out of memory.
    #[error("the host is out of memory")]
    OutOfHostMemory,

    /// The requested zone cannot hold the allocation.
    #[error("the device is out of memory")]
    OutOfDeviceMemory,

    /// Tensor sizes are not compatible for this operation.
    #[error("the tensor sizes are not compatible for this operation")]
    InconsistentTensorSizes,

    /// Tensor ranks are not compatible for this operation.
    #[error("the tensor ranks are not compatible for this operation")]
    InconsistentNumberOfDimensions,

    /// No kernel is instantiated for the requested element-type tuple.
    #[error("no kernel is instantiated for this element-type combination")]
    UnimplementedType,

    /// The tensor handle has no backing storage.
    #[error("the tensor has not been declared to the backend")]
    UnknownTensor,

    /// Element kinds differ where equality is required.
    #[error("the tensor element types are not compatible")]
    InconsistentTensorTypes,

    /// Host allocation of bookkeeping state failed.
    #[error("host allocation failed")]
    BadAlloc,

    /// The requested device is not initialized.
    #[error("the requested device is not initialized")]
    DeviceNotInitialized,

    /// The request is not compatible with the memory alignment.
    #[error("the request is not compatible with the memory alignment")]
    BadMemoryAlignment,

    /// The requested service or configuration is not provided by this
    /// backend.
    #[error("the requested service or configuration is not implemented")]
    NotImplemented,

    /// Error inside the device implementation.
    #[error("error in the device implementation")]
    DeviceError,

    /// The given device identifiers are inconsistent.
    #[error("the given device identifiers are inconsistent")]
    InconsistentDevice,

    /// A kernel was invoked on a tensor currently mapped to the host.
    #[error("cannot process a mapped tensor")]
    ProcessMappedTensor,

    /// Memory is not aligned as expected by the backend.
    #[error("memory is not aligned as expected by the backend")]
    MemoryAlignmentError,

    /// Memory is not laid out in accordance with the backend
    /// specification.
    #[error("memory is not laid out in accordance with the backend specification")]
    MemoryLayoutError,
}

impl BackendError {
    /// Returns the ABI-stable numeric code for this error.
    pub fn code(self) -> u32 {
        match self {
            BackendError::UnknownError => 0x0001,
            BackendError::IncorrectParameter => 0x0002,
            BackendError::OutOfHostMemory => 0x0003,
            BackendError::OutOfDeviceMemory => 0x0004,
            BackendError::InconsistentTensorSizes => 0x0005,
            BackendError::InconsistentNumberOfDimensions => 0x0006,
            BackendError::UnimplementedType => 0x0007,
            BackendError::UnknownTensor => 0x0008,
            BackendError::InconsistentTensorTypes => 0x0009,
            BackendError::BadAlloc => 0x000A,
            BackendError::DeviceNotInitialized => 0x000B,
            BackendError::BadMemoryAlignment => 0x000C,
            BackendError::NotImplemented => 0x000D,
            BackendError::DeviceError => 0x000E,
            BackendError::InconsistentDevice => 0x000F,
            BackendError::ProcessMappedTensor => 0x0010,
            BackendError::MemoryAlignmentError => 0x0011,
            BackendError::MemoryLayoutError => 0x0012,
        }
    }

    /// Returns the stable short identifier for this error.
    pub fn name(self) -> &'static str {
        match self {
            BackendError::UnknownError => "UnknownError",
            BackendError::IncorrectParameter => "IncorrectParameter",
            BackendError::OutOfHostMemory => "OutOfHostMemory",
            BackendError::OutOfDeviceMemory => "OutOfDeviceMemory",
            BackendError::InconsistentTensorSizes => "InconsistentTensorSizes",
            BackendError::InconsistentNumberOfDimensions => {
                "InconsistentNumberOfDimensions"
            }
            BackendError::UnimplementedType => "UnimplementedType",
            BackendError::UnknownTensor => "UnknownTensor",
            BackendError::InconsistentTensorTypes => "InconsistentTensorTypes",
            BackendError::BadAlloc => "BadAlloc",
            BackendError::DeviceNotInitialized => "DeviceNotInitialized",
            BackendError::BadMemoryAlignment => "BadMemoryAlignment",
            BackendError::NotImplemented => "NotImplemented",
            BackendError::DeviceError => "DeviceError",
            BackendError::InconsistentDevice => "InconsistentDevice",
            BackendError::ProcessMappedTensor => "ProcessMappedTensor",
            BackendError::MemoryAlignmentError => "MemoryAlignmentError",
            BackendError::MemoryLayoutError => "MemoryLayoutError",
        }
    }

    /// Looks an error up by its ABI code. `0x0000` and unassigned codes
    /// return `None`.
    pub fn from_code(code: u32) -> Option<BackendError> {
        let all = [
            BackendError::UnknownError,
            BackendError::IncorrectParameter,
            BackendError::OutOfHostMemory,
            BackendError::OutOfDeviceMemory,
            BackendError::InconsistentTensorSizes,
            BackendError::InconsistentNumberOfDimensions,
            BackendError::UnimplementedType,
            BackendError::UnknownTensor,
            BackendError::InconsistentTensorTypes,
            BackendError::BadAlloc,
            BackendError::DeviceNotInitialized,
            BackendError::BadMemoryAlignment,
            BackendError::NotImplemented,
            BackendError::DeviceError,
            BackendError::InconsistentDevice,
            BackendError::ProcessMappedTensor,
            BackendError::MemoryAlignmentError,
            BackendError::MemoryLayoutError,
        ];
        all.into_iter().find(|e| e.code() == code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(BackendError::UnknownError.code(), 0x0001);
        assert_eq!(BackendError::IncorrectParameter.code(), 0x0002);
        assert_eq!(BackendError::OutOfHostMemory.code(), 0x0003);
        assert_eq!(BackendError::OutOfDeviceMemory.code(), 0x0004);
        assert_eq!(BackendError::InconsistentTensorSizes.code(), 0x0005);
        assert_eq!(BackendError::InconsistentNumberOfDimensions.code(), 0x0006);
        assert_eq!(BackendError::UnimplementedType.code(), 0x0007);
        assert_eq!(BackendError::UnknownTensor.code(), 0x0008);
        assert_eq!(BackendError::InconsistentTensorTypes.code(), 0x0009);
        assert_eq!(BackendError::BadAlloc.code(), 0x000A);
        assert_eq!(BackendError::DeviceNotInitialized.code(), 0x000B);
        assert_eq!(BackendError::BadMemoryAlignment.code(), 0x000C);
        assert_eq!(BackendError::NotImplemented.code(), 0x000D);
        assert_eq!(BackendError::DeviceError.code(), 0x000E);
        assert_eq!(BackendError::InconsistentDevice.code(), 0x000F);
        assert_eq!(BackendError::ProcessMappedTensor.code(), 0x0010);
        assert_eq!(BackendError::MemoryAlignmentError.code(), 0x0011);
        assert_eq!(BackendError::MemoryLayoutError.code(), 0x0012);
    }

    #[test]
    fn test_from_code_roundtrip() {
        for code in 0x0001..=0x0012u32 {
            let err = BackendError::from_code(code).unwrap();
            assert_eq!(err.code(), code);
        }
        assert_eq!(BackendError::from_code(SUCCESS_CODE), None);
        assert_eq!(BackendError::from_code(0x0013), None);
    }

    #[test]
    fn test_names_are_short_identifiers() {
        for code in 0x0001..=0x0012u32 {
            let name = BackendError::from_code(code).unwrap().name();
            assert!(!name.is_empty());
            assert!(name.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }
}

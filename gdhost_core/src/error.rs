// Error types shared across the core.
//
// `CallError` is the Rust face of the ABI's `CallError` out-parameter:
// dynamic calls return `Result<Variant, CallError>` internally and are
// flattened to the `#[repr(C)]` struct only at the boundary.

use thiserror::Error;

use crate::variant::VariantType;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum CallError {
    #[error("invalid method")]
    InvalidMethod,
    #[error("invalid type in argument {argument}, expected {expected}")]
    InvalidArgument { argument: i32, expected: VariantType },
    #[error("too many arguments, expected {expected}")]
    TooManyArguments { expected: i32 },
    #[error("too few arguments, expected {expected}")]
    TooFewArguments { expected: i32 },
    #[error("instance is null")]
    InstanceIsNull,
}

impl CallError {
    pub fn to_sys(&self) -> gdhost_sys::CallError {
        let (error, argument, expected) = match *self {
            CallError::InvalidMethod => (gdhost_sys::CALL_ERROR_INVALID_METHOD, 0, 0),
            CallError::InvalidArgument { argument, expected } => (
                gdhost_sys::CALL_ERROR_INVALID_ARGUMENT,
                argument,
                expected as i32,
            ),
            CallError::TooManyArguments { expected } => {
                (gdhost_sys::CALL_ERROR_TOO_MANY_ARGUMENTS, expected, 0)
            }
            CallError::TooFewArguments { expected } => {
                (gdhost_sys::CALL_ERROR_TOO_FEW_ARGUMENTS, expected, 0)
            }
            CallError::InstanceIsNull => (gdhost_sys::CALL_ERROR_INSTANCE_IS_NULL, 0, 0),
        };
        gdhost_sys::CallError {
            error,
            argument,
            expected,
        }
    }

    /// Interpret an error struct written by foreign code. Unknown error codes
    /// are treated as an invalid method.
    pub fn from_sys(raw: &gdhost_sys::CallError) -> Result<(), CallError> {
        match raw.error {
            gdhost_sys::CALL_OK => Ok(()),
            gdhost_sys::CALL_ERROR_INVALID_ARGUMENT => Err(CallError::InvalidArgument {
                argument: raw.argument,
                expected: u32::try_from(raw.expected)
                    .ok()
                    .and_then(VariantType::from_raw)
                    .unwrap_or(VariantType::Nil),
            }),
            gdhost_sys::CALL_ERROR_TOO_MANY_ARGUMENTS => Err(CallError::TooManyArguments {
                expected: raw.argument,
            }),
            gdhost_sys::CALL_ERROR_TOO_FEW_ARGUMENTS => Err(CallError::TooFewArguments {
                expected: raw.argument,
            }),
            gdhost_sys::CALL_ERROR_INSTANCE_IS_NULL => Err(CallError::InstanceIsNull),
            _ => Err(CallError::InvalidMethod),
        }
    }
}

/// Write a call outcome into an ABI error slot (ignored when null).
///
/// # Safety
/// `slot` must be null or valid for writes.
pub unsafe fn write_call_error(slot: *mut gdhost_sys::CallError, result: Result<(), CallError>) {
    if slot.is_null() {
        return;
    }
    let raw = match result {
        Ok(()) => gdhost_sys::CallError::OK,
        Err(e) => e.to_sys(),
    };
    unsafe { slot.write(raw) };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sys_round_trip() {
        let errors = [
            CallError::InvalidMethod,
            CallError::InvalidArgument {
                argument: 1,
                expected: VariantType::Int,
            },
            CallError::TooManyArguments { expected: 2 },
            CallError::TooFewArguments { expected: 3 },
            CallError::InstanceIsNull,
        ];
        for e in errors {
            assert_eq!(CallError::from_sys(&e.to_sys()), Err(e));
        }
        assert_eq!(CallError::from_sys(&gdhost_sys::CallError::OK), Ok(()));
    }

    #[test]
    fn messages_name_the_problem() {
        let e = CallError::InvalidArgument {
            argument: 0,
            expected: VariantType::Int,
        };
        assert_eq!(e.to_string(), "invalid type in argument 0, expected int");
    }
}

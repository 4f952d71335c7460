//! Maps `Box<dyn Error>` from collaborator traits to typed `IrError`.
//!
//! The traits in `ir_traits` use `Box<dyn Error + Send + Sync>`; this module
//! converts those to our error enum, with an optional feature-gated path for
//! `ir_hardware::HwError` downcasting.

use crate::error::IrError;

/// Map a trait-boundary error to a typed `IrError`.
///
/// Known hardware errors are classified precisely; anything else is wrapped
/// with `fallback`, which names the collaborator that failed.
pub fn map_hw_error(
    e: &(dyn std::error::Error + 'static),
    fallback: fn(String) -> IrError,
) -> IrError {
    #[cfg(feature = "hardware-errors")]
    {
        use ir_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::LinkClosed | HwError::Uart(_) => IrError::Transport(hw.to_string()),
                HwError::Gpio(_) => IrError::HardwareFault(hw.to_string()),
                HwError::Io(_) => fallback(hw.to_string()),
            };
        }
    }

    fallback(e.to_string())
}

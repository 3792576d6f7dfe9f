//! Error types
use core::{fmt, mem::transmute};

use crate::InterruptNum;

/// The macro to define [`ResultCode`].
macro_rules! define_result_code {
    (
        $( #[$meta:meta] )*
        pub enum ResultCode {
            $(
                $( #[$vmeta:meta] )*
                $vname:ident = $vd:expr
            ),* $(,)*
        }
    ) => {
        $( #[$meta] )*
        pub enum ResultCode {
            $(
                $( #[$vmeta] )*
                $vname = $vd
            ),*
        }

        impl ResultCode {
            /// Get the short name of the result code.
            ///
            /// # Examples
            ///
            /// ```
            /// use vega_irq::ResultCode;
            /// assert_eq!(ResultCode::BadParam.as_str(), "BadParam");
            /// ```
            pub fn as_str(self) -> &'static str {
                match self {
                    $(
                        Self::$vname => stringify!($vname),
                    )*
                }
            }

            fn fmt(self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl fmt::Debug for ResultCode {
            #[inline]
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                (*self).fmt(f)
            }
        }

        impl fmt::Display for ResultCode {
            #[inline]
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                (*self).fmt(f)
            }
        }
    };
}

define_result_code! {
    /// All result codes (including success) that the driver operations can
    /// produce.
    #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    #[repr(i8)]
    pub enum ResultCode {
        /// The operation was successful. No additional information is available.
        Success = 0,
        /// A parameter is out of range, e.g., an interrupt line that the
        /// controller doesn't have or a timer that the timer block doesn't
        /// contain.
        BadParam = -17,
        /// An interrupt line stayed asserted across too many dispatch passes.
        /// Its handler most likely failed to acknowledge the interrupt source.
        Unacknowledged = -45,
        /// The operation timed out.
        Timeout = -50,
    }
}

impl ResultCode {
    /// Get a flag indicating whether the code represents a failure.
    ///
    /// Failure codes have negative values.
    #[inline]
    pub fn is_err(self) -> bool {
        (self as i8) < 0
    }

    /// Get a flag indicating whether the code represents a success.
    ///
    /// Success codes have non-negative values.
    #[inline]
    pub fn is_ok(self) -> bool {
        !self.is_err()
    }
}

macro_rules! define_error {
    (
        mod $mod_name:ident {}
        $( #[$meta:meta] )*
        $vis:vis enum $name:ident {
            $(
                $( #[$vmeta:meta] )*
                $vname:ident
            ),* $(,)*
        }
    ) => {
        $( #[$meta] )*
        ///
        /// See [`ResultCode`] for all result codes and generic descriptions.
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(i8)]
        $vis enum $name {
            $(
                $( #[$vmeta] )*
                // Use the same discriminants as `ResultCode` for cost-free
                // conversion
                $vname = ResultCode::$vname as i8
            ),*
        }

        impl fmt::Debug for $name {
            #[inline]
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                ResultCode::from(*self).fmt(f)
            }
        }

        impl fmt::Display for $name {
            #[inline]
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                ResultCode::from(*self).fmt(f)
            }
        }

        impl From<Result<(), $name>> for ResultCode {
            #[inline]
            fn from(x: Result<(), $name>) -> Self {
                match x {
                    Ok(()) => Self::Success,
                    Err(e) => Self::from(e),
                }
            }
        }

        impl From<$name> for ResultCode {
            #[inline]
            fn from(x: $name) -> Self {
                // Safety: `ResultCode` and `$name` has the same representation
                //         type, and the representation of `ResultCode` is a
                //         superset of `x`.
                unsafe { transmute(x) }
            }
        }

        #[cfg(test)]
        mod $mod_name {
            use super::*;

            #[test]
            fn to_result_code() {
                $(
                    assert_eq!(
                        ResultCode::$vname,
                        ResultCode::from($name::$vname),
                    );
                )*
            }

            #[test]
            fn result_to_result_code() {
                $(
                    assert_eq!(
                        ResultCode::$vname,
                        ResultCode::from(Err($name::$vname)),
                    );
                )*
                assert_eq!(
                    ResultCode::Success,
                    ResultCode::from(Result::<(), $name>::Ok(())),
                );
            }
        }
    };
}

define_error! {
    mod enable_interrupt_line_error {}
    /// Error type for [`Board::enable_interrupt_line`] and
    /// [`Board::disable_interrupt_line`].
    ///
    /// [`Board::enable_interrupt_line`]: crate::Board::enable_interrupt_line
    /// [`Board::disable_interrupt_line`]: crate::Board::disable_interrupt_line
    pub enum EnableInterruptLineError {
        /// The interrupt line is out of range.
        BadParam,
    }
}

define_error! {
    mod query_interrupt_line_error {}
    /// Error type for [`Board::is_interrupt_line_enabled`] and
    /// [`Board::is_interrupt_line_pending`].
    ///
    /// [`Board::is_interrupt_line_enabled`]: crate::Board::is_interrupt_line_enabled
    /// [`Board::is_interrupt_line_pending`]: crate::Board::is_interrupt_line_pending
    pub enum QueryInterruptLineError {
        /// The interrupt line is out of range.
        BadParam,
    }
}

define_error! {
    mod install_handler_error {}
    /// Error type for [`DispatchTable::install`] and
    /// [`DispatchTable::uninstall`].
    ///
    /// [`DispatchTable::install`]: crate::DispatchTable::install
    /// [`DispatchTable::uninstall`]: crate::DispatchTable::uninstall
    pub enum InstallHandlerError {
        /// The interrupt line is out of range.
        BadParam,
    }
}

define_error! {
    mod timer_config_error {}
    /// Error type for the timer configuration operations such as
    /// [`Board::run_in_interrupt_mode`].
    ///
    /// [`Board::run_in_interrupt_mode`]: crate::Board::run_in_interrupt_mode
    pub enum TimerConfigError {
        /// The timer index is out of range.
        BadParam,
    }
}

define_error! {
    mod delay_error {}
    /// Error type for [`Board::delay`].
    ///
    /// [`Board::delay`]: crate::Board::delay
    pub enum DelayError {
        /// The timer index is out of range.
        BadParam,
        /// The timer didn't raise its interrupt condition within the polling
        /// budget configured by [`PollMode::Bounded`].
        ///
        /// [`PollMode::Bounded`]: crate::PollMode::Bounded
        Timeout,
    }
}

impl From<TimerConfigError> for DelayError {
    #[inline]
    fn from(x: TimerConfigError) -> Self {
        match x {
            TimerConfigError::BadParam => Self::BadParam,
        }
    }
}

/// Returned by [`Board::dispatch`] when an interrupt line has been asserted
/// for too many consecutive dispatch passes.
///
/// This is a fatal condition. The handler of `line` did not clear its
/// interrupt source (e.g., a timer handler that doesn't read `EOI`), so the
/// hart will keep re-entering the trap handler forever.
///
/// [`Board::dispatch`]: crate::Board::dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StuckInterruptError {
    /// The offending interrupt line.
    pub line: InterruptNum,
    /// The number of consecutive dispatch passes during which `line` was
    /// observed asserted.
    pub passes: u32,
}

impl From<StuckInterruptError> for ResultCode {
    #[inline]
    fn from(_: StuckInterruptError) -> Self {
        Self::Unacknowledged
    }
}

impl fmt::Display for StuckInterruptError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "interrupt line {} stayed asserted for {} dispatch passes",
            self.line, self.passes
        )
    }
}

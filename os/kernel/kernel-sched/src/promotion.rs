//! Privilege a process and its threads execute at.

use core::fmt;
use kernel_info::cpu::{KERNEL_CS, KERNEL_DS, USER_CS, USER_DS};

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Promotion {
    /// Ring 0.
    #[default]
    Supervisor,
    /// Ring 3.
    User,
}

impl Promotion {
    /// Code segment selector a thread of this promotion starts with.
    #[must_use]
    pub const fn code_selector(self) -> u16 {
        match self {
            Self::Supervisor => KERNEL_CS,
            Self::User => USER_CS,
        }
    }

    /// Stack segment selector a thread of this promotion starts with.
    #[must_use]
    pub const fn stack_selector(self) -> u16 {
        match self {
            Self::Supervisor => KERNEL_DS,
            Self::User => USER_DS,
        }
    }
}

impl fmt::Display for Promotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Supervisor => "supervisor",
            Self::User => "user",
        })
    }
}

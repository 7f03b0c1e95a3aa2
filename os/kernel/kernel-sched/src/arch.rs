//! Architecture-specific context layout.

pub mod x86_64;

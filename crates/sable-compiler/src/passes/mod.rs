//! Binding passes.
//!
//! - [`registration`]: Pass 1 - declare every symbol of the unit
//! - [`completion`]: Pass 2 - resolve bases, signatures, and variable types; evaluate constants
//! - [`compilation`]: Pass 3 - bind function bodies and resolve calls

pub mod compilation;
pub mod completion;
pub mod registration;

pub use compilation::{CompilationOutput, CompilationPass};
pub use completion::CompletionPass;
pub use registration::{RegistrationOutput, RegistrationPass};

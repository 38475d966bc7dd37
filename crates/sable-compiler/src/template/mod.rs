//! Template instantiation.
//!
//! Class and function templates are instantiated lazily:
//!
//! - naming `Stack<int>` only creates the instance symbol, cached by its
//!   [`TypeId`](sable_core::TypeId), in the `Created` state
//! - the first use that needs members or layout binds it: the generic
//!   declaration is cloned into the instance scope with the parameters
//!   bound to the arguments, and the ordinary declaration visitor and class
//!   binder run over the clone
//! - virtual member bodies wait until a complete virtual table is needed
//!   (the type is constructed), unless the unit settings say otherwise
//! - function templates produce replicas keyed by the generic function and
//!   its arguments; replicas never join overload groups
//!
//! ## Components
//!
//! - [`instantiate_class`] / [`require_complete`]: class instances
//! - [`instantiate_function`] / [`instantiate_function_for_call`]: replicas
//! - [`complete_vtable`]: deferred virtual members
//! - [`complete_arguments`]: default type arguments

mod deduction;
mod function;
mod instantiation;
mod substitution;

pub use deduction::deduce_arguments;
pub use function::{instantiate_function, instantiate_function_for_call};
pub use instantiation::{
    complete_instance_of, complete_vtable, instantiate_class, is_instance_member,
    require_complete,
};
pub use substitution::{complete_arguments, install_bound_parameters};

//! Overload resolution for function calls.
//!
//! ## Algorithm
//!
//! 1. Expand candidates: generic functions are instantiated from explicit
//!    type arguments or by deduction; failures drop the candidate
//! 2. Filter by arity, counting the implicit receiver of member functions
//! 3. Find a conversion for every argument; one missing drops the candidate
//! 4. Keep the candidates no other candidate dominates; exactly one must
//!    remain, after preferring non-replicas over replicas on equal terms
//!
//! With [`ResolveFlags::DONT_THROW`] a call nothing fits, or more than one
//! candidate fits equally well, is `Ok(None)`, for speculative queries.
//! Failures inside a candidate, such as a broken replica, still surface.

mod candidates;
mod ranking;

pub use candidates::{expand_candidates, member_candidates, receiver_parameter};
pub use ranking::{Viable, dominates, find_best_match};

use bitflags::bitflags;
use tracing::trace;

use sable_core::{Result, SemanticError, Span, SymbolFlags};
use sable_registry::SymbolId;

use crate::context::BindContext;
use crate::conversion::{Argument, Conversion, ConversionMode, find_conversion};
use crate::template;

bitflags! {
    /// Options for one resolution.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ResolveFlags: u8 {
        /// Return `Ok(None)` instead of a no-viable or ambiguous error.
        const DONT_THROW = 1 << 0;
        /// Admit explicit conversions.
        const EXPLICIT = 1 << 1;
    }
}

/// One call to resolve.
#[derive(Debug, Clone)]
pub struct CallSite<'a> {
    /// Name used in diagnostics.
    pub name: &'a str,
    /// Visible functions under the name, generic ones included.
    pub candidates: &'a [SymbolId],
    /// Receiver of a member call.
    pub receiver: Option<Argument>,
    pub args: &'a [Argument],
    /// Explicit template arguments.
    pub type_args: &'a [SymbolId],
    pub span: Span,
    pub flags: ResolveFlags,
}

impl<'a> CallSite<'a> {
    pub fn new(name: &'a str, candidates: &'a [SymbolId], args: &'a [Argument], span: Span) -> Self {
        Self {
            name,
            candidates,
            receiver: None,
            args,
            type_args: &[],
            span,
            flags: ResolveFlags::empty(),
        }
    }

    pub fn with_receiver(mut self, receiver: Argument) -> Self {
        self.receiver = Some(receiver);
        self
    }

    pub fn with_type_args(mut self, type_args: &'a [SymbolId]) -> Self {
        self.type_args = type_args;
        self
    }

    pub fn with_flags(mut self, flags: ResolveFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// Result of successful overload resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct OverloadMatch {
    pub function: SymbolId,
    /// Conversion of the receiver to the implicit parameter.
    pub receiver_conversion: Option<Conversion>,
    /// Conversion of each argument, in order.
    pub conversions: Vec<Conversion>,
}

/// Resolve an overloaded call.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn resolve_overload(ctx: &mut BindContext, call: &CallSite<'_>) -> Result<Option<OverloadMatch>> {
    match resolve_inner(ctx, call) {
        Ok(found) => Ok(Some(found)),
        Err(SemanticError::NoViableOverload { .. } | SemanticError::AmbiguousOverload { .. })
            if call.flags.contains(ResolveFlags::DONT_THROW) =>
        {
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn resolve_inner(ctx: &mut BindContext, call: &CallSite<'_>) -> Result<OverloadMatch> {
    let mode = if call.flags.contains(ResolveFlags::EXPLICIT) {
        ConversionMode::Explicit
    } else {
        ConversionMode::Implicit
    };
    let candidates = expand_candidates(ctx, call)?;

    let mut viable = Vec::new();
    for &function in &candidates {
        if let Some(v) = evaluate_candidate(ctx, function, call, mode)? {
            viable.push(v);
        }
    }
    trace!(
        name = call.name,
        candidates = candidates.len(),
        viable = viable.len(),
        "overload candidates evaluated"
    );

    if viable.is_empty() {
        return Err(no_viable_error(ctx, call));
    }
    match find_best_match(ctx, viable) {
        Ok(best) => Ok(OverloadMatch {
            function: best.function,
            receiver_conversion: best.receiver,
            conversions: best.conversions,
        }),
        Err(tied) => Err(ambiguous_error(ctx, call, &tied)),
    }
}

/// Conversions for every argument of `function`, or `None` if not viable.
fn evaluate_candidate(
    ctx: &mut BindContext,
    function: SymbolId,
    call: &CallSite<'_>,
    mode: ConversionMode,
) -> Result<Option<Viable>> {
    let symbol = ctx.table.symbol(function);
    let Some(data) = symbol.as_function() else {
        return Ok(None);
    };
    if data.parameters.len() != call.args.len() {
        return Ok(None);
    }
    let replica = symbol.has(SymbolFlags::REPLICA);
    let parameters = data.parameters.clone();

    let receiver = match (call.receiver, receiver_parameter(&mut ctx.table, function)?) {
        (Some(arg), Some(param)) => match find_conversion(&mut ctx.table, &arg, param, mode)? {
            Some(c) => Some(c),
            None => return Ok(None),
        },
        _ => None,
    };

    let mut conversions = Vec::with_capacity(parameters.len());
    for (arg, param) in call.args.iter().zip(&parameters) {
        let Some(param_ty) = ctx.table.symbol(*param).value_type() else {
            return Ok(None);
        };
        // Instance conversions are only registered once the instance is bound.
        template::complete_instance_of(ctx, arg.ty, call.span)?;
        template::complete_instance_of(ctx, param_ty, call.span)?;
        match find_conversion(&mut ctx.table, arg, param_ty, mode)? {
            Some(c) => conversions.push(c),
            None => {
                trace!(candidate = %ctx.table.full_name(function), "not viable");
                return Ok(None);
            }
        }
    }
    Ok(Some(Viable {
        function,
        replica,
        receiver,
        conversions,
    }))
}

fn describe_arguments(ctx: &BindContext, args: &[Argument]) -> String {
    args.iter()
        .map(|a| ctx.table.type_name(a.ty))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `name(T1, T2)` for diagnostics.
pub fn describe_function(ctx: &BindContext, function: SymbolId) -> String {
    let table = &ctx.table;
    let params = table
        .symbol(function)
        .as_function()
        .map(|f| {
            f.parameters
                .iter()
                .filter_map(|p| table.symbol(*p).value_type())
                .map(|t| table.type_name(t))
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default();
    format!("{}({})", table.full_name(function), params)
}

fn no_viable_error(ctx: &BindContext, call: &CallSite<'_>) -> SemanticError {
    SemanticError::NoViableOverload {
        name: call.name.to_string(),
        arguments: describe_arguments(ctx, call.args),
        candidate_spans: call
            .candidates
            .iter()
            .map(|c| ctx.table.symbol(*c).span)
            .collect(),
        span: call.span,
    }
}

fn ambiguous_error(ctx: &BindContext, call: &CallSite<'_>, tied: &[Viable]) -> SemanticError {
    SemanticError::AmbiguousOverload {
        name: call.name.to_string(),
        candidates: tied.iter().map(|v| describe_function(ctx, v.function)).collect(),
        candidate_spans: tied
            .iter()
            .map(|v| ctx.table.symbol(v.function).span)
            .collect(),
        span: call.span,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::{CompletionPass, RegistrationPass};
    use sable_core::UnitSettings;
    use sable_registry::BuiltinType;
    use sable_syntax::{Block, FunctionDecl, Item, SourceFile, TypeExpr};

    /// `f(int, double)` and `f(double, int)`.
    fn crossed() -> (BindContext, Vec<SymbolId>) {
        let f = |a: &str, b: &str| {
            Item::Function(
                FunctionDecl::new("f", TypeExpr::named("void"))
                    .param("a", TypeExpr::named(a))
                    .param("b", TypeExpr::named(b))
                    .body(Block::default()),
            )
        };
        let mut ctx = BindContext::new(UnitSettings::default());
        let files = [SourceFile::new(0, vec![f("int", "double"), f("double", "int")])];
        let output = RegistrationPass::new(&mut ctx).run(&files);
        assert!(output.errors.is_empty(), "{:?}", output.errors);
        CompletionPass::new(&mut ctx).run(&files, &output.declared).unwrap();
        let group = ctx.table.lookup_qualified(&sable_core::QualifiedName::parse("f")).unwrap();
        let candidates = ctx.table.group_functions(group).to_vec();
        (ctx, candidates)
    }

    #[test]
    fn dont_throw_turns_ambiguity_into_none() {
        let (mut ctx, candidates) = crossed();
        let int = ctx.table.builtin(BuiltinType::Int);
        let args = [Argument::value(int), Argument::value(int)];
        let site = CallSite::new("f", &candidates, &args, Span::default());
        assert!(matches!(
            resolve_overload(&mut ctx, &site),
            Err(SemanticError::AmbiguousOverload { .. })
        ));
        let quiet = site.with_flags(ResolveFlags::DONT_THROW);
        assert_eq!(resolve_overload(&mut ctx, &quiet).unwrap(), None);
    }

    #[test]
    fn dont_throw_turns_no_viable_into_none() {
        let (mut ctx, candidates) = crossed();
        let int = ctx.table.builtin(BuiltinType::Int);
        let args = [Argument::value(int)];
        let site = CallSite::new("f", &candidates, &args, Span::default());
        assert!(matches!(
            resolve_overload(&mut ctx, &site),
            Err(SemanticError::NoViableOverload { .. })
        ));
        let quiet = site.with_flags(ResolveFlags::DONT_THROW);
        assert_eq!(resolve_overload(&mut ctx, &quiet).unwrap(), None);
    }

    #[test]
    fn dont_throw_still_selects_a_unique_best() {
        let (mut ctx, candidates) = crossed();
        let (int, double) = (ctx.table.builtin(BuiltinType::Int), ctx.table.builtin(BuiltinType::Double));
        let args = [Argument::value(double), Argument::value(int)];
        let site = CallSite::new("f", &candidates, &args, Span::default()).with_flags(ResolveFlags::DONT_THROW);
        let found = resolve_overload(&mut ctx, &site).unwrap().unwrap();
        assert_eq!(found.function, candidates[1]);
    }
}

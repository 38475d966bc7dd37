//! Dominance-based ranking for overload resolution.
//!
//! Candidate A dominates candidate B when A's conversion is the same or
//! better for every argument (receiver included) and strictly better for
//! at least one. Conversions compare by rank, then by distance within the
//! rank. Candidates with incomparable conversions, such as a user-defined
//! conversion on one argument against a standard one on another, tie.

use std::cmp::Ordering;

use sable_registry::SymbolId;

use crate::context::BindContext;
use crate::conversion::Conversion;

/// A candidate that accepts every argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Viable {
    pub function: SymbolId,
    /// Produced by template instantiation.
    pub replica: bool,
    pub receiver: Option<Conversion>,
    pub conversions: Vec<Conversion>,
}

impl Viable {
    fn all_conversions(&self) -> impl Iterator<Item = Option<&Conversion>> {
        std::iter::once(self.receiver.as_ref()).chain(self.conversions.iter().map(Some))
    }
}

/// Whether `a` dominates `b`.
pub fn dominates(a: &Viable, b: &Viable) -> bool {
    let mut strictly_better = false;
    for (ca, cb) in a.all_conversions().zip(b.all_conversions()) {
        let order = match (ca, cb) {
            (Some(x), Some(y)) => x.compare(y),
            _ => Ordering::Equal,
        };
        match order {
            Ordering::Greater => return false,
            Ordering::Less => strictly_better = true,
            Ordering::Equal => {}
        }
    }
    strictly_better
}

fn same_conversions(a: &Viable, b: &Viable) -> bool {
    a.all_conversions()
        .zip(b.all_conversions())
        .all(|(x, y)| match (x, y) {
            (Some(x), Some(y)) => x.compare(y) == Ordering::Equal,
            _ => true,
        })
}

/// The unique best candidate, or the tied maximal set.
pub fn find_best_match(_ctx: &BindContext, viable: Vec<Viable>) -> Result<Viable, Vec<Viable>> {
    let mut maximal: Vec<Viable> = viable
        .iter()
        .filter(|candidate| !viable.iter().any(|other| dominates(other, candidate)))
        .cloned()
        .collect();

    if maximal.len() == 1 {
        if let Some(best) = maximal.pop() {
            return Ok(best);
        }
    }

    // A non-replica beats a replica with identical conversions.
    let all_same = maximal
        .iter()
        .all(|candidate| same_conversions(candidate, &maximal[0]));
    if all_same {
        let originals: Vec<&Viable> = maximal.iter().filter(|c| !c.replica).collect();
        if originals.len() == 1 && originals.len() < maximal.len() {
            return Ok(originals[0].clone());
        }
    }
    Err(maximal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::ConversionKind;
    use sable_core::UnitSettings;
    use sable_registry::{ConversionRank, SymbolTable};

    fn conv(rank: ConversionRank, distance: u32) -> Conversion {
        Conversion::new(rank, distance, ConversionKind::None)
    }

    fn viable(table: &SymbolTable, n: u32, replica: bool, convs: Vec<Conversion>) -> Viable {
        let function = table.builtin(sable_registry::BuiltinType::ALL[n as usize]);
        Viable {
            function,
            replica,
            receiver: None,
            conversions: convs,
        }
    }

    #[test]
    fn identity_dominates_standard() {
        let ctx = BindContext::new(UnitSettings::default());
        let a = viable(&ctx.table, 1, false, vec![conv(ConversionRank::Identity, 0)]);
        let b = viable(&ctx.table, 2, false, vec![conv(ConversionRank::Standard, 1)]);
        assert!(dominates(&a, &b));
        assert!(!dominates(&b, &a));
        let best = find_best_match(&ctx, vec![b, a.clone()]).unwrap();
        assert_eq!(best.function, a.function);
    }

    #[test]
    fn shorter_distance_wins_within_rank() {
        let ctx = BindContext::new(UnitSettings::default());
        let near = viable(&ctx.table, 1, false, vec![conv(ConversionRank::DerivedBase, 1)]);
        let far = viable(&ctx.table, 2, false, vec![conv(ConversionRank::DerivedBase, 2)]);
        let best = find_best_match(&ctx, vec![far, near.clone()]).unwrap();
        assert_eq!(best.function, near.function);
    }

    #[test]
    fn crossed_conversions_are_ambiguous() {
        let ctx = BindContext::new(UnitSettings::default());
        let a = viable(
            &ctx.table,
            1,
            false,
            vec![conv(ConversionRank::UserDefined, 0), conv(ConversionRank::Identity, 0)],
        );
        let b = viable(
            &ctx.table,
            2,
            false,
            vec![conv(ConversionRank::Identity, 0), conv(ConversionRank::Standard, 1)],
        );
        let c = viable(
            &ctx.table,
            3,
            false,
            vec![conv(ConversionRank::UserDefined, 0), conv(ConversionRank::UserDefined, 0)],
        );
        let tied = find_best_match(&ctx, vec![a.clone(), b.clone(), c]).unwrap_err();
        assert_eq!(tied, vec![a, b]);
    }

    #[test]
    fn original_beats_replica_on_equal_terms() {
        let ctx = BindContext::new(UnitSettings::default());
        let original = viable(&ctx.table, 1, false, vec![conv(ConversionRank::Identity, 0)]);
        let replica = viable(&ctx.table, 2, true, vec![conv(ConversionRank::Identity, 0)]);
        let best = find_best_match(&ctx, vec![replica, original.clone()]).unwrap();
        assert_eq!(best.function, original.function);
    }
}

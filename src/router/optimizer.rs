// Split optimizer - the marginal-return dynamic program
// Given the eligible sources' return curves and a part count, finds the
// output-maximizing allocation of units to sources. Pure computation; the
// quote engine has already evaluated every curve point it needs
//
// Numan Thabit 2026 Aug

use crate::config::AppConfig;
use crate::registry::SourceRegistry;
use crate::router::quotes::ReturnCurve;

/// Optimizer output: the per-source unit allocation (canonical registry
/// order, one entry per registered source) and the quoted total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizeResult {
    pub distribution: Vec<u64>,
    pub out_amount: u128,
}

impl OptimizeResult {
    pub fn zero(source_count: usize) -> Self {
        Self { distribution: vec![0; source_count], out_amount: 0 }
    }
}

/// Maximize total estimated output across the given curves.
///
/// Because each curve is concave, extending whichever source offers the
/// largest next marginal unit reaches the DP optimum `best[parts]` without
/// materializing the full table; each source's next marginal is
/// re-read only when that source is chosen.
///
/// Ties resolve to the source with fewer allocated units, then to the
/// earlier canonical position. The former keeps identical curves splitting
/// evenly instead of piling onto the first source; both keep the result
/// deterministic.
pub fn find_best_distribution(
    source_count: usize,
    parts: u32,
    curves: &[ReturnCurve],
) -> OptimizeResult {
    solve(source_count, parts, curves, None)
}

/// Gas-aware variant: `penalties[i]` (dest-token units) is charged against
/// curve `i`'s first unit, steering the split toward fewer venues when the
/// marginal gain is small; the quoted total is net of the penalties of
/// venues actually used.
pub fn find_best_distribution_with_gas(
    source_count: usize,
    parts: u32,
    curves: &[ReturnCurve],
    penalties: &[u128],
) -> OptimizeResult {
    solve(source_count, parts, curves, Some(penalties))
}

/// Per-curve fixed penalties for gas-aware quoting: the family's
/// configured gas units times the caller's dest-token gas price.
pub fn venue_penalties(
    curves: &[ReturnCurve],
    registry: &SourceRegistry,
    config: &AppConfig,
    gas_price: u128,
) -> Vec<u128> {
    curves
        .iter()
        .map(|curve| {
            let family = registry.sources()[curve.source_index].family;
            (config.gas_units_for(family) as u128).saturating_mul(gas_price)
        })
        .collect()
}

fn solve(
    source_count: usize,
    parts: u32,
    curves: &[ReturnCurve],
    penalties: Option<&[u128]>,
) -> OptimizeResult {
    let mut result = OptimizeResult::zero(source_count);
    if parts == 0 || curves.is_empty() {
        return result;
    }
    let penalty = |curve_index: usize| -> u128 {
        penalties.map_or(0, |p| p.get(curve_index).copied().unwrap_or(0))
    };

    let mut allocated = vec![0usize; curves.len()];
    for _ in 0..parts {
        let mut best: Option<(u128, usize)> = None;
        for (curve_index, curve) in curves.iter().enumerate() {
            let units = allocated[curve_index];
            if units + 1 >= curve.points.len() {
                continue;
            }
            let gross = curve.points[units + 1].saturating_sub(curve.points[units]);
            // a fixed cost gates entry: the first unit must clear it
            let marginal = if units == 0 {
                gross.saturating_sub(penalty(curve_index))
            } else {
                gross
            };
            if marginal == 0 {
                continue;
            }
            best = match best {
                None => Some((marginal, curve_index)),
                Some((best_marginal, best_index)) => {
                    if marginal > best_marginal
                        || (marginal == best_marginal && units < allocated[best_index])
                    {
                        Some((marginal, curve_index))
                    } else {
                        Some((best_marginal, best_index))
                    }
                }
            };
        }
        // every remaining marginal is zero: concavity says it stays zero
        let Some((_, chosen)) = best else { break };
        allocated[chosen] += 1;
    }

    let mut total: u128 = 0;
    for (curve_index, curve) in curves.iter().enumerate() {
        let units = allocated[curve_index];
        if units == 0 {
            continue;
        }
        total += curve.points[units].saturating_sub(penalty(curve_index));
        result.distribution[curve.source_index] = units as u64;
    }
    result.out_amount = total;
    result
}

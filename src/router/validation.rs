// Pre-trade validation module
// Validates a caller-supplied distribution against the current registry
// and the call's capability mask before any venue is touched
//
// Numan Thabit 2026 Aug

use crate::errors::SwapError;
use crate::mask::CapabilityMask;
use crate::registry::SourceRegistry;

/// Accumulated validation findings; structural problems are reported
/// together instead of one at a time.
#[derive(Debug, Default)]
pub struct ValidationResult {
    errors: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, error: String) {
        self.errors.push(error);
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result(self) -> Result<(), SwapError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(SwapError::InvalidDistribution(self.errors.join("; ")))
        }
    }
}

/// Fail-fast distribution check for the executing plane.
///
/// Rejects length mismatches, allocations to sources the supplied mask
/// disables, and unit sums above the part bound, all before any external
/// call. A structurally valid but all-zero distribution is `NoLiquidity`:
/// the executing form refuses to proceed on it.
pub fn validate_distribution(
    registry: &SourceRegistry,
    mask: &CapabilityMask,
    distribution: &[u64],
    max_parts: u32,
) -> Result<(), SwapError> {
    if distribution.len() != registry.len() {
        return Err(SwapError::InvalidDistribution(format!(
            "distribution length {} does not match registry size {}",
            distribution.len(),
            registry.len()
        )));
    }

    let mut result = ValidationResult::new();
    let total_units: u128 = distribution.iter().map(|units| *units as u128).sum();
    if total_units > max_parts as u128 {
        result.add_error(format!(
            "allocated {total_units} units, above the {max_parts}-part bound"
        ));
    }
    for (source, units) in registry.sources().iter().zip(distribution) {
        if *units > 0 && !mask.allows(source) {
            result.add_error(format!("allocation to disabled source {}", source.id));
        }
    }
    result.into_result()?;

    if total_units == 0 {
        return Err(SwapError::NoLiquidity);
    }
    Ok(())
}

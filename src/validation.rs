//! Request-field validation for the HTTP layer.
//! Keeps obviously malformed input out of the engine with actionable messages.

use anyhow::{anyhow, Result};

use crate::constants::{MAX_COLUMN_NAME_LENGTH, MAX_MC_DRAWS};

/// Validate a column-name request field (assignment column, KPI, test-ID
/// column). The name must be non-empty, bounded, and printable.
pub fn validate_column_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(anyhow!("column name cannot be empty"));
    }

    if name.len() > MAX_COLUMN_NAME_LENGTH {
        return Err(anyhow!(
            "column name too long: {} chars (max: {})",
            name.len(),
            MAX_COLUMN_NAME_LENGTH
        ));
    }

    if name.chars().any(|c| c.is_control()) {
        return Err(anyhow!("column name contains control characters"));
    }

    Ok(())
}

/// Validate the raw CSV payload before parsing.
pub fn validate_csv_payload(csv: &str, max_bytes: usize) -> Result<()> {
    if csv.trim().is_empty() {
        return Err(anyhow!("csv payload is empty"));
    }

    if csv.len() > max_bytes {
        return Err(anyhow!(
            "csv payload too large: {} bytes (max: {})",
            csv.len(),
            max_bytes
        ));
    }

    Ok(())
}

/// Validate a per-request Monte Carlo draw count.
pub fn validate_draws(draws: usize) -> Result<()> {
    if draws == 0 {
        return Err(anyhow!("draws must be greater than 0"));
    }

    if draws > MAX_MC_DRAWS {
        return Err(anyhow!("draws too large: {draws} (max: {MAX_MC_DRAWS})"));
    }

    Ok(())
}

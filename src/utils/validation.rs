//! Centralized validation of name batches and taxon id lists.

use crate::core::types::TaxonId;

/// Maximum number of names in a single query (DOS protection)
pub const MAX_NAMES_PER_QUERY: usize = 10_000;

/// Maximum length of a single name, in bytes
pub const MAX_NAME_LENGTH: usize = 1024;

/// Batches larger than this are not matched approximately
pub const MAX_APPROX_NAMES: usize = 1_000;

/// Maximum number of ids in a single LICA request
pub const MAX_LICA_IDS: usize = 10_000;

/// Input validation error types
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("No names provided")]
    NoNames,
    #[error("Too many names: {0} exceeds maximum of {MAX_NAMES_PER_QUERY}")]
    TooManyNames(usize),
    #[error("Name at position {0} exceeds {MAX_NAME_LENGTH} bytes")]
    NameTooLong(usize),
    #[error("Name at position {0} contains control characters")]
    InvalidName(usize),
    #[error(
        "Approximate matching is limited to {MAX_APPROX_NAMES} names; got {0}. \
         Disable approximate matching or split the query"
    )]
    TooManyForApproximate(usize),
    #[error("No taxon ids provided")]
    NoIds,
    #[error("Too many taxon ids: {0} exceeds maximum of {MAX_LICA_IDS}")]
    TooManyIds(usize),
}

/// Validate and normalise a batch of raw names.
///
/// Names are trimmed and repeated names dropped, keeping first occurrences in
/// order. Blank names are kept; they resolve as unmatched. An empty batch is
/// valid and yields an empty result.
///
/// # Errors
///
/// Returns a [`ValidationError`] if the batch or one of its names exceeds the
/// size limits, or a name contains control characters.
///
/// # Examples
///
/// ```
/// use tnrs_solver::utils::validation::normalize_names;
///
/// let names = normalize_names(&[" Quercus ", "Quercus", "Morus"]).unwrap();
/// assert_eq!(names, vec!["Quercus", "Morus"]);
/// ```
pub fn normalize_names<S: AsRef<str>>(names: &[S]) -> Result<Vec<String>, ValidationError> {
    if names.len() > MAX_NAMES_PER_QUERY {
        return Err(ValidationError::TooManyNames(names.len()));
    }

    let mut normalized: Vec<String> = Vec::with_capacity(names.len());
    let mut seen = std::collections::HashSet::with_capacity(names.len());
    for (position, raw) in names.iter().enumerate() {
        let raw = raw.as_ref();
        if raw.len() > MAX_NAME_LENGTH {
            return Err(ValidationError::NameTooLong(position));
        }
        let name = raw.trim();
        if name.chars().any(char::is_control) {
            return Err(ValidationError::InvalidName(position));
        }
        if seen.insert(name.to_string()) {
            normalized.push(name.to_string());
        }
    }
    Ok(normalized)
}

/// Check that a batch is small enough for approximate matching
///
/// # Errors
///
/// Returns [`ValidationError::TooManyForApproximate`] above [`MAX_APPROX_NAMES`].
pub fn check_approximate_limit(count: usize) -> Result<(), ValidationError> {
    if count > MAX_APPROX_NAMES {
        Err(ValidationError::TooManyForApproximate(count))
    } else {
        Ok(())
    }
}

/// Validate the id list of a LICA request
///
/// # Errors
///
/// Returns a [`ValidationError`] for empty or oversized lists.
pub fn validate_lica_ids(ids: &[TaxonId]) -> Result<(), ValidationError> {
    if ids.is_empty() {
        return Err(ValidationError::NoIds);
    }
    if ids.len() > MAX_LICA_IDS {
        return Err(ValidationError::TooManyIds(ids.len()));
    }
    Ok(())
}

/// Parse names from text, one per line; blank lines and `#` comments are skipped
#[must_use]
pub fn parse_name_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(ToString::to_string)
        .collect()
}

//! Centralized validation helpers for user-supplied labels and thresholds.

/// Longest label accepted as part of an output file name
pub const MAX_LABEL_LENGTH: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Empty label provided")]
    EmptyLabel,
    #[error("Label too long: exceeds {MAX_LABEL_LENGTH} characters")]
    LabelTooLong,
    #[error("Invalid label '{0}': only letters, digits, '.', '-' and '_' are allowed")]
    InvalidLabel(String),
    #[error("Invalid fraction '{0}': expected a number between 0 and 1")]
    InvalidFraction(String),
}

/// Validate a dataset or accession label that becomes part of a file name.
///
/// Labels are never rewritten: a label that would need sanitizing is
/// rejected so two inputs cannot collapse onto the same output file.
///
/// # Examples
///
/// ```
/// use pgs_match::utils::validation::validate_label;
///
/// assert!(validate_label("PGS000001").is_ok());
/// assert!(validate_label("cohort_hg38.v2").is_ok());
/// assert!(validate_label("../etc").is_err());
/// ```
///
/// # Errors
///
/// Returns `ValidationError::EmptyLabel` for an empty label,
/// `ValidationError::LabelTooLong` past [`MAX_LABEL_LENGTH`], or
/// `ValidationError::InvalidLabel` for path separators, traversal, hidden
/// names, or any other character outside `[A-Za-z0-9._-]`.
pub fn validate_label(label: &str) -> Result<&str, ValidationError> {
    if label.trim().is_empty() {
        return Err(ValidationError::EmptyLabel);
    }

    if label.len() > MAX_LABEL_LENGTH {
        return Err(ValidationError::LabelTooLong);
    }

    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_');
    if label.contains("..") || label.starts_with('.') || !label.chars().all(allowed) {
        return Err(ValidationError::InvalidLabel(label.to_string()));
    }

    Ok(label)
}

/// Parse a fraction in `[0, 1]`, for use as a clap value parser.
///
/// # Errors
///
/// Returns `ValidationError::InvalidFraction` for non-numbers and values
/// outside the unit interval.
pub fn parse_fraction(raw: &str) -> Result<f64, ValidationError> {
    match raw.trim().parse::<f64>() {
        Ok(value) if (0.0..=1.0).contains(&value) => Ok(value),
        _ => Err(ValidationError::InvalidFraction(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_label_safe() {
        assert_eq!(validate_label("PGS000001"), Ok("PGS000001"));
        assert!(validate_label("my-cohort_2024.v1").is_ok());
    }

    #[test]
    fn test_validate_label_dangerous() {
        // Directory traversal attempts
        assert!(validate_label("../etc/passwd").is_err());
        assert!(validate_label("..\\windows").is_err());
        assert!(validate_label("a/b").is_err());

        // Hidden files, whitespace and control characters
        assert!(validate_label(".hidden").is_err());
        assert!(validate_label("cohort 1").is_err());
        assert!(validate_label("test\0").is_err());

        assert_eq!(validate_label("   "), Err(ValidationError::EmptyLabel));
        assert_eq!(
            validate_label(&"a".repeat(MAX_LABEL_LENGTH + 1)),
            Err(ValidationError::LabelTooLong)
        );
    }

    #[test]
    fn test_parse_fraction() {
        assert_eq!(parse_fraction("0.75"), Ok(0.75));
        assert_eq!(parse_fraction("0"), Ok(0.0));
        assert_eq!(parse_fraction("1"), Ok(1.0));
        assert!(parse_fraction("1.5").is_err());
        assert!(parse_fraction("-0.1").is_err());
        assert!(parse_fraction("NaN").is_err());
        assert!(parse_fraction("most").is_err());
    }
}

use std::cmp::Ordering;

use crate::core::variant::FormatError;

/// Normalize a chromosome label to NCBI-style naming.
///
/// Strips a leading `chr` (any case), uppercases sex and mitochondrial
/// chromosomes, and maps `M` to `MT`, so `chr1`, `CHR1` and `1` all become `1`.
///
/// # Errors
///
/// Returns `FormatError::MissingField` if the label is empty after trimming.
pub fn normalize_chromosome(raw: &str) -> Result<String, FormatError> {
    let trimmed = raw.trim();
    let stripped = match trimmed.get(..3) {
        Some(prefix) if trimmed.len() > 3 && prefix.eq_ignore_ascii_case("chr") => &trimmed[3..],
        _ => trimmed,
    };

    if stripped.is_empty() {
        return Err(FormatError::MissingField("chromosome"));
    }

    let upper = stripped.to_ascii_uppercase();
    let name = match upper.as_str() {
        "X" | "Y" | "XY" | "MT" => upper,
        "M" => "MT".to_string(),
        _ => stripped.to_string(),
    };
    Ok(name)
}

/// Rank used to order chromosomes: autosomes numerically, then X, Y, XY, MT,
/// then any other label
fn chromosome_rank(name: &str) -> (u8, u32) {
    if let Ok(n) = name.parse::<u32>() {
        return (0, n);
    }
    match name {
        "X" => (1, 0),
        "Y" => (2, 0),
        "XY" => (3, 0),
        "MT" => (4, 0),
        _ => (5, 0),
    }
}

/// Compare two normalized chromosome labels in karyotype order
#[must_use]
pub fn compare_chromosomes(a: &str, b: &str) -> Ordering {
    chromosome_rank(a)
        .cmp(&chromosome_rank(b))
        .then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_chromosome() {
        assert_eq!(normalize_chromosome("chr1").unwrap(), "1");
        assert_eq!(normalize_chromosome("CHR22").unwrap(), "22");
        assert_eq!(normalize_chromosome("7").unwrap(), "7");
        assert_eq!(normalize_chromosome("chrx").unwrap(), "X");
        assert_eq!(normalize_chromosome("chrM").unwrap(), "MT");
        assert_eq!(normalize_chromosome("MT").unwrap(), "MT");
        assert_eq!(normalize_chromosome(" chrY ").unwrap(), "Y");
        assert_eq!(normalize_chromosome("chr6_GL000250v2_alt").unwrap(), "6_GL000250v2_alt");
        assert!(normalize_chromosome("").is_err());
        assert!(normalize_chromosome("   ").is_err());
    }

    #[test]
    fn test_normalize_keeps_bare_chr_label() {
        // A contig literally named "chr" has nothing to strip
        assert_eq!(normalize_chromosome("chr").unwrap(), "chr");
    }

    #[test]
    fn test_compare_chromosomes() {
        let mut chroms = vec!["X", "10", "MT", "2", "Y", "1", "GL000192.1", "22"];
        chroms.sort_by(|a, b| compare_chromosomes(a, b));
        assert_eq!(chroms, vec!["1", "2", "10", "22", "X", "Y", "MT", "GL000192.1"]);
    }
}

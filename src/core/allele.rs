//! Allele normalization and strand helpers.

/// Tokens treated as a missing value in any allele column
const MISSING_TOKENS: [&str; 8] = ["", ".", "NA", "N/A", "NAN", "NONE", "NULL", "0"];

/// Normalize a raw allele field.
///
/// Alleles are trimmed and uppercased. Missing-value tokens become `None` so an
/// absent allele is never confused with an empty string. `0` is the plink
/// convention for a missing allele.
#[must_use]
pub fn normalize_allele(raw: &str) -> Option<String> {
    let allele = raw.trim().to_ascii_uppercase();
    if MISSING_TOKENS.contains(&allele.as_str()) {
        None
    } else {
        Some(allele)
    }
}

/// True when the allele is a non-empty run of A/C/G/T
#[must_use]
pub fn is_dna(allele: &str) -> bool {
    !allele.is_empty() && allele.bytes().all(|b| matches!(b, b'A' | b'C' | b'G' | b'T'))
}

/// Complement every base of a DNA allele (A<->T, C<->G).
///
/// Alleles that are not plain DNA (symbolic indel markers, HLA alleles) are
/// returned unchanged.
#[must_use]
pub fn complement(allele: &str) -> String {
    if !is_dna(allele) {
        return allele.to_string();
    }
    allele
        .chars()
        .map(|c| match c {
            'A' => 'T',
            'T' => 'A',
            'C' => 'G',
            _ => 'C',
        })
        .collect()
}

/// True when the pair cannot be strand-resolved from the alleles alone
/// (A/T, C/G, or longer palindromes such as AT/TA).
#[must_use]
pub fn is_strand_ambiguous(a: &str, b: &str) -> bool {
    is_dna(a) && is_dna(b) && complement(a) == b
}

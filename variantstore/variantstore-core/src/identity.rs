//! Variant identity derivation.
//!
//! The variant identifier is a pure function of the variant's coordinates
//! and alleles. It is used both as the columnar record's natural key and as
//! the search document's unique id, which is what makes the two sinks
//! reconcilable by identifier join.

/// Derives the canonical variant identifier from chromosome, 1-based
/// position, reference allele and alternate allele.
///
/// The identifier is `"{chrom}:{pos}:{ref}>{alt}"` lowercased, so the same
/// variant always yields the same key regardless of input casing.
///
/// # Example
///
/// ```
/// use variantstore_core::derive_variant_id;
///
/// assert_eq!(derive_variant_id("chr1", 100, "A", "T"), "chr1:100:a>t");
/// ```
pub fn derive_variant_id(chrom: &str, pos: u32, ref_allele: &str, alt_allele: &str) -> String {
    format!("{}:{}:{}>{}", chrom, pos, ref_allele, alt_allele).to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_is_deterministic() {
        assert_eq!(
            derive_variant_id("chr1", 100, "A", "T"),
            derive_variant_id("chr1", 100, "A", "T")
        );
    }

    #[test]
    fn test_derive_is_case_insensitive() {
        assert_eq!(
            derive_variant_id("CHR1", 100, "A", "T"),
            derive_variant_id("chr1", 100, "a", "t")
        );
    }

    #[test]
    fn test_derive_format() {
        assert_eq!(derive_variant_id("chrX", 1234, "AC", "G"), "chrx:1234:ac>g");
    }
}

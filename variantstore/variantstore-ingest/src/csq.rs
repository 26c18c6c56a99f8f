//! Annotation schema extraction from the VCF header.
//!
//! Annotation values are pipe-delimited and only positionally meaningful:
//! the header's CSQ INFO declaration carries the layout as a
//! `Format: a|b|c` token inside its description. Without that declaration
//! the run cannot proceed.

use variantstore_core::model::{CsqMap, CSQ_KEY};
use variantstore_core::{Result, VariantStoreError};

use noodles_vcf as vcf;

/// The ordered annotation sub-field names declared by the source header.
#[derive(Debug, Clone, PartialEq)]
pub struct CsqSchema {
    fields: Vec<String>,
}

impl CsqSchema {
    /// Extracts the annotation layout from a parsed VCF header.
    ///
    /// # Errors
    ///
    /// Returns [`VariantStoreError::MalformedHeader`] when the header has
    /// no CSQ INFO declaration or the declaration carries no
    /// `Format:` token.
    pub fn from_header(header: &vcf::Header) -> Result<Self> {
        let info = header.infos().get(CSQ_KEY).ok_or_else(|| {
            VariantStoreError::MalformedHeader(format!("no {} INFO declaration", CSQ_KEY))
        })?;
        Self::from_description(info.description())
    }

    /// Parses the `Format: a|b|c` token out of an INFO description.
    pub fn from_description(description: &str) -> Result<Self> {
        let tail = description.split("Format: ").nth(1).ok_or_else(|| {
            VariantStoreError::MalformedHeader(format!(
                "{} declaration has no Format token: {:?}",
                CSQ_KEY, description
            ))
        })?;
        // The token runs until the closing quote or angle bracket.
        let layout = tail
            .split(|c| c == '"' || c == '>')
            .next()
            .unwrap_or(tail)
            .trim();
        let fields: Vec<String> = layout
            .split('|')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if fields.is_empty() {
            return Err(VariantStoreError::MalformedHeader(format!(
                "{} Format token declares no fields",
                CSQ_KEY
            )));
        }
        Ok(CsqSchema { fields })
    }

    /// The declared field names, in order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Zips one pipe-delimited annotation entry positionally against the
    /// declared field order; missing trailing values map to `None`.
    pub fn zip_entry(&self, entry: &str) -> CsqMap {
        let mut values = entry.split('|');
        CsqMap(
            self.fields
                .iter()
                .map(|name| (name.clone(), values.next().map(str::to_string)))
                .collect(),
        )
    }

    /// A map with every declared field absent, for records without an
    /// annotation blob.
    pub fn empty_map(&self) -> CsqMap {
        CsqMap(
            self.fields
                .iter()
                .map(|name| (name.clone(), None))
                .collect(),
        )
    }
}

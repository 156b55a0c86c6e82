//! Request-to-dataset schema mapping.
//!
//! Each variant has one static `SchemaMapping`: a list of `(request, native)`
//! renames and the request fields its models never see. Fields that appear
//! in neither list pass through unchanged.
use crate::data_handling::{DatasetVariant, LeadRecord};

/// Fields that choose the model and never reach a feature vector.
pub const SELECTOR_FIELDS: [&str; 2] = ["dataset_type", "model_type"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldAlias {
    pub request: &'static str,
    pub native: &'static str,
}

const fn alias(request: &'static str, native: &'static str) -> FieldAlias {
    FieldAlias { request, native }
}

/// The bank dataset spells its macro-economic indicators with dots.
const ECONOMIC_INDICATORS: [FieldAlias; 4] = [
    alias("emp_var_rate", "emp.var.rate"),
    alias("cons_price_idx", "cons.price.idx"),
    alias("cons_conf_idx", "cons.conf.idx"),
    alias("nr_employed", "nr.employed"),
];

const ENGAGEMENT_FIELDS: [FieldAlias; 4] = [
    alias("engagement_level", "engagement"),
    alias("website_visits", "visits"),
    alias("time_spent", "time_on_site"),
    alias("content_downloaded", "downloads"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenamePolicy {
    /// Rename only when the native spelling is not already present.
    KeepExisting,
    /// The renamed value replaces any native value.
    Overwrite,
}

#[derive(Debug)]
pub struct SchemaMapping {
    pub variant: DatasetVariant,
    pub renames: &'static [FieldAlias],
    pub dropped: &'static [&'static str],
    pub policy: RenamePolicy,
}

static BANK: SchemaMapping = SchemaMapping {
    variant: DatasetVariant::Bank,
    renames: &ECONOMIC_INDICATORS,
    dropped: &[
        "name",
        "email",
        "phone",
        "company",
        "source",
        "budget",
        "authority",
        "need",
        "timeframe",
        "engagement_level",
        "website_visits",
        "time_spent",
        "content_downloaded",
        "model_type",
        "dataset_type",
    ],
    policy: RenamePolicy::KeepExisting,
};

static LEAD_SCORING: SchemaMapping = SchemaMapping {
    variant: DatasetVariant::LeadScoring,
    renames: &ENGAGEMENT_FIELDS,
    dropped: &[
        "emp_var_rate",
        "cons_price_idx",
        "cons_conf_idx",
        "euribor3m",
        "nr_employed",
        "model_type",
        "dataset_type",
    ],
    policy: RenamePolicy::Overwrite,
};

impl SchemaMapping {
    pub fn for_variant(variant: DatasetVariant) -> &'static SchemaMapping {
        match variant {
            DatasetVariant::Bank => &BANK,
            DatasetVariant::LeadScoring => &LEAD_SCORING,
        }
    }

    /// Request spelling to dataset spelling.
    pub fn to_native(&self, record: &LeadRecord) -> LeadRecord {
        let mut out = record.clone();
        for a in self.renames {
            if self.policy == RenamePolicy::KeepExisting && out.contains(a.native) {
                continue;
            }
            if let Some(value) = out.remove(a.request) {
                out.insert(a.native, value);
            }
        }
        for field in self.dropped {
            out.remove(field);
        }
        out
    }

    /// Copy each renamed field to its other spelling when only one is
    /// present. Fields already spelled both ways keep their own values.
    pub fn reconcile(&self, record: &mut LeadRecord) {
        for a in self.renames {
            let copy = match (record.get(a.request), record.get(a.native)) {
                (Some(v), None) => Some((a.native, v.clone())),
                (None, Some(v)) => Some((a.request, v.clone())),
                _ => None,
            };
            if let Some((field, value)) = copy {
                record.insert(field, value);
            }
        }
    }
}

/// Map a request record onto `variant`'s column names. Never fails.
pub fn transform_request(record: &LeadRecord, variant: DatasetVariant) -> LeadRecord {
    SchemaMapping::for_variant(variant).to_native(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bank_keeps_existing_dot_spelling() {
        let record: LeadRecord = [("emp_var_rate", -1.8), ("emp.var.rate", 1.1)]
            .into_iter()
            .collect();
        let out = transform_request(&record, DatasetVariant::Bank);
        assert_eq!(out.get("emp.var.rate").and_then(|v| v.as_f64()), Some(1.1));
        assert!(out.contains("emp_var_rate"));
    }

    #[test]
    fn lead_scoring_overwrites() {
        let record: LeadRecord = [("website_visits", 7.0), ("visits", 2.0)].into_iter().collect();
        let out = transform_request(&record, DatasetVariant::LeadScoring);
        assert_eq!(out.get("visits").and_then(|v| v.as_f64()), Some(7.0));
        assert!(!out.contains("website_visits"));
    }

    #[test]
    fn reconcile_leaves_unmapped_fields_alone() {
        let mut record: LeadRecord = [("euribor3m", 1.3), ("visits", 4.0)].into_iter().collect();
        let before = record.clone();
        SchemaMapping::for_variant(DatasetVariant::Bank).reconcile(&mut record);
        assert_eq!(record, before);
    }
}

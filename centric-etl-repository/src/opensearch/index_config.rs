//! Search cluster configuration and the sequence-centric index mapping.

use serde_json::{json, Value};

/// Connection settings for the search cluster.
#[derive(Debug, Clone)]
pub struct SearchClusterConfig {
    /// Cluster URL (e.g. "http://localhost:9200").
    pub url: String,
    /// Optional basic-auth user.
    pub user: Option<String>,
    /// Optional basic-auth password.
    pub password: Option<String>,
}

impl SearchClusterConfig {
    /// Create a configuration without authentication.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            user: None,
            password: None,
        }
    }

    /// Attach basic-auth credentials.
    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.password = Some(password.into());
        self
    }

    /// Credentials, if both user and password are configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.user, &self.password) {
            (Some(user), Some(password)) => Some((user.as_str(), password.as_str())),
            _ => None,
        }
    }
}

fn keyword() -> Value {
    json!({ "type": "keyword" })
}

fn integer() -> Value {
    json!({ "type": "integer" })
}

/// The field mapping applied to every freshly provisioned index.
///
/// Identifiers are keywords, the normalized numeric fields are integers, files
/// and collections are nested so per-item filters match within one item, and
/// the single-valued relations are plain objects. Unmapped source columns fall
/// back to dynamic mapping.
pub fn sequence_centric_mapping() -> Value {
    json!({
        "dynamic": true,
        "properties": {
            "sequence_id": keyword(),
            "sra_accession": keyword(),
            "genbank_ena_ddbj_accession": keyword(),
            "gisaid_accession": keyword(),
            "gisaid_virus_name": keyword(),
            "lineage_clade_name": keyword(),
            "variant_designation": keyword(),
            "sequencing_instrument": keyword(),
            "consensus_genome_length": integer(),
            "number_base_pairs_sequenced": integer(),
            "files": {
                "type": "nested",
                "properties": {
                    "file_id": keyword(),
                    "file_type": keyword(),
                    "drs_filename": keyword(),
                    "drs_filepath": keyword()
                }
            },
            "sample": {
                "properties": {
                    "sample_id": keyword(),
                    "biosample_accession": keyword(),
                    "bioproject_accession": keyword(),
                    "sample_collection_date": keyword(),
                    "geo_loc_name_country": keyword(),
                    "geo_loc_name_state_province_territory": keyword(),
                    "organism": keyword(),
                    "purpose_of_sampling": keyword()
                }
            },
            "host": {
                "properties": {
                    "host_id": keyword(),
                    "host_common_name": keyword(),
                    "host_scientific_name": keyword(),
                    "host_gender": keyword(),
                    "host_age_bin": keyword(),
                    "host_vaccination_status": keyword(),
                    "number_of_vaccine_doses_received": integer()
                }
            },
            "collections": {
                "type": "nested",
                "properties": {
                    "collection_id": keyword(),
                    "collection_name": keyword()
                }
            },
            "data_source": {
                "properties": {
                    "data_source_id": keyword(),
                    "data_source_name": keyword()
                }
            }
        }
    })
}

//! Job offer data contract
//!
//! Shared between the HTTP surface and the document store backends. Field
//! names on the wire follow the layout of the stored documents.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A job offer record. Every attribute is optional; `id` is assigned by the store.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct JobOffer {
    #[serde(rename = "id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub job: Option<String>,
    pub company: Option<String>,
    pub address: Option<String>,
    pub date: Option<String>,
    pub link: Option<String>,
    pub salary: Option<f64>,
    pub description: Option<String>,
}

impl JobOffer {
    /// Document body as stored: every field except the id.
    pub fn into_source(self) -> Self {
        Self { id: None, ..self }
    }

    /// Attaches a store-assigned id.
    pub fn with_id(self, id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..self
        }
    }

    /// Rebuilds a record from a stored document. Fails if the document
    /// carries values of the wrong type.
    pub fn from_source(id: impl Into<String>, source: Value) -> Result<Self, serde_json::Error> {
        let offer: JobOffer = serde_json::from_value(source)?;
        Ok(offer.with_id(id))
    }
}

/// Partial update body.
///
/// Each field is `None` when absent from the request, `Some(None)` when sent
/// as an explicit `null`, and `Some(Some(v))` otherwise. Only present fields
/// are serialized, so the serialized patch is exactly what the caller sent.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct JobOfferPatch {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub job: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub company: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub address: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub date: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub link: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub salary: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
}

/// Marks a key as present, keeping an explicit `null` distinct from a missing key.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl JobOfferPatch {
    /// The submitted fields plus the id, with everything else null.
    /// This is not the merged stored document.
    pub fn echo(&self, id: impl Into<String>) -> JobOffer {
        JobOffer {
            id: Some(id.into()),
            job: self.job.clone().flatten(),
            company: self.company.clone().flatten(),
            address: self.address.clone().flatten(),
            date: self.date.clone().flatten(),
            link: self.link.clone().flatten(),
            salary: self.salary.flatten(),
            description: self.description.clone().flatten(),
        }
    }

    /// Merges the present fields into `offer`, leaving absent ones untouched.
    pub fn apply_to(&self, offer: &mut JobOffer) {
        merge(&mut offer.job, &self.job);
        merge(&mut offer.company, &self.company);
        merge(&mut offer.address, &self.address);
        merge(&mut offer.date, &self.date);
        merge(&mut offer.link, &self.link);
        merge(&mut offer.salary, &self.salary);
        merge(&mut offer.description, &self.description);
    }
}

fn merge<T: Clone>(target: &mut Option<T>, update: &Option<Option<T>>) {
    if let Some(value) = update {
        *target = value.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_fields_are_null() {
        let offer: JobOffer =
            serde_json::from_value(json!({"Job": "Baker", "Company": "ACME", "Salary": 42000}))
                .unwrap();

        assert_eq!(offer.job.as_deref(), Some("Baker"));
        assert_eq!(offer.salary, Some(42000.0));
        assert_eq!(offer.address, None);

        let out = serde_json::to_value(offer.with_id("X")).unwrap();
        assert_eq!(
            out,
            json!({
                "id": "X",
                "Job": "Baker",
                "Company": "ACME",
                "Address": null,
                "Date": null,
                "Link": null,
                "Salary": 42000.0,
                "Description": null
            })
        );
    }

    #[test]
    fn test_source_has_no_id() {
        let offer = JobOffer {
            id: Some("client-chosen".to_string()),
            job: Some("Baker".to_string()),
            ..Default::default()
        };

        let source = serde_json::to_value(offer.into_source()).unwrap();
        assert!(source.get("id").is_none());
        assert_eq!(source["Job"], "Baker");
        assert!(source["Salary"].is_null());
    }

    #[test]
    fn test_from_source_rejects_wrong_types() {
        assert!(JobOffer::from_source("a", json!({"Salary": "lots"})).is_err());
        assert!(JobOffer::from_source("a", json!({"Job": 12})).is_err());

        let offer = JobOffer::from_source("a", json!({"Job": "Baker", "Extra": true})).unwrap();
        assert_eq!(offer.id.as_deref(), Some("a"));
        assert_eq!(offer.job.as_deref(), Some("Baker"));
    }

    #[test]
    fn test_patch_distinguishes_null_from_absent() {
        let patch: JobOfferPatch =
            serde_json::from_value(json!({"Job": "Chef", "Salary": null, "id": "ignored"}))
                .unwrap();

        assert_eq!(patch.job, Some(Some("Chef".to_string())));
        assert_eq!(patch.salary, Some(None));
        assert_eq!(patch.company, None);

        let body = serde_json::to_value(&patch).unwrap();
        assert_eq!(body, json!({"Job": "Chef", "Salary": null}));
    }

    #[test]
    fn test_patch_echo_only_has_submitted_fields() {
        let patch: JobOfferPatch = serde_json::from_value(json!({"Company": "Globex"})).unwrap();
        let echoed = patch.echo("X");

        assert_eq!(
            echoed,
            JobOffer {
                id: Some("X".to_string()),
                company: Some("Globex".to_string()),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_patch_apply_keeps_absent_fields() {
        let mut stored = JobOffer {
            job: Some("Baker".to_string()),
            company: Some("ACME".to_string()),
            salary: Some(42000.0),
            ..Default::default()
        };
        let patch: JobOfferPatch =
            serde_json::from_value(json!({"Company": "Globex", "Salary": null})).unwrap();

        patch.apply_to(&mut stored);

        assert_eq!(stored.job.as_deref(), Some("Baker"));
        assert_eq!(stored.company.as_deref(), Some("Globex"));
        assert_eq!(stored.salary, None);
    }
}

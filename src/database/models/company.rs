use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

use crate::database::patch::{double_option, lenient_date, present_json, Assignments, Patch};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Company {
    pub id: i32,
    pub owner_id: i32,
    pub company_name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub postal_code: String,
    pub website: Option<String>,
    pub logo_url: Option<String>,
    pub logo_public_id: Option<String>,
    pub banner_url: Option<String>,
    pub banner_public_id: Option<String>,
    pub industry: String,
    pub founded_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub social_links: Option<Value>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Registration payload. The owner always comes from the authenticated
/// caller, so there is no `owner_id` field to deserialize.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCompany {
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub banner_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub founded_date: Option<Option<NaiveDate>>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub social_links: Option<Value>,
}

impl NewCompany {
    /// Names of required text fields that are blank.
    pub fn blank_fields(&self) -> Vec<&'static str> {
        [
            ("company_name", &self.company_name),
            ("address", &self.address),
            ("city", &self.city),
            ("state", &self.state),
            ("country", &self.country),
            ("postal_code", &self.postal_code),
            ("industry", &self.industry),
        ]
        .into_iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(k, _)| k)
        .collect()
    }
}

/// Client-writable company columns. Image asset ids are server-only.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompanyPatch {
    pub company_name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
    pub industry: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub website: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub logo_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub banner_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub founded_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "present_json")]
    pub social_links: Option<Value>,
    #[serde(skip)]
    pub logo_public_id: Option<Option<String>>,
    #[serde(skip)]
    pub banner_public_id: Option<Option<String>>,
}

impl CompanyPatch {
    pub fn logo(url: String, public_id: String) -> Self {
        Self {
            logo_url: Some(Some(url)),
            logo_public_id: Some(Some(public_id)),
            ..Default::default()
        }
    }

    pub fn banner(url: String, public_id: String) -> Self {
        Self {
            banner_url: Some(Some(url)),
            banner_public_id: Some(Some(public_id)),
            ..Default::default()
        }
    }

    /// Profile screens send social links either as an array or as an
    /// object keyed by network; store them as an array, expanding any
    /// element that is itself a JSON-encoded string.
    pub fn normalize_social_links(&mut self) {
        let items = match self.social_links.take() {
            Some(Value::Object(map)) => map.into_iter().map(|(_, v)| v).collect::<Vec<_>>(),
            Some(Value::Array(items)) => items,
            other => {
                self.social_links = other;
                return;
            }
        };

        let expanded = items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => serde_json::from_str::<Value>(&s).unwrap_or(Value::String(s)),
                other => other,
            })
            .collect();
        self.social_links = Some(Value::Array(expanded));
    }
}

impl Patch for CompanyPatch {
    const TABLE: &'static str = "company_profile";

    fn write(self, out: &mut Assignments) {
        out.required("company_name", self.company_name)
            .required("address", self.address)
            .required("city", self.city)
            .required("state", self.state)
            .required("country", self.country)
            .required("postal_code", self.postal_code)
            .nullable("website", self.website)
            .nullable("logo_url", self.logo_url)
            .nullable("logo_public_id", self.logo_public_id)
            .nullable("banner_url", self.banner_url)
            .nullable("banner_public_id", self.banner_public_id)
            .required("industry", self.industry)
            .nullable("founded_date", self.founded_date)
            .nullable("description", self.description)
            .json("social_links", self.social_links);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::patch::{SqlValue, UpdateBuilder};
    use serde_json::json;

    #[test]
    fn client_cannot_write_owner_or_asset_ids() {
        let patch: CompanyPatch = serde_json::from_value(json!({
            "owner_id": 42,
            "logo_public_id": "someone-elses-asset",
            "city": "Pune"
        }))
        .unwrap();

        assert_eq!(UpdateBuilder::new(patch).columns(), vec!["city"]);
    }

    #[test]
    fn social_links_object_becomes_array() {
        let mut patch: CompanyPatch = serde_json::from_value(json!({
            "social_links": {
                "a": { "platform": "twitter", "url": "https://x.com/acme" },
                "b": "{\"platform\":\"github\",\"url\":\"https://github.com/acme\"}"
            }
        }))
        .unwrap();
        patch.normalize_social_links();

        assert_eq!(
            patch.social_links,
            Some(json!([
                { "platform": "twitter", "url": "https://x.com/acme" },
                { "platform": "github", "url": "https://github.com/acme" }
            ]))
        );
    }

    #[test]
    fn social_links_string_passes_through_normalization() {
        let mut patch: CompanyPatch =
            serde_json::from_value(json!({ "social_links": "[{\"platform\":\"x\"}]" })).unwrap();
        patch.normalize_social_links();

        let builder = UpdateBuilder::new(patch);
        assert_eq!(builder.values(), vec![&SqlValue::Json(Some(r#"[{"platform":"x"}]"#.into()))]);
        assert!(builder.sql().contains("social_links = $1::jsonb"));
    }

    #[test]
    fn explicit_null_social_links_clears_column() {
        let patch: CompanyPatch = serde_json::from_value(json!({ "social_links": null })).unwrap();
        assert_eq!(UpdateBuilder::new(patch).values(), vec![&SqlValue::Json(None)]);
    }

    #[test]
    fn empty_founded_date_clears_column() {
        let patch: CompanyPatch = serde_json::from_value(json!({ "founded_date": "" })).unwrap();
        assert_eq!(patch.founded_date, Some(None));

        let patch: CompanyPatch = serde_json::from_value(json!({ "founded_date": "2015-06-30" })).unwrap();
        assert_eq!(patch.founded_date, Some(NaiveDate::from_ymd_opt(2015, 6, 30)));
    }

    #[test]
    fn logo_patch_writes_url_and_asset_id() {
        let builder = UpdateBuilder::new(CompanyPatch::logo("https://img/x.png".into(), "company_logos/x".into()));
        assert_eq!(builder.columns(), vec!["logo_url", "logo_public_id"]);
    }

    #[test]
    fn new_company_reports_blank_required_fields() {
        let company: NewCompany = serde_json::from_value(json!({
            "company_name": "Acme",
            "address": " ",
            "city": "Pune",
            "state": "MH",
            "country": "IN",
            "postal_code": "411001",
            "industry": ""
        }))
        .unwrap();

        assert_eq!(company.blank_fields(), vec!["address", "industry"]);
    }
}

//! Wire types for the Konnect control-plane API
//!
//! One DTO per kind plus the two list envelopes. Kind-specific attributes
//! beyond the identity fields are kept as a flattened JSON object; the
//! planner only compares the fields the desired state declares, so unknown
//! server-side fields pass through harmlessly.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map as JsonMap, Value as JsonValue};

use kongctl_core::RemoteResource;

/// Envelope of page-number based list endpoints.
#[derive(Debug, Deserialize)]
pub struct ListEnvelope<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub meta: ListMeta,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListMeta {
    #[serde(default)]
    pub page: Option<PageMeta>,
}

#[derive(Debug, Deserialize)]
pub struct PageMeta {
    pub total: u64,
    #[serde(default)]
    pub size: Option<u32>,
    #[serde(default)]
    pub number: Option<u32>,
}

/// Envelope of cursor based list endpoints; `next` is absent on the last
/// page.
#[derive(Debug, Deserialize)]
pub struct CursorEnvelope<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub meta: CursorMeta,
}

#[derive(Debug, Default, Deserialize)]
pub struct CursorMeta {
    #[serde(default)]
    pub next: Option<String>,
}

/// Fields volatile on the server side, dropped when normalizing attributes.
const VOLATILE_FIELDS: &[&str] = &["created_at", "updated_at"];

fn normalize(mut rest: JsonMap<String, JsonValue>) -> JsonValue {
    for field in VOLATILE_FIELDS {
        rest.remove(*field);
    }
    JsonValue::Object(rest)
}

macro_rules! named_dto {
    ($(#[$doc:meta])* $name:ident, name: $key:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Deserialize)]
        pub struct $name {
            pub id: String,
            pub $key: String,
            #[serde(default)]
            pub labels: BTreeMap<String, String>,
            #[serde(flatten)]
            pub rest: JsonMap<String, JsonValue>,
        }

        impl From<$name> for RemoteResource {
            fn from(dto: $name) -> RemoteResource {
                RemoteResource {
                    id: dto.id,
                    name: dto.$key,
                    labels: dto.labels,
                    attributes: normalize(dto.rest),
                    parent_id: None,
                }
            }
        }
    };
}

named_dto!(
    /// A developer portal.
    PortalDto, name: name
);
named_dto!(
    /// A managed API.
    ApiDto, name: name
);
named_dto!(
    /// A gateway control plane.
    ControlPlaneDto, name: name
);
named_dto!(
    /// An application auth strategy.
    AuthStrategyDto, name: name
);
named_dto!(
    /// An API version; the version string is its natural key.
    ApiVersionDto, name: version
);
named_dto!(
    /// An API implementation.
    ApiImplementationDto, name: name
);

/// A publication of an API to a portal. Publications have no id of their
/// own; the portal id identifies them within their API.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiPublicationDto {
    pub portal_id: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(flatten)]
    pub rest: JsonMap<String, JsonValue>,
}

impl From<ApiPublicationDto> for RemoteResource {
    fn from(dto: ApiPublicationDto) -> RemoteResource {
        let mut rest = dto.rest;
        rest.insert(
            "portal_id".to_string(),
            JsonValue::String(dto.portal_id.clone()),
        );
        RemoteResource {
            name: dto.portal_id.clone(),
            id: dto.portal_id,
            labels: dto.labels,
            attributes: normalize(rest),
            parent_id: None,
        }
    }
}

/// A documentation page; the slug is its natural key within the API.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiDocumentDto {
    pub id: String,
    pub slug: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(flatten)]
    pub rest: JsonMap<String, JsonValue>,
}

impl From<ApiDocumentDto> for RemoteResource {
    fn from(dto: ApiDocumentDto) -> RemoteResource {
        let mut rest = dto.rest;
        rest.insert("slug".to_string(), JsonValue::String(dto.slug.clone()));
        RemoteResource {
            id: dto.id,
            name: dto.slug,
            labels: dto.labels,
            attributes: normalize(rest),
            parent_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dto_conversion_normalizes_attributes() {
        let dto: PortalDto = serde_json::from_value(serde_json::json!({
            "id": "p-1",
            "name": "Dev Portal",
            "labels": {"KONGCTL-namespace": "default"},
            "description": "docs",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-02T00:00:00Z",
        }))
        .unwrap();

        let remote: RemoteResource = dto.into();
        assert_eq!(remote.id, "p-1");
        assert_eq!(remote.name, "Dev Portal");
        assert!(remote.is_managed());
        assert_eq!(remote.attributes["description"], "docs");
        assert!(remote.attributes.get("created_at").is_none());
    }

    #[test]
    fn publication_identity_is_portal_id() {
        let dto: ApiPublicationDto = serde_json::from_value(serde_json::json!({
            "portal_id": "p-1",
            "auto_approve_registrations": true,
        }))
        .unwrap();

        let remote: RemoteResource = dto.into();
        assert_eq!(remote.id, "p-1");
        assert_eq!(remote.attributes["portal_id"], "p-1");
        assert_eq!(remote.attributes["auto_approve_registrations"], true);
    }
}

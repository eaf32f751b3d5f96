//! Typed NAKALA payloads: metadata entries, creators, datasets, collections,
//! uploaded files and the small request bodies used by the rights and
//! metadata endpoints.
//!
//! Field names follow the service's JSON exactly (`propertyUri`, `typeUri`,
//! `fullName`, ...). Optional fields are omitted when empty so payloads
//! match what the service itself returns.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Metadata properties understood by the converter and the demos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    Title,
    Alternative,
    Description,
    Subject,
    Creator,
    Contributor,
    Created,
    License,
    Type,
    Language,
    Temporal,
    Spatial,
    AccessRights,
    Identifier,
    Publisher,
}

impl Property {
    pub const ALL: [Property; 15] = [
        Property::Title,
        Property::Alternative,
        Property::Description,
        Property::Subject,
        Property::Creator,
        Property::Contributor,
        Property::Created,
        Property::License,
        Property::Type,
        Property::Language,
        Property::Temporal,
        Property::Spatial,
        Property::AccessRights,
        Property::Identifier,
        Property::Publisher,
    ];

    /// Full property URI. The five properties required for publication live
    /// in the `nakala.fr/terms` namespace, the rest are Dublin Core terms.
    pub fn uri(self) -> &'static str {
        match self {
            Property::Title => "http://nakala.fr/terms#title",
            Property::Alternative => "http://purl.org/dc/terms/alternative",
            Property::Description => "http://purl.org/dc/terms/description",
            Property::Subject => "http://purl.org/dc/terms/subject",
            Property::Creator => "http://nakala.fr/terms#creator",
            Property::Contributor => "http://purl.org/dc/terms/contributor",
            Property::Created => "http://nakala.fr/terms#created",
            Property::License => "http://nakala.fr/terms#license",
            Property::Type => "http://nakala.fr/terms#type",
            Property::Language => "http://purl.org/dc/terms/language",
            Property::Temporal => "http://purl.org/dc/terms/temporal",
            Property::Spatial => "http://purl.org/dc/terms/spatial",
            Property::AccessRights => "http://purl.org/dc/terms/accessRights",
            Property::Identifier => "http://purl.org/dc/terms/identifier",
            Property::Publisher => "http://purl.org/dc/terms/publisher",
        }
    }

    /// Short name, as used for CSV columns and error messages.
    pub fn name(self) -> &'static str {
        match self {
            Property::Title => "title",
            Property::Alternative => "alternative",
            Property::Description => "description",
            Property::Subject => "subject",
            Property::Creator => "creator",
            Property::Contributor => "contributor",
            Property::Created => "created",
            Property::License => "license",
            Property::Type => "type",
            Property::Language => "language",
            Property::Temporal => "temporal",
            Property::Spatial => "spatial",
            Property::AccessRights => "accessRights",
            Property::Identifier => "identifier",
            Property::Publisher => "publisher",
        }
    }

    pub fn from_uri(uri: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.uri() == uri)
    }
}

/// Last path segment of a property URI (`...#title` -> `title`,
/// `.../terms/subject` -> `subject`).
pub fn short_property_name(uri: &str) -> &str {
    let after_hash = uri.rsplit('#').next().unwrap_or(uri);
    after_hash.rsplit('/').next().unwrap_or(after_hash)
}

/// A person credited as creator or contributor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creator {
    #[serde(default)]
    pub givenname: String,
    pub surname: String,
    #[serde(rename = "fullName", default)]
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orcid: Option<String>,
}

impl Creator {
    pub fn new(givenname: impl Into<String>, surname: impl Into<String>) -> Self {
        let givenname = givenname.into();
        let surname = surname.into();
        let full_name = if givenname.is_empty() {
            surname.clone()
        } else {
            format!("{} {}", givenname, surname).trim().to_string()
        };
        Self {
            givenname,
            surname,
            full_name,
            orcid: None,
        }
    }

    pub fn with_orcid(mut self, orcid: Option<String>) -> Self {
        self.orcid = orcid;
        self
    }

    /// Creator used by every demo payload.
    pub fn demo() -> Self {
        use crate::config::{DEMO_GIVENNAME, DEMO_ORCID, DEMO_SURNAME};
        Self::new(DEMO_GIVENNAME, DEMO_SURNAME).with_orcid(Some(DEMO_ORCID.to_string()))
    }
}

/// Value of a metadata entry. Anything the service returns that is neither
/// a string nor a creator object is kept as raw JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Text(String),
    Creator(Creator),
    Other(Value),
}

impl MetaValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MetaValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::Text(text) => f.write_str(text),
            MetaValue::Creator(creator) => match &creator.orcid {
                Some(orcid) => write!(f, "{} (ORCID: {})", creator.full_name, orcid),
                None => f.write_str(&creator.full_name),
            },
            MetaValue::Other(value) => write!(f, "{}", value),
        }
    }
}

/// One metadata entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub property_uri: String,
    pub value: MetaValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_uri: Option<String>,
}

impl Meta {
    pub fn text(property: Property, value: impl Into<String>) -> Self {
        Self {
            property_uri: property.uri().to_string(),
            value: MetaValue::Text(value.into()),
            lang: None,
            type_uri: None,
        }
    }

    pub fn creator(property: Property, creator: Creator) -> Self {
        Self {
            property_uri: property.uri().to_string(),
            value: MetaValue::Creator(creator),
            lang: None,
            type_uri: None,
        }
    }

    pub fn with_lang(mut self, lang: Option<impl Into<String>>) -> Self {
        self.lang = lang.map(Into::into);
        self
    }

    pub fn with_type(mut self, type_uri: &str) -> Self {
        self.type_uri = Some(type_uri.to_string());
        self
    }

    pub fn is(&self, property: Property) -> bool {
        self.property_uri == property.uri()
    }

    pub fn property_name(&self) -> &str {
        short_property_name(&self.property_uri)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DatasetStatus {
    #[default]
    Pending,
    Published,
}

impl DatasetStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DatasetStatus::Pending => "pending",
            DatasetStatus::Published => "published",
        }
    }
}

impl fmt::Display for DatasetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionStatus {
    #[default]
    Private,
    Public,
}

impl CollectionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CollectionStatus::Private => "private",
            CollectionStatus::Public => "public",
        }
    }
}

impl fmt::Display for CollectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upload response from `POST /datas/uploads`. The service expects the
/// whole object back in the dataset payload, so unknown fields are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,
    pub sha1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embargoed: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of `POST /datas` and `PUT /datas/{id}`. Reading one back is
/// strict: `metas` must be present and unknown keys are rejected, so a
/// misspelt `status` is not silently taken as pending.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Dataset {
    #[serde(default)]
    pub status: DatasetStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileInfo>,
    pub metas: Vec<Meta>,
}

/// Body of `POST /collections` and `PUT /collections/{id}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Collection {
    #[serde(default)]
    pub status: CollectionStatus,
    #[serde(default)]
    pub metas: Vec<Meta>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub datas: Vec<String>,
}

/// Filter body of `DELETE /{kind}/{id}/metadatas`. The service removes
/// every entry matching the property (and language, when given).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataFilter {
    pub property_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

impl MetadataFilter {
    pub fn new(property: Property, lang: Option<&str>) -> Self {
        Self {
            property_uri: property.uri().to_string(),
            lang: lang.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "ROLE_OWNER")]
    Owner,
    #[serde(rename = "ROLE_ADMIN")]
    Admin,
    #[serde(rename = "ROLE_MODERATOR")]
    Moderator,
    #[serde(rename = "ROLE_EDITOR")]
    Editor,
    #[serde(rename = "ROLE_READER")]
    Reader,
    #[serde(rename = "ROLE_DEPOSITOR")]
    Depositor,
    #[serde(rename = "ROLE_USER")]
    User,
}

/// Grants `role` on a resource to a user or group id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RightAssignment {
    pub id: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMember {
    pub username: String,
    pub role: Role,
}

/// Body of `POST /groups`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRequest {
    pub name: String,
    pub users: Vec<GroupMember>,
}

/// The two resource families that share the metadata and status endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Dataset,
    Collection,
}

impl ResourceKind {
    /// Path segment under the API root.
    pub fn path(self) -> &'static str {
        match self {
            ResourceKind::Dataset => "datas",
            ResourceKind::Collection => "collections",
        }
    }
}

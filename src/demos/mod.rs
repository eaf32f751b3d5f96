//! Guided walkthroughs of the NAKALA API. Each demo creates its own
//! throwaway resources on the configured instance, narrates every call and
//! removes what it can before returning.

use anyhow::{bail, Result};
use serde_json::Value;

use crate::api::{ApiClient, ApiResponse};
use crate::config::{DCTERMS_URI, DEMO_LICENSE, DEMO_TYPE_URI, XSD_STRING};
use crate::metadata::{Creator, Dataset, DatasetStatus, FileInfo, Meta, Property};
use crate::ui::{self, Narrator};

mod collection;
mod complete;
mod dataset;
mod incremental;
mod rights;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Demo {
    Dataset,
    Collection,
    Complete,
    Incremental,
    Rights,
}

impl Demo {
    pub const ALL: [Demo; 5] = [
        Demo::Dataset,
        Demo::Collection,
        Demo::Complete,
        Demo::Incremental,
        Demo::Rights,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Demo::Dataset => "Dataset lifecycle (POST, GET, PATCH, PUT, DELETE)",
            Demo::Collection => "Collection lifecycle and affectation",
            Demo::Complete => "Complete workflow: file to published collection",
            Demo::Incremental => "Incremental metadata updates vs PUT",
            Demo::Rights => "Rights, groups and users",
        }
    }
}

pub fn run(demo: Demo, api: &ApiClient, narrator: &Narrator) -> Result<()> {
    match demo {
        Demo::Dataset => dataset::run(api, narrator),
        Demo::Collection => collection::run(api, narrator),
        Demo::Complete => complete::run(api, narrator),
        Demo::Incremental => incremental::run(api, narrator),
        Demo::Rights => rights::run(api, narrator),
    }
}

/// The five entries a dataset needs before it can be published, with the
/// given English title.
pub(crate) fn required_metas(title: &str) -> Vec<Meta> {
    vec![
        Meta::text(Property::Title, title).with_lang(Some("en")),
        Meta::creator(Property::Creator, Creator::demo()),
        Meta::text(Property::Created, "2025").with_type(XSD_STRING),
        Meta::text(Property::License, DEMO_LICENSE).with_type(XSD_STRING),
        Meta::text(Property::Type, DEMO_TYPE_URI).with_type(DCTERMS_URI),
    ]
}

pub(crate) fn keyword(value: &str, lang: &str) -> Meta {
    Meta::text(Property::Subject, value)
        .with_lang(Some(lang))
        .with_type(XSD_STRING)
}

/// Upload a small in-memory text file; every dataset needs at least one.
pub(crate) fn upload_dummy(api: &ApiClient, name: &str, content: &str) -> Result<FileInfo> {
    ui::print_info(&format!("📡 POST /datas/uploads ({})", name));
    let file = api.upload_bytes(name, content.as_bytes().to_vec(), "text/plain")?;
    ui::print_success(&format!("File uploaded: {}", file.sha1));
    Ok(file)
}

/// Upload a dummy file and create a pending dataset around it. Returns the
/// new dataset id.
pub(crate) fn create_pending_dataset(
    api: &ApiClient,
    narrator: &Narrator,
    title: &str,
    file_name: &str,
    extra: Vec<Meta>,
) -> Result<String> {
    let file = upload_dummy(api, file_name, &format!("Demo file for '{}'", title))?;
    narrator.rate_limit();

    let mut metas = required_metas(title);
    metas.extend(extra);
    let dataset = Dataset {
        status: DatasetStatus::Pending,
        files: vec![file],
        metas,
    };
    let response = narrator.call("POST", "/datas", || api.create_dataset(&dataset))?;
    require_created(&response, "dataset")
}

/// The id from a 201 creation response, or an error carrying the body.
pub(crate) fn require_created(response: &ApiResponse, what: &str) -> Result<String> {
    match (response.code(), response.created_id()) {
        (201, Some(id)) => {
            ui::print_success(&format!("Created {}: {}", what, id));
            Ok(id)
        }
        (code, _) => {
            ui::print_error(&format!("Response: {}", response.body_excerpt(300)));
            bail!("{} creation failed with status {}", what, code)
        }
    }
}

/// The `metas` array of a fetched resource, skipping entries that do not
/// parse.
pub(crate) fn metas_of(state: &Value) -> Vec<Meta> {
    state
        .get("metas")
        .and_then(Value::as_array)
        .map(|metas| {
            metas
                .iter()
                .filter_map(|m| serde_json::from_value(m.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

pub(crate) fn count_property(state: &Value, property: Property) -> usize {
    metas_of(state).iter().filter(|m| m.is(property)).count()
}

/// Best-effort removal used by every cleanup phase. Failures are reported,
/// never propagated; the return value says whether the resource is gone.
pub(crate) fn cleanup_delete(
    narrator: &Narrator,
    endpoint: &str,
    send: impl FnOnce() -> crate::Result<ApiResponse>,
) -> bool {
    match narrator.call("DELETE", endpoint, send) {
        Ok(res) if res.is_any(&[200, 204]) => {
            ui::print_success(&format!("Deleted {}", endpoint));
            true
        }
        Ok(res) => {
            ui::print_warning(&format!("Could not delete {} ({})", endpoint, res.code()));
            false
        }
        Err(e) => {
            ui::print_warning(&format!("Could not delete {}: {:#}", endpoint, e));
            false
        }
    }
}

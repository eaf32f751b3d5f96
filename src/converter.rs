//! CSV to NAKALA metadata conversion.
//!
//! A CSV row is a flat record of named columns. Three small grammars are
//! recognised inside cells:
//!
//! - language tags: `en: Title | fr: Titre`
//! - multiple values: `history ; archives ; maps`
//! - people: `Dupont, John (0000-0001-2345-6789); Lowey, Marc`
//!
//! None of the parsing functions fail. Malformed fragments degrade to a
//! best-effort single entry and invalid ORCIDs are dropped.
//!
//! ```
//! use nakala_cli::converter::{csv_row_to_nakala_metas, CsvRow};
//!
//! let mut row = CsvRow::new();
//! row.insert("title".into(), "en: Maps | fr: Cartes".into());
//! row.insert("creator".into(), "Dupont, John".into());
//!
//! let metas = csv_row_to_nakala_metas(&row);
//! assert_eq!(metas.len(), 3);
//! ```

use std::collections::{BTreeSet, HashMap};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{DCTERMS_URI, XSD_STRING};
use crate::error::{NakalaError, Result};
use crate::metadata::{Creator, Dataset, DatasetStatus, FileInfo, Meta, MetaValue, Property};

// =============================================================================
// PATTERNS
// =============================================================================

static ORCID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{4}-[0-9]{4}-[0-9]{4}-[0-9]{3}[0-9X]$").unwrap());

// Name followed by a 19 character identifier in parentheses.
static NAME_WITH_ORCID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+?)\s*\(([0-9X-]{19})\)$").unwrap());

/// Properties that must be present before a dataset can be published.
const PUBLICATION_REQUIRED: [Property; 5] = [
    Property::Title,
    Property::Type,
    Property::Creator,
    Property::Created,
    Property::License,
];

/// Column name to cell value.
pub type CsvRow = HashMap<String, String>;

/// One segment of a language-tagged field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LangValue {
    pub lang: Option<String>,
    pub value: String,
}

// =============================================================================
// FIELD GRAMMARS
// =============================================================================

/// Split `en: A | fr: B` into language/value pairs.
///
/// A blank input yields nothing; text with neither `|` nor `:` is a single
/// untagged value. Each segment is split on its first colon only, so values
/// may contain further colons. An empty tag counts as no tag.
pub fn parse_multilingual_field(text: &str) -> Vec<LangValue> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    if !trimmed.contains('|') && !trimmed.contains(':') {
        return vec![LangValue {
            lang: None,
            value: trimmed.to_string(),
        }];
    }

    trimmed
        .split('|')
        .map(str::trim)
        .map(|part| match part.split_once(':') {
            Some((lang, value)) => {
                let lang = lang.trim();
                LangValue {
                    lang: (!lang.is_empty()).then(|| lang.to_string()),
                    value: value.trim().to_string(),
                }
            }
            None => LangValue {
                lang: None,
                value: part.to_string(),
            },
        })
        .collect()
}

/// Split `a ; b ;c` into trimmed, non-empty values.
pub fn parse_multiple_values(text: &str) -> Vec<String> {
    text.split(';')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

/// Accepts a bare ORCID, an `orcid.org` URL or an `ORCID:` prefix and
/// returns the bare identifier, or `None` when it is not well formed.
pub fn normalize_orcid(text: &str) -> Option<String> {
    let orcid = text.trim();
    if orcid.is_empty() {
        return None;
    }

    let orcid = if let Some(rest) = orcid.strip_prefix("https://orcid.org/") {
        rest
    } else if let Some(rest) = orcid.strip_prefix("http://orcid.org/") {
        rest
    } else if orcid
        .get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("ORCID:"))
    {
        orcid[6..].trim()
    } else {
        orcid
    };

    ORCID_PATTERN.is_match(orcid).then(|| orcid.to_string())
}

/// Parse one or more people in `Surname, Given (ORCID)` form into creator
/// metadata entries.
pub fn parse_creator(text: &str) -> Vec<Meta> {
    parse_people(text, Property::Creator)
}

fn parse_people(text: &str, property: Property) -> Vec<Meta> {
    let mut people = Vec::new();

    for segment in parse_multilingual_field(text) {
        for name in parse_multiple_values(&segment.value) {
            let (name, orcid) = match NAME_WITH_ORCID.captures(&name) {
                Some(caps) => (caps[1].trim().to_string(), normalize_orcid(&caps[2])),
                None => (name.clone(), None),
            };

            let creator = match name.split_once(',') {
                Some((surname, given)) => Creator::new(given.trim(), surname.trim()),
                None => Creator::new("", name.as_str()),
            };

            people.push(Meta::creator(property, creator.with_orcid(orcid)));
        }
    }

    people
}

/// Split the `files` column on `|` and resolve each entry.
///
/// Relative paths are taken from `base_dir` (usually the CSV's directory),
/// `~/` from the home directory. Directories expand to every file below
/// them, hidden files excluded. Missing paths are logged and skipped.
pub fn parse_files(text: &str, base_dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in text.split('|').map(str::trim).filter(|e| !e.is_empty()) {
        let path = resolve_path(entry, base_dir);

        if path.is_file() {
            files.push(absolute(path));
        } else if path.is_dir() {
            collect_files(&path, &mut files);
        } else {
            warn!(path = %path.display(), "path not found");
        }
    }

    files
}

fn resolve_path(entry: &str, base_dir: &Path) -> PathBuf {
    if let Some(rest) = entry.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }

    let path = Path::new(entry);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

fn absolute(path: PathBuf) -> PathBuf {
    fs::canonicalize(&path).unwrap_or(path)
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "cannot read directory");
            return;
        }
    };

    // Sorted so repeated runs upload in the same order.
    let mut paths: Vec<PathBuf> = entries.filter_map(|e| e.ok()).map(|e| e.path()).collect();
    paths.sort();

    for path in paths {
        if path.is_dir() {
            collect_files(&path, files);
        } else if path.is_file() {
            let hidden = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('.'));
            if !hidden {
                files.push(absolute(path));
            }
        }
    }
}

// =============================================================================
// ROW CONVERSION
// =============================================================================

fn field<'a>(row: &'a CsvRow, column: &str) -> Option<&'a str> {
    row.get(column)
        .map(String::as_str)
        .filter(|v| !v.trim().is_empty())
}

fn push_multilingual(metas: &mut Vec<Meta>, text: &str, property: Property, type_uri: Option<&str>) {
    for part in parse_multilingual_field(text) {
        let mut meta = Meta::text(property, part.value).with_lang(part.lang);
        if let Some(type_uri) = type_uri {
            meta = meta.with_type(type_uri);
        }
        metas.push(meta);
    }
}

fn push_single(metas: &mut Vec<Meta>, text: &str, property: Property, type_uri: &str) {
    metas.push(Meta::text(property, text.trim()).with_type(type_uri));
}

/// Build the metadata list for one CSV row.
///
/// Entries always come out in the same order: title, alternative,
/// description, keywords, creators, contributors, created, license, type,
/// language, temporal, spatial, accessRights, identifier.
pub fn csv_row_to_nakala_metas(row: &CsvRow) -> Vec<Meta> {
    let mut metas = Vec::new();

    if let Some(title) = field(row, "title") {
        push_multilingual(&mut metas, title, Property::Title, None);
    }
    if let Some(alternative) = field(row, "alternative") {
        push_multilingual(&mut metas, alternative, Property::Alternative, Some(XSD_STRING));
    }
    if let Some(description) = field(row, "description") {
        push_multilingual(&mut metas, description, Property::Description, Some(XSD_STRING));
    }

    if let Some(keywords) = field(row, "keywords").or_else(|| field(row, "subject")) {
        for part in parse_multilingual_field(keywords) {
            for keyword in parse_multiple_values(&part.value) {
                metas.push(
                    Meta::text(Property::Subject, keyword)
                        .with_type(XSD_STRING)
                        .with_lang(part.lang.clone()),
                );
            }
        }
    }

    if let Some(creator) = field(row, "creator") {
        metas.extend(parse_people(creator, Property::Creator));
    }
    if let Some(contributor) = field(row, "contributor") {
        metas.extend(parse_people(contributor, Property::Contributor));
    }

    if let Some(date) = field(row, "date").or_else(|| field(row, "created")) {
        push_single(&mut metas, date, Property::Created, XSD_STRING);
    }
    if let Some(license) = field(row, "license") {
        push_single(&mut metas, license, Property::License, XSD_STRING);
    }
    if let Some(kind) = field(row, "type") {
        push_single(&mut metas, kind, Property::Type, DCTERMS_URI);
    }
    if let Some(language) = field(row, "language") {
        push_single(&mut metas, language, Property::Language, XSD_STRING);
    }

    if let Some(temporal) = field(row, "temporal") {
        push_multilingual(&mut metas, temporal, Property::Temporal, Some(XSD_STRING));
    }
    if let Some(spatial) = field(row, "spatial") {
        push_multilingual(&mut metas, spatial, Property::Spatial, Some(XSD_STRING));
    }

    if let Some(access) = field(row, "accessRights") {
        push_single(&mut metas, access, Property::AccessRights, XSD_STRING);
    }
    if let Some(identifier) = field(row, "identifier") {
        push_single(&mut metas, identifier, Property::Identifier, XSD_STRING);
    }

    metas
}

/// Wrap a row's metadata in a dataset payload.
pub fn row_to_dataset(row: &CsvRow, status: DatasetStatus, files: Vec<FileInfo>) -> Dataset {
    Dataset {
        status,
        files,
        metas: csv_row_to_nakala_metas(row),
    }
}

/// Check the publication requirements. Pending datasets always pass.
///
/// Returns whether the dataset is valid and one message per problem.
pub fn validate_dataset(dataset: &Dataset) -> (bool, Vec<String>) {
    let mut errors = Vec::new();

    if dataset.status == DatasetStatus::Published {
        let found: BTreeSet<&str> = dataset.metas.iter().map(|m| m.property_uri.as_str()).collect();

        for property in PUBLICATION_REQUIRED {
            if !found.contains(property.uri()) {
                errors.push(format!(
                    "Missing required field for published status: {}",
                    property.name()
                ));
            }
        }

        if let Some(type_meta) = dataset.metas.iter().find(|m| m.is(Property::Type)) {
            let is_uri = matches!(&type_meta.value, MetaValue::Text(v)
                if v.starts_with("http://") || v.starts_with("https://"));
            if !is_uri {
                errors.push(format!("Type must be full COAR URI, not '{}'", type_meta.value));
            }
        }
    }

    (errors.is_empty(), errors)
}

// =============================================================================
// FILE INPUT
// =============================================================================

/// Read a headered CSV file into rows. Header names are trimmed and a
/// leading byte-order mark is dropped.
pub fn read_csv_rows(path: impl AsRef<Path>) -> Result<Vec<CsvRow>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| NakalaError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(file);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: CsvRow = headers
            .iter()
            .cloned()
            .zip(record.iter().map(str::to_string))
            .collect();
        rows.push(row);
    }

    debug!(path = %path.display(), rows = rows.len(), "read CSV");
    Ok(rows)
}

/// A converted row: its 1-based position, the local files it references and
/// the dataset payload (without uploaded files).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvertedRecord {
    pub row: usize,
    #[serde(default)]
    pub files: Vec<PathBuf>,
    pub dataset: Dataset,
}

/// Convert every row of a CSV file, resolving `files` against the CSV's
/// directory.
pub fn convert_csv(path: impl AsRef<Path>, status: DatasetStatus) -> Result<Vec<ConvertedRecord>> {
    let path = path.as_ref();
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let rows = read_csv_rows(path)?;

    Ok(rows
        .iter()
        .enumerate()
        .map(|(i, row)| ConvertedRecord {
            row: i + 1,
            files: field(row, "files")
                .map(|f| parse_files(f, base_dir))
                .unwrap_or_default(),
            dataset: row_to_dataset(row, status, Vec::new()),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> CsvRow {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn creator_of(meta: &Meta) -> &Creator {
        match &meta.value {
            MetaValue::Creator(c) => c,
            other => panic!("expected creator, got {:?}", other),
        }
    }

    #[test]
    fn test_multilingual_two_languages() {
        let parts = parse_multilingual_field("en: A | fr: B");
        assert_eq!(
            parts,
            vec![
                LangValue { lang: Some("en".into()), value: "A".into() },
                LangValue { lang: Some("fr".into()), value: "B".into() },
            ]
        );
    }

    #[test]
    fn test_multilingual_plain_and_blank() {
        assert_eq!(
            parse_multilingual_field("Plain"),
            vec![LangValue { lang: None, value: "Plain".into() }]
        );
        assert!(parse_multilingual_field("").is_empty());
        assert!(parse_multilingual_field("   ").is_empty());
    }

    #[test]
    fn test_multilingual_splits_on_first_colon_only() {
        let parts = parse_multilingual_field("en: Note: draft");
        assert_eq!(parts[0].lang.as_deref(), Some("en"));
        assert_eq!(parts[0].value, "Note: draft");
    }

    #[test]
    fn test_multilingual_segment_without_tag() {
        let parts = parse_multilingual_field("en: A | B");
        assert_eq!(parts[1], LangValue { lang: None, value: "B".into() });

        let parts = parse_multilingual_field(": orphan");
        assert_eq!(parts[0].lang, None);
        assert_eq!(parts[0].value, "orphan");
    }

    #[test]
    fn test_multiple_values() {
        assert_eq!(parse_multiple_values("a ; b ;c"), vec!["a", "b", "c"]);
        assert_eq!(parse_multiple_values("single"), vec!["single"]);
        assert_eq!(parse_multiple_values(" ; ;"), Vec::<String>::new());
    }

    #[test]
    fn test_normalize_orcid_forms() {
        let expected = Some("0000-0001-2345-6789".to_string());
        assert_eq!(normalize_orcid("https://orcid.org/0000-0001-2345-6789"), expected);
        assert_eq!(normalize_orcid("http://orcid.org/0000-0001-2345-6789"), expected);
        assert_eq!(normalize_orcid("orcid: 0000-0001-2345-6789"), expected);
        assert_eq!(normalize_orcid(" 0000-0001-2345-6789 "), expected);
        assert_eq!(normalize_orcid("0000-0002-1825-009X"), Some("0000-0002-1825-009X".into()));
    }

    #[test]
    fn test_normalize_orcid_rejects_bad_input() {
        assert_eq!(normalize_orcid("bad"), None);
        assert_eq!(normalize_orcid(""), None);
        assert_eq!(normalize_orcid("0000-0001-2345-678"), None);
        assert_eq!(normalize_orcid("0000-0001-2345-67890"), None);
        assert_eq!(normalize_orcid("ÉÉÉ"), None);
    }

    #[test]
    fn test_parse_creator_with_orcid() {
        let metas = parse_creator("Dupont, John (0000-0001-2345-6789)");
        assert_eq!(metas.len(), 1);
        assert!(metas[0].is(Property::Creator));

        let creator = creator_of(&metas[0]);
        assert_eq!(creator.surname, "Dupont");
        assert_eq!(creator.givenname, "John");
        assert_eq!(creator.full_name, "John Dupont");
        assert_eq!(creator.orcid.as_deref(), Some("0000-0001-2345-6789"));
    }

    #[test]
    fn test_parse_creator_several_and_multilingual() {
        let metas = parse_creator("Dupont, John;Lowey, Marc (0000-0002-3456-7890)");
        assert_eq!(metas.len(), 2);
        assert_eq!(creator_of(&metas[1]).surname, "Lowey");

        let metas = parse_creator("en:Dupont, John (0000-0001-2345-6789)|zh:杜工, 尚");
        assert_eq!(metas.len(), 2);
        assert_eq!(creator_of(&metas[1]).surname, "杜工");
        assert_eq!(creator_of(&metas[1]).givenname, "尚");
        assert!(metas.iter().all(|m| m.lang.is_none()));
    }

    #[test]
    fn test_parse_creator_degrades_gracefully() {
        let metas = parse_creator("Plato");
        let creator = creator_of(&metas[0]);
        assert_eq!(creator.surname, "Plato");
        assert_eq!(creator.givenname, "");
        assert_eq!(creator.full_name, "Plato");

        // Right length, wrong shape: the identifier is dropped, the name kept.
        let metas = parse_creator("Dupont, John (0000-0001-2345-67XX)");
        let creator = creator_of(&metas[0]);
        assert_eq!(creator.givenname, "John");
        assert!(creator.orcid.is_none());

        assert!(parse_creator("").is_empty());
    }

    #[test]
    fn test_row_field_order() {
        let row = row(&[
            ("identifier", "doi:1"),
            ("title", "en: Maps | fr: Cartes"),
            ("keywords", "en: a ; b | fr: c"),
            ("creator", "Dupont, John"),
            ("contributor", "Lowey, Marc"),
            ("date", "2024-01-01"),
            ("license", " CC-BY-4.0 "),
            ("type", "http://purl.org/coar/resource_type/c_c513"),
        ]);

        let uris: Vec<&str> = csv_row_to_nakala_metas(&row)
            .iter()
            .map(|m| Property::from_uri(&m.property_uri).unwrap().name())
            .collect();
        assert_eq!(
            uris,
            vec![
                "title", "title", "subject", "subject", "subject", "creator", "contributor", "created",
                "license", "type", "identifier",
            ]
        );
    }

    #[test]
    fn test_row_type_uris_and_trimming() {
        let metas = csv_row_to_nakala_metas(&row(&[
            ("title", "Plain title"),
            ("license", " CC-BY-4.0 "),
            ("type", "http://purl.org/coar/resource_type/c_c513"),
        ]));

        assert_eq!(metas[0].type_uri, None);
        assert_eq!(metas[0].lang, None);
        assert_eq!(metas[1].value.as_text(), Some("CC-BY-4.0"));
        assert_eq!(metas[1].type_uri.as_deref(), Some(XSD_STRING));
        assert_eq!(metas[2].type_uri.as_deref(), Some(DCTERMS_URI));
    }

    #[test]
    fn test_row_fallback_columns() {
        let metas = csv_row_to_nakala_metas(&row(&[("subject", "x;y"), ("created", "1999")]));
        assert_eq!(metas.len(), 3);
        assert!(metas[0].is(Property::Subject));
        assert!(metas[2].is(Property::Created));

        // `keywords` wins over `subject`, `date` over `created`.
        let metas = csv_row_to_nakala_metas(&row(&[
            ("keywords", "k"),
            ("subject", "s"),
            ("date", "2000"),
            ("created", "1999"),
        ]));
        assert_eq!(metas[0].value.as_text(), Some("k"));
        assert_eq!(metas[1].value.as_text(), Some("2000"));
    }

    #[test]
    fn test_row_blank_columns_are_skipped() {
        let metas = csv_row_to_nakala_metas(&row(&[("title", ""), ("license", "   "), ("spatial", "Paris")]));
        assert_eq!(metas.len(), 1);
        assert!(metas[0].is(Property::Spatial));
    }

    #[test]
    fn test_row_conversion_is_repeatable() {
        let row = row(&[
            ("title", "en: A | fr: B"),
            ("creator", "Dupont, John (0000-0001-2345-6789)"),
            ("keywords", "x;y;z"),
            ("temporal", "1900-1950"),
        ]);
        assert_eq!(csv_row_to_nakala_metas(&row), csv_row_to_nakala_metas(&row));
    }

    fn published(metas: Vec<Meta>) -> Dataset {
        Dataset {
            status: DatasetStatus::Published,
            files: Vec::new(),
            metas,
        }
    }

    fn complete_metas() -> Vec<Meta> {
        vec![
            Meta::text(Property::Title, "T"),
            Meta::text(Property::Type, "http://purl.org/coar/resource_type/c_c513"),
            Meta::creator(Property::Creator, Creator::new("J", "D")),
            Meta::text(Property::Created, "2025"),
            Meta::text(Property::License, "CC-BY-4.0"),
        ]
    }

    #[test]
    fn test_validate_complete_published() {
        let (valid, errors) = validate_dataset(&published(complete_metas()));
        assert!(valid);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_validate_missing_license() {
        let mut metas = complete_metas();
        metas.retain(|m| !m.is(Property::License));

        let (valid, errors) = validate_dataset(&published(metas));
        assert!(!valid);
        assert_eq!(errors, vec!["Missing required field for published status: license"]);
    }

    #[test]
    fn test_validate_type_must_be_uri() {
        let mut metas = complete_metas();
        metas[1] = Meta::text(Property::Type, "image");

        let (valid, errors) = validate_dataset(&published(metas));
        assert!(!valid);
        assert_eq!(errors, vec!["Type must be full COAR URI, not 'image'"]);
    }

    #[test]
    fn test_validate_pending_is_always_valid() {
        let dataset = Dataset::default();
        assert_eq!(validate_dataset(&dataset), (true, Vec::new()));
    }
}

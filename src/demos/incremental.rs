// Incremental metadata updates with POST/DELETE /metadatas, contrasted with
// a full PUT. Every scenario runs on its own throwaway collection.

use anyhow::{bail, Result};
use serde_json::Value;

use super::{cleanup_delete, keyword, metas_of, require_created};
use crate::api::ApiClient;
use crate::config::XSD_STRING;
use crate::metadata::{Collection, CollectionStatus, Meta, MetadataFilter, Property, ResourceKind};
use crate::ui::{self, Narrator};

const COLLECTION_TITLE: &str = "Incremental Metadata Test Collection";

struct Scenarios<'a> {
    api: &'a ApiClient,
    narrator: &'a Narrator,
}

pub fn run(api: &ApiClient, narrator: &Narrator) -> Result<()> {
    ui::print_section_header("INCREMENTAL METADATA OPERATIONS");
    println!(
        "
  SCENARIO 1: Add a keyword             POST /metadatas
  SCENARIO 2: Remove English keywords   DELETE /metadatas (filter)
  SCENARIO 3: Add a translated title    POST /metadatas
  SCENARIO 4: Rebuild keywords          DELETE + POST
  SCENARIO 5: PUT dangers               PUT (what NOT to do)
"
    );
    narrator.pause("Press ENTER to start demonstration")?;

    let scenarios = Scenarios { api, narrator };
    scenarios.add_keyword()?;
    narrator.pause("Press ENTER for the next scenario")?;
    scenarios.remove_keywords()?;
    narrator.pause("Press ENTER for the next scenario")?;
    scenarios.add_translation()?;
    narrator.pause("Press ENTER for the next scenario")?;
    scenarios.rebuild_keywords()?;
    narrator.pause("Press ENTER for the next scenario")?;
    scenarios.put_dangers()?;

    ui::print_section_header("DEMONSTRATION COMPLETE");
    println!(
        "
🎯 RULES OF THUMB:
   - Adding a value:          POST /metadatas
   - Removing a category:     DELETE /metadatas with {{propertyUri, lang}}
   - Replacing values:        DELETE (filter) then POST each new value
   - Surgical removal:        GET, filter locally, then PUT the rebuilt array
   - Never use PUT to add a single value
"
    );
    ui::print_method_comparison_table();
    Ok(())
}

fn keyword_values(state: &Value) -> Vec<String> {
    metas_of(state)
        .into_iter()
        .filter(|m| m.is(Property::Subject))
        .map(|m| m.value.to_string())
        .collect()
}

impl Scenarios<'_> {
    /// Create a private collection holding `keywords`, run `scenario` on it
    /// and delete it whatever the outcome.
    fn with_collection<F>(&self, keywords: &[&str], scenario: F) -> Result<()>
    where
        F: FnOnce(&str) -> Result<()>,
    {
        let mut metas = vec![
            Meta::text(Property::Title, COLLECTION_TITLE).with_lang(Some("en")),
            Meta::text(Property::Description, "Demonstration of incremental metadata operations")
                .with_type(XSD_STRING)
                .with_lang(Some("en")),
        ];
        metas.extend(keywords.iter().map(|k| keyword(k, "en")));
        let collection = Collection {
            status: CollectionStatus::Private,
            metas,
            datas: Vec::new(),
        };

        ui::print_info("Creating test collection...");
        let response = self
            .narrator
            .call("POST", "/collections", || self.api.create_collection(&collection))?;
        let id = require_created(&response, "collection")?;
        self.narrator.rate_limit();

        let outcome = scenario(&id);

        let endpoint = format!("/collections/{}", id);
        cleanup_delete(self.narrator, &endpoint, || self.api.delete_collection(&id));
        outcome
    }

    fn state(&self, id: &str) -> Result<Value> {
        match self.narrator.fetch(self.api, &format!("/collections/{}", id))? {
            Some(state) => Ok(state),
            None => bail!("collection {} could not be retrieved", id),
        }
    }

    fn post_meta(&self, id: &str, meta: &Meta) -> Result<bool> {
        let endpoint = format!("/collections/{}/metadatas", id);
        let response = self.narrator.call("POST", &endpoint, || {
            self.api.add_metadata(ResourceKind::Collection, id, meta)
        })?;
        if !response.is_any(&[200, 201, 204]) {
            ui::print_error(&format!("POST /metadatas failed: {}", response.code()));
        }
        self.narrator.rate_limit();
        Ok(response.is_success())
    }

    fn delete_filter(&self, id: &str, filter: &MetadataFilter) -> Result<bool> {
        ui::print_info("📦 DELETE /metadatas payload (filter format):");
        ui::print_json(&serde_json::to_value(filter)?);
        let endpoint = format!("/collections/{}/metadatas", id);
        let response = self.narrator.call("DELETE", &endpoint, || {
            self.api.remove_metadata(ResourceKind::Collection, id, filter)
        })?;
        if !response.is_any(&[200, 204]) {
            ui::print_warning(&format!("DELETE /metadatas returned: {}", response.code()));
        }
        self.narrator.rate_limit();
        Ok(response.is_success())
    }

    fn add_keyword(&self) -> Result<()> {
        ui::print_section_header("SCENARIO 1: Add Keyword (POST /metadatas)");
        self.with_collection(&["digital humanities"], |id| {
            let before = self.state(id)?;
            ui::print_info(&format!("Keywords: {:?}", keyword_values(&before)));

            ui::print_step_header(1, "Add keyword with POST /metadatas", "POST");
            if self.post_meta(id, &keyword("metadata", "en"))? {
                ui::print_success("Keyword added; everything else preserved");
            }
            let after = self.state(id)?;
            ui::print_json_comparison(&before, &after, "POST /metadatas");
            Ok(())
        })
    }

    fn remove_keywords(&self) -> Result<()> {
        ui::print_section_header("SCENARIO 2: Remove Keywords (DELETE /metadatas)");
        ui::print_warning("DELETE /metadatas removes EVERY entry matching the filter, not one value");
        self.with_collection(&["digital humanities", "research", "temporary"], |id| {
            let before = self.state(id)?;
            ui::print_info(&format!("Keywords: {:?}", keyword_values(&before)));

            ui::print_step_header(1, "Remove keyword with DELETE /metadatas", "DELETE");
            if self.delete_filter(id, &MetadataFilter::new(Property::Subject, Some("en")))? {
                ui::print_success("All English keywords removed");
            }
            let after = self.state(id)?;
            ui::print_json_comparison(&before, &after, "DELETE /metadatas (filter)");
            Ok(())
        })
    }

    fn add_translation(&self) -> Result<()> {
        ui::print_section_header("SCENARIO 3: Add Translation (POST /metadatas)");
        self.with_collection(&["digital humanities"], |id| {
            let before = self.state(id)?;

            ui::print_step_header(1, "Add French title with POST /metadatas", "POST");
            let french = Meta::text(Property::Title, "Collection de test des métadonnées incrémentales")
                .with_lang(Some("fr"));
            if self.post_meta(id, &french)? {
                ui::print_success("French title added next to the English one");
            }
            let after = self.state(id)?;
            println!("{}", ui::format_metadata_for_display(&metas_of(&after)));
            ui::print_json_comparison(&before, &after, "MULTILINGUAL TITLE");
            Ok(())
        })
    }

    fn rebuild_keywords(&self) -> Result<()> {
        ui::print_section_header("SCENARIO 4: Rebuild Keywords (DELETE + POST pattern)");
        self.with_collection(&["research", "draft", "2025"], |id| {
            let before = self.state(id)?;
            ui::print_info(&format!("Keywords: {:?}", keyword_values(&before)));
            self.narrator.pause("Press ENTER to CLEAR all keywords and REBUILD")?;

            ui::print_step_header(1, "Delete old values", "DELETE");
            ui::print_warning("This deletes ALL English keywords, not just 'draft'!");
            if !self.delete_filter(id, &MetadataFilter::new(Property::Subject, Some("en")))? {
                ui::print_warning("DELETE failed; continuing with POST to show the pattern");
            }

            ui::print_step_header(2, "Add new keywords", "POST");
            for value in ["published", "open science"] {
                self.post_meta(id, &keyword(value, "en"))?;
            }

            let after = self.state(id)?;
            ui::print_info(&format!("Keywords after DELETE + POST: {:?}", keyword_values(&after)));
            ui::print_json_comparison(&before, &after, "DELETE + POST REBUILD");
            Ok(())
        })
    }

    fn put_dangers(&self) -> Result<()> {
        ui::print_section_header("SCENARIO 5: PUT Dangers (What NOT to do)");
        self.with_collection(&["research", "metadata", "digital humanities"], |id| {
            let before = self.state(id)?;
            println!("{}", ui::format_metadata_for_display(&metas_of(&before)));
            ui::print_info(&format!("Total metadata entries: {}", metas_of(&before).len()));
            self.narrator.pause("Press ENTER to see what happens with PUT (DANGER!)")?;

            ui::print_step_header(1, "Add keyword with PUT (WRONG!)", "PUT");
            let replacement = Collection {
                status: CollectionStatus::Private,
                metas: vec![
                    Meta::text(Property::Title, COLLECTION_TITLE).with_lang(Some("en")),
                    keyword("new keyword", "en"),
                ],
                datas: Vec::new(),
            };
            ui::print_info("📦 PUT payload:");
            ui::print_json(&serde_json::to_value(&replacement)?);
            ui::print_error(&format!(
                "Only {} metadata entries in payload, original had {}!",
                replacement.metas.len(),
                metas_of(&before).len()
            ));

            let endpoint = format!("/collections/{}", id);
            let response = self
                .narrator
                .call("PUT", &endpoint, || self.api.modify_collection(id, &replacement))?;
            if response.code() != 204 {
                ui::print_error(&format!("PUT failed: {}", response.code()));
                return Ok(());
            }

            self.narrator.rate_limit();
            let after = self.state(id)?;
            ui::print_json_comparison(&before, &after, "PUT RESULT");
            ui::print_error("DISASTER: description and original keywords are gone for good");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keyword_values_only_lists_subjects() {
        let state = json!({"metas": [
            {"propertyUri": "http://nakala.fr/terms#title", "value": "T"},
            {"propertyUri": "http://purl.org/dc/terms/subject", "value": "research", "lang": "en"},
            {"propertyUri": "http://purl.org/dc/terms/subject", "value": "draft", "lang": "en"}
        ]});
        assert_eq!(keyword_values(&state), vec!["research", "draft"]);
    }
}

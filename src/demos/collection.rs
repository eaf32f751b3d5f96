// Collection lifecycle: creation, incremental metadata, affectation of a
// dataset, status change, désaffectation, filtered metadata removal, the
// lossy PUT and final deletion.

use anyhow::{bail, Result};
use serde_json::Value;

use super::{cleanup_delete, count_property, create_pending_dataset, keyword, metas_of, require_created};
use crate::api::ApiClient;
use crate::config::XSD_STRING;
use crate::metadata::{Collection, CollectionStatus, Meta, MetadataFilter, Property, ResourceKind};
use crate::ui::{self, Narrator};

const KEYWORDS: [&str; 3] = ["API demonstration", "Collection lifecycle", "HTTP methods"];

struct CollectionDemo<'a> {
    api: &'a ApiClient,
    narrator: &'a Narrator,
    collection_id: String,
    dataset_id: Option<String>,
    collection_deleted: bool,
}

pub fn run(api: &ApiClient, narrator: &Narrator) -> Result<()> {
    ui::print_section_header("NAKALA COLLECTION LIFECYCLE DEMONSTRATION");
    println!(
        "
  1. POST            - Create new collection
  2. POST /metadatas - Add keywords incrementally
  3. POST            - Create a dataset and link it (affectation)
  4. PUT /status     - Make the collection public
  5. DELETE          - Unlink the dataset (désaffectation)
  6. DELETE /metadatas - Remove keywords with a filter
  7. PUT             - Full replacement (shows data loss)
  8. DELETE          - Delete the collection
"
    );
    narrator.pause("Press ENTER to start demonstration")?;

    let collection_id = step_create(api, narrator)?;
    let mut demo = CollectionDemo {
        api,
        narrator,
        collection_id,
        dataset_id: None,
        collection_deleted: false,
    };

    let outcome = demo.steps();
    demo.cleanup();
    outcome?;

    ui::print_section_header("DEMONSTRATION COMPLETE");
    println!(
        "
📚 KEY TAKEAWAYS:
   - POST /collections/{{id}}/metadatas adds entries without touching others
   - DELETE /collections/{{id}}/metadatas removes EVERY entry matching the filter
   - PUT /collections/{{id}}/status/{{status}} changes status only
   - Désaffectation unlinks a dataset; the dataset itself survives
   - PUT /collections/{{id}} replaces all metadata
"
    );
    Ok(())
}

fn step_create(api: &ApiClient, narrator: &Narrator) -> Result<String> {
    ui::print_step_header(1, "Create New Collection", "POST");

    let collection = Collection {
        status: CollectionStatus::Private,
        metas: vec![
            Meta::text(Property::Title, "Demo Collection - Lifecycle Test").with_lang(Some("en")),
            Meta::text(Property::Description, "This collection demonstrates HTTP method lifecycle")
                .with_type(XSD_STRING)
                .with_lang(Some("en")),
        ],
        datas: Vec::new(),
    };
    ui::print_info("📦 Collection payload:");
    ui::print_info(&format!("   Status: {}", collection.status));
    ui::print_info(&format!("   Metadata fields: {}", collection.metas.len()));
    println!("{}", ui::format_metadata_for_display(&collection.metas));

    let response = narrator.call("POST", "/collections", || api.create_collection(&collection))?;
    require_created(&response, "collection")
}

impl CollectionDemo<'_> {
    fn endpoint(&self) -> String {
        format!("/collections/{}", self.collection_id)
    }

    fn fetch(&self) -> Result<Value> {
        match self.narrator.fetch(self.api, &self.endpoint())? {
            Some(state) => Ok(state),
            None => bail!("collection {} could not be retrieved", self.collection_id),
        }
    }

    fn steps(&mut self) -> Result<()> {
        self.narrator.next_step()?;
        self.step_add_keywords()?;
        self.narrator.next_step()?;
        self.step_link_dataset()?;
        self.narrator.next_step()?;
        self.step_status_public()?;
        self.narrator.next_step()?;
        self.step_desaffectation()?;
        self.narrator.next_step()?;
        self.step_remove_keywords()?;
        self.narrator.next_step()?;
        self.step_put_replacement()?;
        self.narrator.next_step()?;
        self.step_delete()
    }

    fn step_add_keywords(&self) -> Result<()> {
        ui::print_step_header(2, "Add Metadata Incrementally", "POST /metadatas");
        ui::print_info("Adding individual entries without affecting existing metadata");

        let endpoint = format!("{}/metadatas", self.endpoint());
        for value in KEYWORDS {
            let meta = keyword(value, "en");
            let response = self.narrator.call("POST", &endpoint, || {
                self.api.add_metadata(ResourceKind::Collection, &self.collection_id, &meta)
            })?;
            if response.is_any(&[200, 201, 204]) {
                ui::print_success(&format!("Added: {}", value));
            } else {
                ui::print_error(&format!("Failed to add keyword: {}", response.code()));
            }
            self.narrator.rate_limit();
        }

        let state = self.fetch()?;
        ui::print_success(&format!("Total metadata entries now: {}", metas_of(&state).len()));
        ui::print_success("Original metadata (title, description) preserved");
        Ok(())
    }

    fn step_link_dataset(&mut self) -> Result<()> {
        ui::print_step_header(3, "Create Dataset & Link to Collection", "POST");
        ui::print_info("NAKALA datasets need at least one file, so one is uploaded first.");

        let dataset_id = create_pending_dataset(self.api, self.narrator, "Demo Dataset - Collection Member", "member.txt", Vec::new())?;
        self.dataset_id = Some(dataset_id.clone());
        // Freshly created datasets are not immediately linkable.
        self.narrator.wait(std::time::Duration::from_secs(2), "Waiting for the dataset to settle...");

        let endpoint = format!("/datas/{}/collections", dataset_id);
        let collections = vec![self.collection_id.clone()];
        let response = self
            .narrator
            .call("POST", &endpoint, || self.api.link_collections(&dataset_id, &collections))?;
        if !response.is_any(&[200, 201, 204]) {
            ui::print_error(&response.body_excerpt(300));
            bail!("affectation failed with status {}", response.code());
        }
        ui::print_success("Dataset linked to the collection (affectation)");
        Ok(())
    }

    fn step_status_public(&self) -> Result<()> {
        ui::print_step_header(4, "Update Collection Status", "PUT /status/{status}");
        ui::print_warning("PATCH /collections/{id} is NOT supported (405); using the status endpoint");

        let before = self.fetch()?;
        let endpoint = format!("{}/status/public", self.endpoint());
        let response = self.narrator.call("PUT", &endpoint, || {
            self.api.set_collection_status(&self.collection_id, CollectionStatus::Public)
        })?;

        match response.code() {
            204 => {
                ui::print_success("Status updated to 'public'");
                self.narrator.rate_limit();
                let after = self.fetch()?;
                ui::print_json_comparison(&before, &after, "STATUS CHANGE");
            }
            422 => {
                ui::print_warning("422: a public collection cannot hold pending datasets (expected)");
                ui::print_info("Publish the datasets first, or keep the collection private.");
            }
            code => ui::print_warning(&format!("Status update returned: {}", code)),
        }
        Ok(())
    }

    fn step_desaffectation(&self) -> Result<()> {
        ui::print_step_header(5, "Remove Dataset from Collection (Désaffectation)", "DELETE");
        let Some(dataset_id) = self.dataset_id.as_deref() else {
            ui::print_warning("No dataset to unlink");
            return Ok(());
        };

        let before = self.fetch()?;
        let endpoint = format!("/datas/{}/collections", dataset_id);
        let collections = vec![self.collection_id.clone()];
        let response = self
            .narrator
            .call("DELETE", &endpoint, || self.api.unlink_collections(dataset_id, &collections))?;
        if response.is_any(&[200, 204]) {
            ui::print_success("Dataset removed from the collection; it still exists on the server");
            self.narrator.rate_limit();
            let after = self.fetch()?;
            ui::print_json_comparison(&before, &after, "DÉSAFFECTATION");
        } else {
            ui::print_warning(&format!("Désaffectation returned: {}", response.code()));
        }
        Ok(())
    }

    fn step_remove_keywords(&self) -> Result<()> {
        ui::print_step_header(6, "Remove Metadata Entries by Filter", "DELETE /metadatas");

        let before = self.fetch()?;
        let Some(first) = metas_of(&before).into_iter().find(|m| m.is(Property::Subject)) else {
            ui::print_warning("No keywords found to delete");
            return Ok(());
        };
        let filter = MetadataFilter::new(Property::Subject, first.lang.as_deref());
        ui::print_info(&format!("Current keyword to filter: '{}'", first.value));
        ui::print_info("📦 DELETE filter:");
        ui::print_json(&serde_json::to_value(&filter)?);
        ui::print_warning("This removes ALL keywords with this propertyUri + lang");

        let endpoint = format!("{}/metadatas", self.endpoint());
        let response = self.narrator.call("DELETE", &endpoint, || {
            self.api.remove_metadata(ResourceKind::Collection, &self.collection_id, &filter)
        })?;
        if !response.is_any(&[200, 204]) {
            ui::print_error(&format!("Delete metadata failed: {}", response.code()));
            ui::print_info(&response.body_excerpt(200));
            return Ok(());
        }
        ui::print_success("All matching keywords removed");

        self.narrator.rate_limit();
        let after = self.fetch()?;
        ui::print_success(&format!(
            "Metadata count: {} → {}",
            metas_of(&before).len(),
            metas_of(&after).len()
        ));
        ui::print_json_comparison(&before, &after, "FILTERED DELETE");
        Ok(())
    }

    fn step_put_replacement(&self) -> Result<()> {
        ui::print_step_header(7, "Full Replacement - DANGEROUS!", "PUT");
        ui::print_warning("PUT REPLACES EVERYTHING! The description is left out on purpose.");

        let before = self.fetch()?;
        let replacement = Collection {
            status: CollectionStatus::Private,
            metas: vec![Meta::text(Property::Title, "Demo Collection - PUT Replacement").with_lang(Some("en"))],
            datas: Vec::new(),
        };
        let endpoint = self.endpoint();
        let response = self.narrator.call("PUT", &endpoint, || {
            self.api.modify_collection(&self.collection_id, &replacement)
        })?;
        if response.code() != 204 {
            ui::print_error(&format!("PUT failed: {}", response.code()));
            return Ok(());
        }

        self.narrator.rate_limit();
        let after = self.fetch()?;
        ui::print_json_comparison(&before, &after, "PUT RESULT - Data Loss Demonstration");
        if count_property(&after, Property::Description) == 0 {
            ui::print_error("Description field: DELETED");
        }
        Ok(())
    }

    fn step_delete(&mut self) -> Result<()> {
        ui::print_step_header(8, "Delete Entire Collection", "DELETE");
        ui::print_info("Linked datasets are NOT deleted with the collection.");
        self.delete_collection();
        Ok(())
    }

    fn delete_collection(&mut self) {
        let endpoint = self.endpoint();
        if !cleanup_delete(self.narrator, &endpoint, || self.api.delete_collection(&self.collection_id)) {
            return;
        }
        self.collection_deleted = true;
        self.narrator.rate_limit();
        match self.api.get_collection(&self.collection_id) {
            Ok(None) => ui::print_success("Confirmed: collection no longer exists"),
            Ok(Some(_)) => ui::print_warning("Collection still exists"),
            Err(e) => ui::print_warning(&format!("Could not verify deletion: {:#}", e)),
        }
    }

    fn cleanup(&mut self) {
        ui::print_section_header("CLEANUP");
        if !self.collection_deleted {
            self.delete_collection();
        }
        if let Some(dataset_id) = self.dataset_id.take() {
            let endpoint = format!("/datas/{}", dataset_id);
            cleanup_delete(self.narrator, &endpoint, || self.api.delete_dataset(&dataset_id));
        }
    }
}

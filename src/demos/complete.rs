// End-to-end workflow: file upload, dataset, incremental metadata,
// collection, affectation, status change, désaffectation and cleanup.

use std::time::Duration;

use anyhow::{bail, Context, Result};

use super::{cleanup_delete, keyword, metas_of, require_created, required_metas, upload_dummy};
use crate::api::ApiClient;
use crate::config::XSD_STRING;
use crate::metadata::{
    Collection, CollectionStatus, Dataset, DatasetStatus, FileInfo, Meta, Property, ResourceKind,
};
use crate::ui::{self, Narrator};

const DATASET_KEYWORDS: [&str; 4] = ["Demonstration", "NAKALA", "Lifecycle", "Complete workflow"];
const COLLECTION_TAGS: [&str; 3] = ["demonstration", "tutorial", "complete-workflow"];

#[derive(Default)]
struct Created {
    file: Option<FileInfo>,
    dataset_id: Option<String>,
    collection_id: Option<String>,
}

struct CompleteDemo<'a> {
    api: &'a ApiClient,
    narrator: &'a Narrator,
    created: Created,
}

pub fn run(api: &ApiClient, narrator: &Narrator) -> Result<()> {
    ui::print_section_header("COMPLETE NAKALA LIFECYCLE DEMONSTRATION");
    println!(
        "
  PART 1 - DATASET:     upload file, create dataset, add metadata
  PART 2 - COLLECTION:  create collection, link dataset, tag, change status
  PART 3 - CLEANUP:     désaffectation, delete everything, verify
"
    );
    narrator.pause("Press ENTER to start demonstration")?;

    let mut demo = CompleteDemo {
        api,
        narrator,
        created: Created::default(),
    };
    let outcome = demo.steps();
    demo.cleanup();
    outcome?;

    ui::print_section_header("DEMONSTRATION COMPLETE");
    print_summary();
    Ok(())
}

impl CompleteDemo<'_> {
    fn steps(&mut self) -> Result<()> {
        self.step_upload()?;
        self.narrator.next_step()?;
        self.step_create_dataset()?;
        self.narrator.next_step()?;
        self.step_dataset_metadata()?;
        self.narrator.next_step()?;
        self.step_create_collection()?;
        self.narrator.next_step()?;
        self.step_affectation()?;
        self.narrator.next_step()?;
        self.step_collection_tags()?;
        self.narrator.next_step()?;
        self.step_collection_status()?;
        self.narrator.next_step()?;
        self.step_desaffectation()?;
        self.narrator.next_step()
    }

    fn dataset_id(&self) -> Result<&str> {
        self.created.dataset_id.as_deref().context("no dataset was created")
    }

    fn collection_id(&self) -> Result<&str> {
        self.created.collection_id.as_deref().context("no collection was created")
    }

    fn step_upload(&mut self) -> Result<()> {
        ui::print_step_header(1, "Upload File to NAKALA", "POST /datas/uploads");
        ui::print_info("Files are uploaded first; the returned object goes into the dataset payload.");
        let file = upload_dummy(
            self.api,
            "complete-lifecycle.txt",
            "Sample file for the complete NAKALA lifecycle demonstration",
        )?;
        ui::print_info(&format!("   Name: {}", file.name));
        if let Some(embargoed) = &file.embargoed {
            ui::print_info(&format!("   Embargoed until: {}", embargoed));
        }
        self.created.file = Some(file);
        Ok(())
    }

    fn step_create_dataset(&mut self) -> Result<()> {
        ui::print_step_header(2, "Create Dataset with File", "POST /datas");
        let file = self.created.file.clone().context("no uploaded file")?;

        let dataset = Dataset {
            status: DatasetStatus::Pending,
            files: vec![file],
            metas: required_metas("Complete Lifecycle Demo Dataset"),
        };
        ui::print_info("Mandatory fields: title, type, creator, created, license");
        println!("{}", ui::format_metadata_for_display(&dataset.metas));

        let response = self
            .narrator
            .call("POST", "/datas", || self.api.create_dataset(&dataset))?;
        self.created.dataset_id = Some(require_created(&response, "dataset")?);
        Ok(())
    }

    fn step_dataset_metadata(&self) -> Result<()> {
        ui::print_step_header(3, "Add Dataset Metadata Incrementally", "POST /metadatas");
        ui::print_success("Using POST /metadatas - existing metadata is preserved");

        let dataset_id = self.dataset_id()?;
        let endpoint = format!("/datas/{}/metadatas", dataset_id);

        let mut additions = vec![Meta::text(
            Property::Description,
            "This dataset demonstrates the complete NAKALA workflow from file upload to collection management.",
        )
        .with_lang(Some("en"))
        .with_type(XSD_STRING)];
        additions.extend(DATASET_KEYWORDS.iter().map(|k| keyword(k, "en")));

        for meta in &additions {
            let response = self.narrator.call("POST", &endpoint, || {
                self.api.add_metadata(ResourceKind::Dataset, dataset_id, meta)
            })?;
            if response.is_any(&[200, 201, 204]) {
                ui::print_success(&format!("Added {}: {}", meta.property_name(), meta.value));
            } else {
                ui::print_error(&format!("Failed: {}", response.code()));
            }
            self.narrator.rate_limit();
        }

        if let Some(state) = self.narrator.fetch(self.api, &format!("/datas/{}", dataset_id))? {
            ui::print_success(&format!("Dataset now has {} metadata entries", metas_of(&state).len()));
        }
        Ok(())
    }

    fn step_create_collection(&mut self) -> Result<()> {
        ui::print_step_header(4, "Create Collection", "POST /collections");
        let collection = Collection {
            status: CollectionStatus::Private,
            metas: vec![
                Meta::text(Property::Title, "Complete Lifecycle Demo Collection").with_lang(Some("en")),
                Meta::text(Property::Description, "Collection created by the complete lifecycle demonstration")
                    .with_lang(Some("en"))
                    .with_type(XSD_STRING),
            ],
            datas: Vec::new(),
        };
        let response = self
            .narrator
            .call("POST", "/collections", || self.api.create_collection(&collection))?;
        self.created.collection_id = Some(require_created(&response, "collection")?);
        Ok(())
    }

    fn step_affectation(&self) -> Result<()> {
        ui::print_step_header(5, "Link Dataset to Collection (Affectation)", "POST /datas/{id}/collections");
        let dataset_id = self.dataset_id()?;
        let collection_id = self.collection_id()?;

        self.narrator
            .wait(Duration::from_secs(2), "Waiting for the dataset to be indexed...");
        let collections = vec![collection_id.to_string()];
        let response = self.narrator.call("POST", &format!("/datas/{}/collections", dataset_id), || {
            self.api.link_collections(dataset_id, &collections)
        })?;
        if !response.is_any(&[200, 201, 204]) {
            ui::print_error(&response.body_excerpt(300));
            bail!("affectation failed with status {}", response.code());
        }
        ui::print_success("Dataset linked to collection");

        self.narrator.rate_limit();
        if let Some(state) = self.narrator.fetch(self.api, &format!("/collections/{}", collection_id))? {
            let linked = state.get("datas").and_then(|d| d.as_array()).map_or(0, Vec::len);
            ui::print_success(&format!("Collection now holds {} dataset(s)", linked));
        }
        Ok(())
    }

    fn step_collection_tags(&self) -> Result<()> {
        ui::print_step_header(6, "Add Collection Metadata", "POST /metadatas");
        let collection_id = self.collection_id()?;
        let endpoint = format!("/collections/{}/metadatas", collection_id);

        for tag in COLLECTION_TAGS {
            let meta = keyword(tag, "en");
            let response = self.narrator.call("POST", &endpoint, || {
                self.api.add_metadata(ResourceKind::Collection, collection_id, &meta)
            })?;
            if response.is_any(&[200, 201, 204]) {
                ui::print_success(&format!("Added: {}", tag));
            } else {
                ui::print_warning(&format!("Tag '{}' not added: {}", tag, response.code()));
            }
            self.narrator.rate_limit();
        }
        Ok(())
    }

    fn step_collection_status(&self) -> Result<()> {
        ui::print_step_header(7, "Update Collection Status", "PUT /status/{status}");
        let collection_id = self.collection_id()?;

        let response = self.narrator.call("PUT", &format!("/collections/{}/status/public", collection_id), || {
            self.api.set_collection_status(collection_id, CollectionStatus::Public)
        })?;
        match response.code() {
            204 => {
                ui::print_success("Status updated to 'public'");
                self.narrator.rate_limit();
                if let Some(state) = self.api.get_collection(collection_id)? {
                    ui::print_success(&format!(
                        "Current status: {}",
                        state.get("status").and_then(|s| s.as_str()).unwrap_or("unknown")
                    ));
                }
            }
            422 => {
                ui::print_warning("Status update refused as expected (422 Unprocessable Entity)");
                ui::print_info("Public collections may only contain PUBLISHED datasets.");
                ui::print_success("Validation rule verified");
            }
            code => ui::print_error(&format!("Status update failed: {}", code)),
        }
        Ok(())
    }

    fn step_desaffectation(&self) -> Result<()> {
        ui::print_step_header(8, "Remove Dataset from Collection (Désaffectation)", "DELETE /datas/{id}/collections");
        let dataset_id = self.dataset_id()?;
        let collection_id = self.collection_id()?;

        let collections = vec![collection_id.to_string()];
        let response = self.narrator.call("DELETE", &format!("/datas/{}/collections", dataset_id), || {
            self.api.unlink_collections(dataset_id, &collections)
        })?;
        if !response.is_any(&[200, 204]) {
            ui::print_warning(&format!("Désaffectation returned: {}", response.code()));
            return Ok(());
        }
        ui::print_success("Dataset removed from collection");

        self.narrator.rate_limit();
        if self.api.get_dataset(dataset_id)?.is_some() {
            ui::print_success("Dataset still exists on the server (désaffectation is not deletion)");
        }
        Ok(())
    }

    fn cleanup(&mut self) {
        ui::print_step_header(9, "Cleanup Resources", "DELETE");

        if let Some(collection_id) = self.created.collection_id.take() {
            let endpoint = format!("/collections/{}", collection_id);
            cleanup_delete(self.narrator, &endpoint, || self.api.delete_collection(&collection_id));
            self.narrator.rate_limit();
        }

        if let Some(dataset_id) = self.created.dataset_id.take() {
            let endpoint = format!("/datas/{}", dataset_id);
            cleanup_delete(self.narrator, &endpoint, || self.api.delete_dataset(&dataset_id));
            self.narrator.rate_limit();
            match self.api.get_dataset(&dataset_id) {
                Ok(None) => ui::print_success("Confirmed: dataset no longer exists (404)"),
                Ok(Some(_)) => ui::print_warning("Dataset still exists"),
                Err(e) => ui::print_warning(&format!("Could not verify deletion: {:#}", e)),
            }
        }
    }
}

fn print_summary() {
    println!(
        "
✓ Successfully demonstrated the complete NAKALA lifecycle!

📚 KEY TAKEAWAYS:

1. FILE UPLOAD: upload first, then include the returned file object in the dataset
2. DATASET CREATION: 5 mandatory fields and at least one file; start as 'pending'
3. INCREMENTAL METADATA: POST /metadatas adds, DELETE /metadatas removes by filter
4. COLLECTIONS: organise datasets; a dataset may belong to several
5. AFFECTATION / DÉSAFFECTATION: link and unlink without deleting the dataset
6. STATUS: PUT /status/{{status}}; published datasets can never be deleted

🎯 WORKFLOW:
   Upload File → Create Dataset → Add Metadata → Create Collection
   → Link (affectation) → Manage Collection → Unlink (désaffectation) → Cleanup
"
    );
}

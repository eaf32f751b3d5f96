// Dataset lifecycle: POST, GET, the rejected PATCH, the lossy PUT, and
// DELETE on published versus pending datasets.

use std::cell::Cell;

use anyhow::{bail, Result};
use serde_json::json;

use super::{cleanup_delete, count_property, create_pending_dataset, keyword, metas_of, require_created, required_metas, upload_dummy};
use crate::api::ApiClient;
use crate::config::XSD_STRING;
use crate::metadata::{Dataset, DatasetStatus, Meta, Property};
use crate::ui::{self, Narrator};

struct DatasetDemo<'a> {
    api: &'a ApiClient,
    narrator: &'a Narrator,
    dataset_id: String,
    /// Set once publication succeeds; a published dataset cannot be removed.
    published: Cell<bool>,
}

pub fn run(api: &ApiClient, narrator: &Narrator) -> Result<()> {
    ui::print_section_header("NAKALA DATASET LIFECYCLE DEMONSTRATION");
    println!(
        "
  1. POST   - Create new dataset
  2. GET    - Verify creation
  3. PATCH  - Attempt (learn API limitation)
  4. PUT    - Full replacement (shows data loss)
  5. DELETE - Attempt on published (blocked)
  6. DELETE - Success on pending (allowed)

⚠️  Datasets do NOT support PATCH. Use POST/DELETE on /metadatas instead.
"
    );
    narrator.pause("Press ENTER to start demonstration")?;

    let dataset_id = step_create(api, narrator)?;
    let demo = DatasetDemo {
        api,
        narrator,
        dataset_id,
        published: Cell::new(false),
    };
    let outcome = demo.steps();
    if !demo.published.get() {
        ui::print_section_header("CLEANUP");
        let endpoint = demo.endpoint();
        cleanup_delete(narrator, &endpoint, || api.delete_dataset(&demo.dataset_id));
    }
    outcome?;

    ui::print_section_header("DEMONSTRATION COMPLETE");
    println!(
        "
📚 KEY TAKEAWAYS:
   - POST creates datasets and returns their identifier
   - GET is the safe way to verify every change
   - PATCH answers 405 on datasets
   - PUT replaces ALL metadata; missing fields are deleted
   - DELETE works on pending datasets only
"
    );
    ui::print_method_comparison_table();
    ui::print_status_lifecycle();
    Ok(())
}

fn step_create(api: &ApiClient, narrator: &Narrator) -> Result<String> {
    ui::print_step_header(1, "Create New Dataset", "POST");
    ui::print_info("Creating a dataset with status='pending' so it can be deleted later.");
    ui::print_info("Uploading a minimal dummy file (required by NAKALA)...");

    let file = upload_dummy(api, "demo.txt", "Demo file for dataset lifecycle demonstration")?;
    narrator.rate_limit();

    let mut metas = required_metas("Demo Dataset - Lifecycle Test");
    metas.push(
        Meta::text(
            Property::Description,
            "This dataset demonstrates the complete lifecycle: POST → PATCH → PUT → DELETE",
        )
        .with_type(XSD_STRING)
        .with_lang(Some("en")),
    );
    metas.push(keyword("lifecycle-demo", "en"));

    ui::print_info("\n📦 Dataset payload:");
    ui::print_info("   Status: pending");
    ui::print_info(&format!("   Files: 1 ({})", file.name));
    ui::print_info(&format!("   Metadata fields: {}", metas.len()));
    ui::print_info("\n📋 Metadata:");
    println!("{}", ui::format_metadata_for_display(&metas));

    let dataset = Dataset {
        status: DatasetStatus::Pending,
        files: vec![file],
        metas,
    };
    let response = narrator.call("POST", "/datas", || api.create_dataset(&dataset))?;
    require_created(&response, "dataset")
}

impl DatasetDemo<'_> {
    fn steps(&self) -> Result<()> {
        self.narrator.next_step()?;
        let created = self.step_verify()?;
        self.narrator.next_step()?;
        self.step_patch_attempt()?;
        self.narrator.next_step()?;
        self.step_put_replacement(&created)?;
        self.narrator.next_step()?;
        self.step_delete_published()?;
        self.narrator.next_step()?;
        self.step_delete_pending()
    }

    fn endpoint(&self) -> String {
        format!("/datas/{}", self.dataset_id)
    }

    fn step_verify(&self) -> Result<serde_json::Value> {
        ui::print_step_header(2, "Verify Dataset Creation", "GET");

        let Some(state) = self.narrator.fetch(self.api, &self.endpoint())? else {
            bail!("dataset {} could not be retrieved", self.dataset_id);
        };
        ui::print_success("Dataset retrieved successfully!");
        ui::print_info(&format!("   ID: {}", self.dataset_id));
        if let Some(status) = state.get("status").and_then(|s| s.as_str()) {
            ui::print_info(&format!("   Status: {}", status));
        }
        let metas = metas_of(&state);
        ui::print_info(&format!("   Metadata entries: {}", metas.len()));
        ui::print_info(&format!(
            "   Files: {}",
            state.get("files").and_then(|f| f.as_array()).map_or(0, Vec::len)
        ));
        ui::print_info("\n📋 Metadata:");
        println!("{}", ui::format_metadata_for_display(&metas));
        Ok(state)
    }

    fn step_patch_attempt(&self) -> Result<()> {
        ui::print_step_header(3, "Attempt PATCH - Learn API Limitation", "PATCH");
        ui::print_warning("PATCH is NOT supported for datasets in NAKALA API");
        ui::print_info("Let's try PATCH to see the error response...");

        let patch = json!({
            "metas": [Meta::text(Property::Title, "Demo Dataset - Lifecycle Demonstration").with_lang(Some("en"))]
        });
        ui::print_info("\n📦 PATCH payload (partial):");
        ui::print_json(&patch);

        let response = self.narrator.request(self.api, "PATCH", &self.endpoint(), Some(&patch))?;
        if response.code() == 405 {
            ui::print_warning(&format!("Expected result: {} Method Not Allowed", response.code()));
            ui::print_info("💡 For incremental updates use POST/DELETE /datas/{id}/metadatas");
            ui::print_info("   For a full replacement use PUT (it replaces everything!)");
        } else {
            ui::print_error(&format!("Unexpected response: {}", response.code()));
            ui::print_error(&response.body_excerpt(300));
        }
        Ok(())
    }

    fn step_put_replacement(&self, before: &serde_json::Value) -> Result<()> {
        ui::print_step_header(4, "Full Replacement - DANGEROUS!", "PUT");
        ui::print_warning("PUT REPLACES EVERYTHING!");
        ui::print_warning("Any metadata not included in the PUT request will be DELETED!");

        let replacement = Dataset {
            status: DatasetStatus::Pending,
            files: Vec::new(),
            metas: required_metas("Demo Dataset - PUT Replacement"),
        };
        let before_count = metas_of(before).len();
        ui::print_info(&format!("   Metadata entries BEFORE PUT: {}", before_count));
        ui::print_info(&format!("   Metadata entries in PUT payload: {}", replacement.metas.len()));
        ui::print_warning("   Missing: description, keywords (will be DELETED!)");

        let endpoint = self.endpoint();
        let response = self
            .narrator
            .call("PUT", &endpoint, || self.api.modify_dataset(&self.dataset_id, &replacement))?;
        if response.code() != 204 {
            ui::print_error(&response.body_excerpt(300));
            bail!("PUT failed with status {}", response.code());
        }
        ui::print_warning("PUT successful - but data was lost!");

        self.narrator.rate_limit();
        let Some(after) = self.narrator.fetch(self.api, &endpoint)? else {
            bail!("dataset {} could not be retrieved after PUT", self.dataset_id);
        };

        let summary = |state: &serde_json::Value| {
            json!({
                "metadata_count": metas_of(state).len(),
                "has_description": count_property(state, Property::Description) > 0,
                "has_keywords": count_property(state, Property::Subject) > 0,
            })
        };
        ui::print_json_comparison(&summary(before), &summary(&after), "PUT RESULT - Data Loss Demonstration");

        let lost = before_count.saturating_sub(metas_of(&after).len());
        ui::print_error(&format!("Lost {} metadata entries!", lost));
        ui::print_success("Only fields in the PUT payload survived");
        ui::print_warning("KEY LESSON: for targeted updates, use POST/DELETE on the /metadatas endpoint!");
        Ok(())
    }

    fn step_delete_published(&self) -> Result<()> {
        ui::print_step_header(5, "Delete Attempt - Testing Restrictions", "DELETE");
        ui::print_info("Publishing through PUT /datas/{id}/status/published, then deleting...");

        let status_endpoint = format!("{}/status/published", self.endpoint());
        let response = self.narrator.call("PUT", &status_endpoint, || {
            self.api.set_dataset_status(&self.dataset_id, DatasetStatus::Published)
        })?;
        if response.code() != 204 {
            ui::print_warning(&format!("Status change returned: {}", response.code()));
            ui::print_info("Skipping DELETE test (status change failed)");
            return Ok(());
        }
        ui::print_success("Status changed to 'published'");
        self.published.set(true);
        self.narrator.rate_limit();

        let endpoint = self.endpoint();
        let response = self
            .narrator
            .call("DELETE", &endpoint, || self.api.delete_dataset(&self.dataset_id))?;
        if response.is_any(&[400, 403]) {
            ui::print_success("DELETE blocked (expected behavior)!");
            ui::print_info("   Published datasets are permanent; this protects DOI persistence");
        } else {
            ui::print_warning(&format!("Unexpected response: {}", response.code()));
        }
        Ok(())
    }

    fn step_delete_pending(&self) -> Result<()> {
        ui::print_step_header(6, "Delete Pending Dataset - Success", "DELETE");
        ui::print_info("Creating a temporary pending dataset to demonstrate deletion...");

        let temp_id = create_pending_dataset(self.api, self.narrator, "Temporary Test Dataset", "temp.txt", Vec::new())?;
        self.narrator.rate_limit();

        let endpoint = format!("/datas/{}", temp_id);
        let response = self
            .narrator
            .call("DELETE", &endpoint, || self.api.delete_dataset(&temp_id))?;
        if response.code() != 204 {
            ui::print_error(&format!("DELETE failed: {}", response.code()));
            return Ok(());
        }
        ui::print_success("DELETE successful! Pending datasets can be deleted");

        self.narrator.rate_limit();
        let check = self.narrator.request(self.api, "GET", &endpoint, None)?;
        if check.code() == 404 {
            ui::print_success("Confirmed: dataset no longer exists");
        } else {
            ui::print_warning(&format!("Dataset still exists (unexpected): {}", check.code()));
        }
        Ok(())
    }
}

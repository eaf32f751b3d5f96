// Rights management: role hierarchy, the automatic OWNER, group rights and
// individual user rights on a throwaway dataset.

use anyhow::Result;
use serde_json::Value;

use super::{cleanup_delete, create_pending_dataset};
use crate::api::ApiClient;
use crate::metadata::{GroupMember, GroupRequest, RightAssignment, Role};
use crate::ui::{self, Narrator};

/// Accounts that exist on the public test instance, used when user search
/// comes back empty.
const KNOWN_TEST_USERS: [(&str, &str); 2] = [
    ("tnakala", "5a38883d-6b58-450a-9892-0545b7461973"),
    ("unakala1", "33170cfe-f53c-550b-5fb6-4814ce981293"),
];

const TARGET_USER: &str = "tnakala";

fn known_test_user(username: &str) -> Option<&'static str> {
    KNOWN_TEST_USERS
        .iter()
        .find(|(name, _)| *name == username)
        .map(|(_, id)| *id)
}

/// First hit of a `/users/search` body as `(id, full name)`.
fn first_search_hit(results: &Value) -> Option<(String, String)> {
    let user = results.as_array()?.first()?;
    let id = user.get("id")?.as_str()?.to_string();
    let name = user
        .get("fullName")
        .or_else(|| user.get("fullname"))
        .and_then(Value::as_str)
        .unwrap_or("Unknown")
        .to_string();
    Some((id, name))
}

/// `  • name (@user, type) → ROLE`, with an arrow marker for `highlight`.
fn format_right(right: &Value, highlight: Option<&str>) -> String {
    let field = |key: &str| right.get(key).and_then(Value::as_str).unwrap_or("");
    let username = field("username");
    let prefix = if !username.is_empty() && Some(username) == highlight {
        "  ➤"
    } else {
        "  •"
    };
    let name = Some(field("name")).filter(|n| !n.is_empty()).unwrap_or("Unknown");
    let kind = Some(field("type")).filter(|t| !t.is_empty()).unwrap_or("Unknown");
    if username.is_empty() {
        format!("{} {} ({}) → {}", prefix, name, kind, field("role"))
    } else {
        format!("{} {} (@{}, {}) → {}", prefix, name, username, kind, field("role"))
    }
}

struct RightsDemo<'a> {
    api: &'a ApiClient,
    narrator: &'a Narrator,
    dataset_id: Option<String>,
    group_id: Option<String>,
}

pub fn run(api: &ApiClient, narrator: &Narrator) -> Result<()> {
    let mut demo = RightsDemo {
        api,
        narrator,
        dataset_id: None,
        group_id: None,
    };

    let outcome = demo.steps();
    demo.cleanup();
    outcome?;

    ui::print_section_header("DEMONSTRATION COMPLETE");
    println!(
        "
📚 KEY TAKEAWAYS:
   - The creator is OWNER (and DEPOSITOR) automatically
   - Rights are granted with POST /datas/{{id}}/rights as [{{id, role}}]
   - Groups share one assignment among all their members
   - User rights need the user's UUID, found with GET /users/search
"
    );
    Ok(())
}

impl RightsDemo<'_> {
    fn steps(&mut self) -> Result<()> {
        print_hierarchy();
        self.narrator.pause("Press ENTER to continue")?;
        self.automatic_owner()?;
        self.narrator.next_step()?;
        self.group_rights()?;
        self.narrator.next_step()?;
        self.individual_rights()?;
        self.narrator.next_step()?;
        self.verify_rights()?;
        print_collection_rights();
        Ok(())
    }

    fn show_rights(&self, dataset_id: &str, highlight: Option<&str>) -> Result<()> {
        let endpoint = format!("/datas/{}/rights", dataset_id);
        let response = self
            .narrator
            .call("GET", &endpoint, || self.api.get_rights(dataset_id))?;
        if response.code() != 200 {
            ui::print_error(&format!("Failed to retrieve rights: {}", response.code()));
            return Ok(());
        }
        let rights: Vec<Value> = response.json()?;
        ui::print_success(&format!("Total rights: {}", rights.len()));
        for right in &rights {
            ui::print_info(&format_right(right, highlight));
        }
        Ok(())
    }

    fn assign(&self, dataset_id: &str, rights: &[RightAssignment]) -> Result<bool> {
        ui::print_info("📦 POST /datas/{id}/rights payload:");
        ui::print_json(&serde_json::to_value(rights)?);
        let endpoint = format!("/datas/{}/rights", dataset_id);
        let response = self
            .narrator
            .call("POST", &endpoint, || self.api.add_rights(dataset_id, rights))?;
        if response.is_any(&[200, 201, 204]) {
            Ok(true)
        } else {
            ui::print_error(&format!("Rights assignment failed: {}", response.code()));
            ui::print_error(&response.body_excerpt(300));
            Ok(false)
        }
    }

    fn automatic_owner(&mut self) -> Result<()> {
        ui::print_section_header("AUTOMATIC OWNER ROLE");
        ui::print_info("Whoever creates a dataset becomes its OWNER.");

        let dataset_id = create_pending_dataset(self.api, self.narrator, "Rights Management Demo Dataset", "rights.txt", Vec::new())?;
        self.dataset_id = Some(dataset_id.clone());
        self.narrator.rate_limit();

        ui::print_step_header(1, "Retrieve dataset rights", "GET");
        self.show_rights(&dataset_id, None)?;
        ui::print_success("Creator automatically has ROLE_OWNER and ROLE_DEPOSITOR");
        Ok(())
    }

    fn group_rights(&mut self) -> Result<()> {
        ui::print_section_header("GROUP RIGHTS");
        ui::print_info("Groups need at least one member besides you; you are added as OWNER.");

        ui::print_step_header(1, "Create test group with valid user", "POST");
        let group = GroupRequest {
            name: "NAKALA Demo Test Group".to_string(),
            users: vec![GroupMember {
                username: TARGET_USER.to_string(),
                role: Role::User,
            }],
        };
        ui::print_json(&serde_json::to_value(&group)?);

        let response = self
            .narrator
            .call("POST", "/groups", || self.api.create_group(&group))?;
        if !response.is_any(&[200, 201]) {
            ui::print_error(&format!("Group creation failed: {}", response.code()));
            ui::print_error(&response.body_excerpt(300));
            match response.code() {
                422 => ui::print_warning("Groups need another valid member; check GET /users/search"),
                404 => ui::print_warning("The username does not exist"),
                _ => {}
            }
            return Ok(());
        }
        let Some(group_id) = response.created_id() else {
            ui::print_warning("Group created but no id was returned");
            return Ok(());
        };
        ui::print_success(&format!("Group created: {}", group_id));
        self.group_id = Some(group_id.clone());

        if let Some(details) = self.api.get_group(&group_id)? {
            for user in details.get("users").and_then(Value::as_array).into_iter().flatten() {
                ui::print_info(&format_right(user, None));
            }
        }

        let Some(dataset_id) = self.dataset_id.clone() else {
            return Ok(());
        };
        ui::print_step_header(2, "Assign group rights to dataset", "POST");
        let rights = [RightAssignment {
            id: group_id,
            role: Role::Editor,
        }];
        if self.assign(&dataset_id, &rights)? {
            ui::print_success("Group rights assigned: every member is now EDITOR");
            ui::print_step_header(3, "Verify rights assignment", "GET");
            self.show_rights(&dataset_id, None)?;
        }
        Ok(())
    }

    fn individual_rights(&self) -> Result<()> {
        ui::print_section_header("INDIVIDUAL USER RIGHTS ASSIGNMENT");
        let Some(dataset_id) = self.dataset_id.as_deref() else {
            ui::print_warning("No dataset available. Skipping rights assignment.");
            return Ok(());
        };

        ui::print_step_header(1, &format!("Find UUID for user '{}'", TARGET_USER), "GET");
        let endpoint = format!("/users/search?q={}&limit=1", TARGET_USER);
        let hit = match self.narrator.call("GET", &endpoint, || self.api.search_users(TARGET_USER, 1)) {
            Ok(response) if response.code() == 200 => response
                .json::<Value>()
                .ok()
                .and_then(|results| first_search_hit(&results)),
            Ok(response) => {
                ui::print_warning(&format!("Search failed: {}", response.code()));
                None
            }
            Err(e) => {
                ui::print_warning(&format!("Search request failed: {:#}", e));
                None
            }
        };

        let (user_id, full_name) = match hit {
            Some((id, name)) => {
                ui::print_success(&format!("User found: {} (@{})", name, TARGET_USER));
                (id, name)
            }
            None => match known_test_user(TARGET_USER) {
                Some(id) => {
                    ui::print_warning("Search returned nothing (possibly an empty test server)");
                    ui::print_info(&format!("Using the known UUID for '{}'", TARGET_USER));
                    (id.to_string(), format!("Test User ({})", TARGET_USER))
                }
                None => {
                    ui::print_error("Cannot assign rights without a user UUID");
                    return Ok(());
                }
            },
        };
        ui::print_info(&format!("   UUID: {}", user_id));

        self.narrator
            .pause(&format!("Press ENTER to assign READER rights to {}", full_name))?;
        ui::print_step_header(2, "Assign individual user rights", "POST");
        let rights = [RightAssignment {
            id: user_id,
            role: Role::Reader,
        }];
        if self.assign(dataset_id, &rights)? {
            ui::print_success("Individual user rights assigned");
            ui::print_step_header(3, "Verify individual rights assignment", "GET");
            self.show_rights(dataset_id, Some(TARGET_USER))?;
        }
        Ok(())
    }

    fn verify_rights(&self) -> Result<()> {
        ui::print_section_header("RIGHTS VERIFICATION");
        let Some(dataset_id) = self.dataset_id.as_deref() else {
            return Ok(());
        };
        ui::print_step_header(1, "Verify dataset rights", "GET");
        self.show_rights(dataset_id, Some(TARGET_USER))
    }

    fn cleanup(&mut self) {
        ui::print_section_header("CLEANUP");
        if let Some(group_id) = self.group_id.take() {
            let endpoint = format!("/groups/{}", group_id);
            cleanup_delete(self.narrator, &endpoint, || self.api.delete_group(&group_id));
        }
        if let Some(dataset_id) = self.dataset_id.take() {
            let endpoint = format!("/datas/{}", dataset_id);
            cleanup_delete(self.narrator, &endpoint, || self.api.delete_dataset(&dataset_id));
        }
    }
}

fn print_hierarchy() {
    ui::print_section_header("NAKALA RIGHTS HIERARCHY");
    println!(
        "
  1. ROLE_OWNER      full control, delete, status, rights (automatic for the creator)
  2. ROLE_ADMIN      manage rights, metadata, files and status
  3. ROLE_MODERATOR  moderate published content
  4. ROLE_EDITOR     modify metadata and files
  5. ROLE_READER     view data
  *  ROLE_DEPOSITOR  attribution only (automatic for the creator)

                    OWNER    ADMIN   MODERATOR   EDITOR   READER   DEPOSITOR
──────────────────────────────────────────────────────────────────────────────
View Resource         ✓       ✓         ✓         ✓        ✓         ✗
Modify Metadata       ✓       ✓         ✓         ✓        ✗         ✗
Modify Files          ✓       ✓         ✓         ✓        ✗         ✗
Modify Status         ✓       ✓         ✗         ✗        ✗         ✗
Manage Rights         ✓       ✓         ✗         ✗        ✗         ✗
Moderate Content      ✓       ✓         ✓         ✗        ✗         ✗
Delete Resource       ✓       ✗         ✗         ✗        ✗         ✗
──────────────────────────────────────────────────────────────────────────────
"
    );
}

fn print_collection_rights() {
    ui::print_section_header("COLLECTION RIGHTS");
    println!(
        "
Collections carry their own rights, separate from their datasets:
   - POST /collections/{{id}}/rights grants access to the collection itself
   - Linking a dataset does NOT give collection members access to it
   - A private collection hides its listing; dataset rights still apply
"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_known_test_user_lookup() {
        assert_eq!(known_test_user("tnakala"), Some("5a38883d-6b58-450a-9892-0545b7461973"));
        assert_eq!(known_test_user("nobody"), None);
    }

    #[test]
    fn test_first_search_hit() {
        let results = json!([{"id": "u-1", "fullName": "Test Nakala", "username": "tnakala"}]);
        assert_eq!(
            first_search_hit(&results),
            Some(("u-1".to_string(), "Test Nakala".to_string()))
        );
        assert_eq!(first_search_hit(&json!([])), None);
        assert_eq!(first_search_hit(&json!({"error": "x"})), None);
    }

    #[test]
    fn test_format_right_highlights_target() {
        let right = json!({"name": "Test Nakala", "username": "tnakala", "type": "user", "role": "ROLE_READER"});
        assert_eq!(
            format_right(&right, Some("tnakala")),
            "  ➤ Test Nakala (@tnakala, user) → ROLE_READER"
        );
        let group = json!({"name": "Demo", "type": "group", "role": "ROLE_EDITOR"});
        assert_eq!(format_right(&group, Some("tnakala")), "  • Demo (group) → ROLE_EDITOR");
    }
}

// UI layer: console narration for the demos and the interactive menu.
// Everything here prints to stdout; logs go to stderr through `tracing`.

use std::collections::HashSet;
use std::ffi::OsString;
use std::io::IsTerminal;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use crossterm::style::{StyledContent, Stylize};
use dialoguer::{Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use once_cell::sync::Lazy;
use serde_json::Value;

use crate::api::{ApiClient, ApiResponse};
use crate::config::Config;
use crate::demos::{self, Demo};
use crate::metadata::{short_property_name, Meta};

const RULE_WIDTH: usize = 80;

static COLOUR: Lazy<bool> =
    Lazy::new(|| colour_enabled(std::io::stdout().is_terminal(), std::env::var_os("NO_COLOR")));

/// Colours only go to a terminal, and never when `NO_COLOR` is set.
fn colour_enabled(is_terminal: bool, no_color: Option<OsString>) -> bool {
    is_terminal && no_color.map_or(true, |v| v.is_empty())
}

fn paint(text: impl Into<String>, style: impl FnOnce(String) -> StyledContent<String>) -> String {
    let text = text.into();
    if *COLOUR {
        style(text).to_string()
    } else {
        text
    }
}

pub fn print_section_header(title: &str) {
    println!("\n{}", "=".repeat(RULE_WIDTH));
    println!("  {}", paint(title, |t| t.bold()));
    println!("{}", "=".repeat(RULE_WIDTH));
}

/// `STEP 3: Title [METHOD]`
pub fn print_step_header(step: impl std::fmt::Display, title: &str, method: &str) {
    println!("\n{}", "-".repeat(RULE_WIDTH));
    let badge = if method.is_empty() {
        String::new()
    } else {
        format!(" [{}]", method)
    };
    println!(
        "{}{}",
        paint(format!("STEP {}: {}", step, title), |t| t.bold()),
        paint(badge, |t| t.cyan())
    );
    println!("{}", "-".repeat(RULE_WIDTH));
}

pub fn print_success(message: &str) {
    println!("{}", paint(format!("✓ {}", message), |t| t.green()));
}

pub fn print_warning(message: &str) {
    println!("{}", paint(format!("⚠️  {}", message), |t| t.yellow()));
}

pub fn print_error(message: &str) {
    println!("{}", paint(format!("❌ {}", message), |t| t.red()));
}

pub fn print_info(message: &str) {
    println!("   {}", message);
}

/// Pretty-print any JSON value, indented under an info line.
pub fn print_json(value: &Value) {
    let text = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    for line in text.lines() {
        print_info(line);
    }
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// One line per entry: `   • prop [lang]: value`.
pub fn format_metadata_for_display(metas: &[Meta]) -> String {
    metas
        .iter()
        .map(|meta| {
            let lang = meta
                .lang
                .as_deref()
                .filter(|l| !l.is_empty())
                .map(|l| format!(" [{}]", l))
                .unwrap_or_default();
            format!(
                "   • {}{}: {}",
                short_property_name(&meta.property_uri),
                lang,
                truncate(&meta.value.to_string(), 100)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// Key used to match metadata entries between two states.
fn meta_key(meta: &Value) -> (String, String, String) {
    let uri = meta
        .get("propertyUri")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let lang = meta
        .get("lang")
        .and_then(Value::as_str)
        .unwrap_or("no-lang")
        .to_string();
    let value = match meta.get("value") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    };
    (uri, lang, value)
}

fn meta_keys(state: &Value) -> Option<Vec<(String, String, String)>> {
    state
        .get("metas")
        .and_then(Value::as_array)
        .map(|metas| metas.iter().map(meta_key).collect())
}

fn datas_of(state: &Value) -> Option<HashSet<String>> {
    state.get("datas").and_then(Value::as_array).map(|datas| {
        datas
            .iter()
            .map(|d| match d {
                Value::String(s) => s.clone(),
                // Expanded dataset objects carry their identifier.
                other => other
                    .get("identifier")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| other.to_string()),
            })
            .collect()
    })
}

/// Describe what changed between two resource states: metadata entries
/// added or removed, a status change, and datasets linked or unlinked.
pub fn extract_differences(before: &Value, after: &Value) -> Vec<String> {
    let mut differences = Vec::new();

    if let (Some(before_metas), Some(after_metas)) = (meta_keys(before), meta_keys(after)) {
        let before_set: HashSet<_> = before_metas.iter().collect();
        let after_set: HashSet<_> = after_metas.iter().collect();

        let mut seen = HashSet::new();
        for key in after_metas.iter().filter(|k| !before_set.contains(k)) {
            if seen.insert(key) {
                differences.push(format!(
                    "Added {}: '{}...'",
                    short_property_name(&key.0),
                    truncate(&key.2, 50)
                ));
            }
        }

        let mut seen = HashSet::new();
        for key in before_metas.iter().filter(|k| !after_set.contains(k)) {
            if seen.insert(key) {
                differences.push(format!(
                    "Removed {}: '{}...'",
                    short_property_name(&key.0),
                    truncate(&key.2, 50)
                ));
            }
        }
    }

    let before_status = before.get("status").unwrap_or(&Value::Null);
    let after_status = after.get("status").unwrap_or(&Value::Null);
    if before_status != after_status {
        differences.push(format!(
            "Status changed: {} → {}",
            display_status(before_status),
            display_status(after_status)
        ));
    }

    if let (Some(before_datas), Some(after_datas)) = (datas_of(before), datas_of(after)) {
        let added = after_datas.difference(&before_datas).count();
        let removed = before_datas.difference(&after_datas).count();
        if added > 0 {
            differences.push(format!("Added {} dataset(s)", added));
        }
        if removed > 0 {
            differences.push(format!("Removed {} dataset(s)", removed));
        }
    }

    differences
}

fn display_status(status: &Value) -> String {
    match status {
        Value::String(s) => s.clone(),
        Value::Null => "None".to_string(),
        other => other.to_string(),
    }
}

/// Print both states in full, then the list of detected changes.
pub fn print_json_comparison(before: &Value, after: &Value, title: &str) {
    println!("\n📊 {}", paint(title, |t| t.bold()));
    println!("\n🔹 BEFORE:");
    print_json(before);
    println!("\n🔹 AFTER:");
    print_json(after);

    let differences = extract_differences(before, after);
    if differences.is_empty() {
        println!("\n🔍 NO CHANGES DETECTED");
    } else {
        println!("\n🔍 CHANGES DETECTED:");
        for diff in differences {
            print_info(&format!("- {}", diff));
        }
    }
}

pub fn print_method_comparison_table() {
    println!(
        r#"
╔═══════════════════════════════════════════════════════════════════════════╗
║                   HTTP METHOD COMPARISON (NAKALA)                          ║
╠═══════════╦═══════════════╦═══════════════════╦═════════════════════════╣
║ Method    ║ Support       ║ Use Case          ║ What Changes            ║
╠═══════════╬═══════════════╬═══════════════════╬═════════════════════════╣
║ POST      ║ Yes           ║ Create new        ║ N/A (creates)           ║
║ GET       ║ Yes           ║ Read/retrieve     ║ Nothing (read-only)     ║
║ PATCH     ║ NO (405)      ║ Not supported     ║ Use /metadatas instead  ║
║ PUT       ║ Yes           ║ Complete replace  ║ Everything (DANGEROUS)  ║
║ DELETE    ║ Yes           ║ Remove entirely   ║ Everything (permanent)  ║
╚═══════════╩═══════════════╩═══════════════════╩═════════════════════════╝

🎯 NAKALA-SPECIFIC RECOMMENDATIONS:
   - Use POST to create datasets/collections
   - Use GET to verify state
   - Use POST/DELETE /metadatas for incremental updates
   - Avoid PUT unless replacing everything
   - Use DELETE with caution (permanent for pending, blocked for published)

⚠️  PATCH is NOT supported for /datas or /collections endpoints
"#
    );
}

pub fn print_status_lifecycle() {
    println!(
        r#"
╔═══════════════════════════════════════════════════════════════════════════╗
║                     DATASET STATUS LIFECYCLE                               ║
╚═══════════════════════════════════════════════════════════════════════════╝

  PENDING:
  ┌─────────────────────────────────────────────────────────────┐
  │ ✓ Can be modified with PUT or POST/DELETE /metadatas        │
  │ ✓ CAN be deleted with DELETE /datas/{{id}}                    │
  │ ✓ Can change to "published"                                 │
  │ ✓ Files restricted to authorized users                      │
  └─────────────────────────────────────────────────────────────┘
                              ↓
                  (status change to published)
                              ↓
  PUBLISHED:
  ┌─────────────────────────────────────────────────────────────┐
  │ ✓ Can be modified with PUT or POST/DELETE /metadatas        │
  │ ✗ CANNOT be deleted                                         │
  │ ✗ CANNOT change back to pending                             │
  │ ✓ Gets DOI identifier                                       │
  │ ✓ Files public if embargo date ≤ today                      │
  └─────────────────────────────────────────────────────────────┘

⚠️  WARNING: Once published, deletion is IMPOSSIBLE!
"#
    );
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Pacing and request narration shared by every demo.
#[derive(Debug, Clone)]
pub struct Narrator {
    interactive: bool,
    delay: Duration,
}

impl Narrator {
    pub fn new(config: &Config) -> Self {
        Self {
            interactive: config.interactive,
            delay: config.rate_limit_delay,
        }
    }

    /// Block on Enter in interactive mode; otherwise just wait out the
    /// rate-limit delay.
    pub fn pause(&self, message: &str) -> Result<()> {
        if self.interactive {
            let _: String = Input::new()
                .with_prompt(format!("\n⏸️  {}...", message))
                .allow_empty(true)
                .interact_text()?;
        } else {
            self.rate_limit();
        }
        Ok(())
    }

    /// Default pause between steps.
    pub fn next_step(&self) -> Result<()> {
        self.pause("Press ENTER to continue to next step")
    }

    /// Sleep the configured delay between requests.
    pub fn rate_limit(&self) {
        self.wait(self.delay, "Waiting (rate limit)...");
    }

    pub fn wait(&self, duration: Duration, message: &str) {
        let pb = spinner(message);
        thread::sleep(duration);
        pb.finish_and_clear();
    }

    /// Narrate a typed client call: prints `📡 METHOD endpoint`, runs it and
    /// prints the status it came back with.
    pub fn call<F>(&self, method: &str, endpoint: &str, send: F) -> Result<ApiResponse>
    where
        F: FnOnce() -> crate::error::Result<ApiResponse>,
    {
        print_info(&format!("📡 {} {}", method, endpoint));
        let response = send()?;
        print_response_status(&response);
        Ok(response)
    }

    /// Generic dispatcher keyed by method name.
    pub fn request(&self, api: &ApiClient, method: &str, endpoint: &str, body: Option<&Value>) -> Result<ApiResponse> {
        self.call(method, endpoint, || api.request(method, endpoint, body))
    }

    /// GET a resource as JSON, narrated; `None` when it does not answer 200.
    pub fn fetch(&self, api: &ApiClient, endpoint: &str) -> Result<Option<Value>> {
        let response = self.request(api, "GET", endpoint, None)?;
        if response.code() == 200 {
            Ok(Some(response.json()?))
        } else {
            Ok(None)
        }
    }
}

fn print_response_status(response: &ApiResponse) {
    let mark = if response.is_any(&[200, 201, 204]) {
        "✓"
    } else {
        "✗"
    };
    print_info(&format!("{} Response: {}", mark, response.code()));
}

/// Main interactive menu: pick a demonstration until "Exit" is chosen.
pub fn main_menu(api: &ApiClient, narrator: &Narrator) -> Result<()> {
    print_section_header("NAKALA API DEMONSTRATIONS");
    print_info(&format!("API: {}", api.base_url()));

    let choices = Demo::ALL;
    let mut items: Vec<&str> = choices.iter().map(|d| d.title()).collect();
    items.push("Exit");

    loop {
        let selection = Select::new()
            .with_prompt("Choose a demonstration")
            .items(&items)
            .default(0)
            .interact()?;

        match choices.get(selection) {
            Some(demo) => {
                if let Err(e) = demos::run(*demo, api, narrator) {
                    print_error(&format!("Demonstration failed: {:#}", e));
                }
            }
            None => break,
        }
    }
    Ok(())
}

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::choco::ChocoSource;

/// Resolves short package names to display titles via the info command.
///
/// The cache maps `(name, version)` to a title and is append-only for the
/// process lifetime. A failed lookup caches the short name itself, so a
/// package with no discoverable title costs one info invocation total
/// rather than one per check cycle.
pub struct TitleResolver<S: ChocoSource> {
    source: Arc<S>,
    cache: Mutex<HashMap<(String, String), String>>,
}

impl<S: ChocoSource> TitleResolver<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self {
            source,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub async fn resolve(&self, name: &str, version: &str) -> String {
        let key = (name.to_string(), version.to_string());
        if let Some(hit) = self.cache().get(&key) {
            return hit.clone();
        }

        let title = match self.source.package_info(name, version).await {
            Ok(output) => extract_title(&output),
            Err(error) => {
                tracing::debug!(name, version, %error, "info lookup failed; using short name");
                None
            }
        };

        let display_name = title.unwrap_or_else(|| name.to_string());
        self.cache().insert(key, display_name.clone());
        display_name
    }

    fn cache(&self) -> MutexGuard<'_, HashMap<(String, String), String>> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Pulls the text between `"Title: "` and the trailing `" |"` out of the
/// info output. Lines without both markers are skipped.
fn extract_title(output: &str) -> Option<String> {
    for line in output.lines() {
        let Some(rest) = line.trim_start().strip_prefix("Title: ") else {
            continue;
        };
        if let Some(end) = rest.rfind(" |") {
            let title = rest[..end].trim();
            if !title.is_empty() {
                return Some(title.to_string());
            }
        }
    }
    None
}

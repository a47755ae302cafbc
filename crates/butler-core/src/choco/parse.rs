/// A single record from the machine-readable outdated listing:
/// `name|installed|available|pinned`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OutdatedRecord {
    pub name: String,
    pub installed_version: String,
    pub available_version: String,
    pub pinned: bool,
}

/// Substrings the tool emits when the package source cannot be reached.
pub const NETWORK_FAILURE_SIGNATURES: &[&str] = &[
    "Unable to load service index",
    "The remote name could not be resolved",
    "Unable to connect to source",
];

pub fn is_network_failure(output: &str) -> bool {
    NETWORK_FAILURE_SIGNATURES
        .iter()
        .any(|signature| output.contains(signature))
}

/// Splits the raw listing into records. Empty lines, lines that do not carry
/// exactly four pipe-separated fields and records without a name are dropped
/// silently.
pub fn parse_outdated(raw: &str) -> Vec<OutdatedRecord> {
    raw.split(['\r', '\n'])
        .filter(|line| !line.trim().is_empty())
        .filter_map(parse_line)
        .collect()
}

/// Re-validates what the tool should already have filtered: pinned packages
/// and entries whose available version matches the installed one never
/// become upgrade candidates.
pub fn upgrade_candidates(records: Vec<OutdatedRecord>) -> Vec<OutdatedRecord> {
    records
        .into_iter()
        .filter(|record| !record.pinned && record.available_version != record.installed_version)
        .collect()
}

fn parse_line(line: &str) -> Option<OutdatedRecord> {
    let fields: Vec<&str> = line.split('|').collect();
    if fields.len() != 4 {
        return None;
    }

    let name = fields[0].trim();
    if name.is_empty() {
        return None;
    }

    Some(OutdatedRecord {
        name: name.to_string(),
        installed_version: fields[1].trim().to_string(),
        available_version: fields[2].trim().to_string(),
        pinned: fields[3].trim().eq_ignore_ascii_case("true"),
    })
}

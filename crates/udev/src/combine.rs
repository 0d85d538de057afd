//! Combine per-tag snippets into rule files.

use dirstate::FileState;
use interfaces::{SecuritySnippets, Snippet, SnapInfo, app_security_tag, hook_security_tag, snap_security_tag};
use std::collections::{BTreeMap, HashSet};

pub const RULES_HEADER: &str = "# This file is automatically generated.\n";
pub const RULES_MODE: u32 = 0o644;

/// Name of the rule file for a security tag.
pub fn rules_file_name(security_tag: &str) -> String {
    format!("70-{security_tag}.rules")
}

/// Pattern matching every rule file of a snap.
pub fn snap_rules_glob(snap_name: &str) -> String {
    format!("70-{}.*rules", snap_security_tag(snap_name))
}

/// Build the desired rule files for a snap.
///
/// All apps share one file named after the snap, hooks get one file each.
/// Identical snippets are written once per file, in first-seen order, so
/// unchanged connections always produce byte-identical files. Tags without
/// snippets produce no file.
pub fn combine_snippets(snap: &SnapInfo, snippets: &SecuritySnippets) -> BTreeMap<String, FileState> {
    let mut content = BTreeMap::new();

    let app_snippets = snap
        .apps
        .keys()
        .filter_map(|app| snippets.get(&app_security_tag(&snap.name, app)))
        .flatten();
    add_content(&mut content, &snap_security_tag(&snap.name), app_snippets);

    for hook in snap.hooks.keys() {
        let tag = hook_security_tag(&snap.name, hook);
        if let Some(hook_snippets) = snippets.get(&tag) {
            add_content(&mut content, &tag, hook_snippets.iter());
        }
    }

    content
}

fn add_content<'a>(
    content: &mut BTreeMap<String, FileState>,
    security_tag: &str,
    snippets: impl Iterator<Item = &'a Snippet>,
) {
    let mut seen: HashSet<&[u8]> = HashSet::new();
    let mut buffer = Vec::new();
    for snippet in snippets {
        if !seen.insert(snippet.as_slice()) {
            continue;
        }
        buffer.extend_from_slice(snippet);
        buffer.push(b'\n');
    }
    if seen.is_empty() {
        return;
    }

    let mut file = RULES_HEADER.as_bytes().to_vec();
    file.append(&mut buffer);
    content.insert(rules_file_name(security_tag), FileState::new(file, RULES_MODE));
}

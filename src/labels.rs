//! Human-readable labels and package grouping for tables.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::records::RecordStore;

/// Default display label length.
pub const DEFAULT_LABEL_LENGTH: usize = 25;
/// Default package name length.
pub const DEFAULT_PACKAGE_LENGTH: usize = 30;

const ELLIPSIS: &str = "...";

/// Technical table-name prefixes dropped when humanizing.
fn technical_prefix() -> &'static Regex {
    static PREFIX: OnceLock<Regex> = OnceLock::new();
    PREFIX.get_or_init(|| Regex::new(r"^(?:cmdb_ci_|cmdb_|u_)").expect("Invalid regex pattern"))
}

/// Visual grouping of a node, derived from its scope and package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageGroup {
    GlobalScope,
    ServiceNow,
    Plugin,
    OtherPackage,
    Unknown,
}

impl PackageGroup {
    pub fn color(&self) -> &'static str {
        match self {
            PackageGroup::GlobalScope => "#4CAF50",
            PackageGroup::ServiceNow => "#9C27B0",
            PackageGroup::Plugin => "#FF9800",
            PackageGroup::OtherPackage => "#607D8B",
            PackageGroup::Unknown => "#2196F3",
        }
    }

    pub fn legend(&self) -> &'static str {
        match self {
            PackageGroup::GlobalScope => "Global Scope",
            PackageGroup::ServiceNow => "SN Package",
            PackageGroup::Plugin => "Plugin",
            PackageGroup::OtherPackage => "Package",
            PackageGroup::Unknown => "Other/Unknown",
        }
    }
}

/// Resolves table names to display strings using the record store.
#[derive(Debug, Clone, Copy)]
pub struct LabelResolver<'a> {
    store: &'a RecordStore,
}

impl<'a> LabelResolver<'a> {
    pub fn new(store: &'a RecordStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &'a RecordStore {
        self.store
    }

    /// Display label for a table, at most `max_length` characters.
    ///
    /// Uses the table's label when it has a real one, otherwise a humanized
    /// form of the name. Names not in the catalog are returned as-is.
    /// Truncated labels end in `...`.
    pub fn display_label(&self, table_name: &str, max_length: usize) -> String {
        let display = match self.store.table(table_name) {
            Some(table) if !table.label.trim().is_empty() && table.label != table.name => {
                table.label.clone()
            }
            Some(_) => humanize(table_name),
            None => table_name.to_string(),
        };
        truncate_label(&display, max_length)
    }

    /// Display name for a package id.
    ///
    /// Known vendor prefixes are shortened; empty and unknown ids read as
    /// `Unknown Package`.
    pub fn package_display_name(&self, package_id: &str, max_length: usize) -> String {
        if package_id.is_empty() {
            return "Unknown Package".to_string();
        }
        let Some(package) = self.store.package(package_id) else {
            return "Unknown Package".to_string();
        };

        let mut name = if package.name.is_empty() {
            package_id.to_string()
        } else {
            package.name.clone()
        };

        if let Some(rest) = name.strip_prefix("@servicenow/") {
            name = format!("SN: {}", rest);
        } else if let Some(rest) = name.strip_prefix("@devsnc/") {
            name = format!("DevSNC: {}", rest);
        } else if name.starts_with("com.") {
            let parts: Vec<&str> = name.split('.').collect();
            if parts.len() > 2 {
                name = parts[2..]
                    .iter()
                    .flat_map(|p| p.split(['-', '_']))
                    .filter(|w| !w.is_empty())
                    .map(title_word)
                    .collect::<Vec<_>>()
                    .join(" ");
            }
        } else if package_id.starts_with("sn_") && name == package_id {
            name = format!("SN {}", humanize_words(&package_id["sn_".len()..]));
        }

        truncate_label(&name, max_length)
    }

    /// Console line for one path, e.g. `Path 1: Rack → Computer → Server`.
    pub fn path_line(&self, number: usize, nodes: &[String], max_length: usize) -> String {
        let labels: Vec<String> = nodes
            .iter()
            .map(|n| self.display_label(n, max_length))
            .collect();
        format!("Path {}: {}", number, labels.join(" → "))
    }

    /// Group a table by scope first, then by package id.
    pub fn group(&self, table_name: &str) -> PackageGroup {
        let Some(table) = self.store.table(table_name) else {
            return PackageGroup::Unknown;
        };
        if table.scope == "global" {
            return PackageGroup::GlobalScope;
        }
        match table.package.as_deref() {
            Some(pkg) if self.store.package(pkg).is_none() => PackageGroup::Unknown,
            Some(pkg) if pkg.starts_with("sn_") => PackageGroup::ServiceNow,
            Some(pkg) if pkg.starts_with("com.") => PackageGroup::Plugin,
            Some(pkg) if !pkg.is_empty() && pkg != "global" => PackageGroup::OtherPackage,
            _ => PackageGroup::Unknown,
        }
    }
}

/// Strip a technical prefix, split on separators and title-case each word.
pub fn humanize(name: &str) -> String {
    let stripped = match technical_prefix().replace(name, "") {
        s if s.is_empty() => name.to_string(),
        s => s.into_owned(),
    };
    humanize_words(&stripped)
}

fn humanize_words(raw: &str) -> String {
    raw.split(|c: char| c == '_' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(title_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Cut `text` to `max_length` characters, ending in `...` when shortened.
pub fn truncate_label(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        return text.to_string();
    }
    let keep = max_length.saturating_sub(ELLIPSIS.len());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out.chars().take(max_length).collect()
}

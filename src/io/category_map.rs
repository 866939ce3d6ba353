use crate::error::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// One entry of the category map: which asset directory carries which class.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryEntry {
    pub class_id: i64,
    /// Directory relative to the asset base directory.
    pub class_dir: String,
    pub class_name: String,
}

/// Parses a JSON array of category entries, keeping file order.
pub fn parse_category_map(json: &str) -> Result<Vec<CategoryEntry>> {
    Ok(serde_json::from_str(json)?)
}

pub fn load_category_map<P: AsRef<Path>>(path: P) -> Result<Vec<CategoryEntry>> {
    let content = fs::read_to_string(path)?;
    parse_category_map(&content)
}

use crate::model::{Category, CategoryWithScripts, Script};
use crate::store::{Store, StoreError};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to fetch categories: {0}")]
    Categories(#[source] StoreError),
    #[error("failed to fetch scripts: {0}")]
    Scripts(#[source] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CatalogSummary {
    pub scripts: usize,
    pub categories: usize,
}

/// Loads every category with its scripts, in display order.
///
/// Both tables are queried on every call. A failure of either query fails the
/// whole load; no partial catalog is returned.
pub fn load(store: &dyn Store) -> Result<Vec<CategoryWithScripts>, FetchError> {
    let categories = store.list_categories().map_err(FetchError::Categories)?;
    let scripts = store.list_scripts().map_err(FetchError::Scripts)?;

    tracing::debug!(
        categories = categories.len(),
        scripts = scripts.len(),
        "catalog fetched"
    );

    Ok(group_scripts(categories, scripts))
}

/// Attaches each script to the category it references.
///
/// Scripts keep their relative order. Scripts pointing at an unknown category
/// are dropped.
pub fn group_scripts(categories: Vec<Category>, scripts: Vec<Script>) -> Vec<CategoryWithScripts> {
    let mut buckets: HashMap<String, Vec<Script>> = HashMap::new();
    for script in scripts {
        buckets
            .entry(script.category_id.clone())
            .or_default()
            .push(script);
    }

    categories
        .into_iter()
        .map(|category| {
            let scripts = buckets.get(&category.id).cloned().unwrap_or_default();
            CategoryWithScripts { category, scripts }
        })
        .collect()
}

pub fn summarize(catalog: &[CategoryWithScripts]) -> CatalogSummary {
    CatalogSummary {
        scripts: catalog.iter().map(|entry| entry.scripts.len()).sum(),
        categories: catalog.len(),
    }
}

/// Finds a script by identifier, then by exact name.
pub fn find_script<'a>(catalog: &'a [CategoryWithScripts], key: &str) -> Option<&'a Script> {
    let scripts = || catalog.iter().flat_map(|entry| entry.scripts.iter());
    scripts()
        .find(|script| script.id == key)
        .or_else(|| scripts().find(|script| script.name == key))
}

//! `feedlens labels ...`: editing the label store the worker classifies against.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use feedlens_engine::{JsonFileStore, LabelStore};

pub fn open_store(path: &Path) -> LabelStore {
    LabelStore::new(Arc::new(JsonFileStore::new(path)))
}

pub fn list(store: &LabelStore, out: &mut impl Write) -> Result<()> {
    let labels = store.load().context("loading labels")?;
    if labels.is_empty() {
        writeln!(out, "No labels configured; posts will not be classified.")?;
        return Ok(());
    }
    for label in labels.as_slice() {
        writeln!(out, "{label}")?;
    }
    Ok(())
}

pub fn add(store: &LabelStore, label: &str, out: &mut impl Write) -> Result<()> {
    if store.add(label).context("saving labels")? {
        writeln!(out, "Added {:?}", label.trim())?;
    } else {
        writeln!(out, "{:?} is blank or already present", label.trim())?;
    }
    Ok(())
}

pub fn remove(store: &LabelStore, label: &str, out: &mut impl Write) -> Result<()> {
    if store.remove(label).context("saving labels")? {
        writeln!(out, "Removed {label:?}")?;
    } else {
        writeln!(out, "No label {label:?}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn add_list_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir.path().join("store.json"));
        let mut out = Vec::new();

        add(&store, " rust ", &mut out).unwrap();
        add(&store, "rust", &mut out).unwrap();
        add(&store, "sport", &mut out).unwrap();
        remove(&store, "sport", &mut out).unwrap();
        remove(&store, "sport", &mut out).unwrap();
        list(&store, &mut out).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Added \"rust\"\n\
             \"rust\" is blank or already present\n\
             Added \"sport\"\n\
             Removed \"sport\"\n\
             No label \"sport\"\n\
             rust\n"
        );
    }

    #[test]
    fn empty_store_explains_itself() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir.path().join("store.json"));
        let mut out = Vec::new();
        list(&store, &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().starts_with("No labels configured"));
    }
}

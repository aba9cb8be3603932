//! Directory corpora: `<root>/<document-id>/<annotator>.json`.
//!
//! Each annotator file holds a JSON array of mentions. Documents come in
//! sorted directory-name order, annotators in sorted file-name order. Other
//! entries (loose files at the root, non-JSON files) are ignored.

use crate::error::StoreError;
use crate::jsonl::validate_text_bytes;
use iaa_kernel::{AnnotatorMentions, Document, DocumentId, Mention};
use std::fs;
use std::path::{Path, PathBuf};

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let mut entries = fs::read_dir(dir)
        .map_err(|e| StoreError::io(dir, e))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| StoreError::io(dir, e))?;
    entries.sort();
    Ok(entries)
}

fn utf8_name(path: &Path, name: Option<&std::ffi::OsStr>) -> Result<String, StoreError> {
    name.and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| StoreError::Layout(format!("{}: name is not valid UTF-8", path.display())))
}

fn load_mentions(path: &Path) -> Result<Vec<Mention>, StoreError> {
    let bytes = fs::read(path).map_err(|e| StoreError::io(path, e))?;
    validate_text_bytes(path, &bytes)?;
    serde_json::from_slice(&bytes).map_err(|e| StoreError::Parse {
        location: format!("{}:{}", path.display(), e.line()),
        message: e.to_string(),
    })
}

/// Load every document under `root`.
pub fn load_corpus_dir(root: impl AsRef<Path>) -> Result<Vec<Document>, StoreError> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Err(StoreError::Layout(format!(
            "{}: not a corpus directory",
            root.display()
        )));
    }

    let mut documents = Vec::new();
    for doc_dir in sorted_entries(root)?.into_iter().filter(|p| p.is_dir()) {
        let id = utf8_name(&doc_dir, doc_dir.file_name())?;
        let mut annotators = Vec::new();
        for file in sorted_entries(&doc_dir)?
            .into_iter()
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        {
            annotators.push(AnnotatorMentions {
                name: utf8_name(&file, file.file_stem())?,
                mentions: load_mentions(&file)?,
            });
        }
        documents.push(Document {
            id: DocumentId::new(id),
            annotators,
        });
    }
    tracing::debug!(root = %root.display(), documents = documents.len(), "read corpus directory");
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(prefix: &str) -> PathBuf {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "iaa-layout-{prefix}-{}-{unique}",
            std::process::id()
        ));
        fs::create_dir_all(&path).expect("temp dir should be created");
        path
    }

    fn write(path: PathBuf, body: &str) {
        fs::create_dir_all(path.parent().expect("fixture path has a parent"))
            .expect("fixture dir should be created");
        fs::write(path, body).expect("fixture should write");
    }

    #[test]
    fn loads_documents_and_annotators_in_sorted_order() {
        let root = temp_dir("sorted");
        write(
            root.join("doc-b/zoe.json"),
            r#"[{"id":"z1","start":0,"end":4,"attributes":{"type":"kill"}}]"#,
        );
        write(
            root.join("doc-b/amir.json"),
            r#"[{"id":"a1","start":0,"end":4,"sentence":0,"attributes":{"type":"kill"}}]"#,
        );
        write(root.join("doc-a/amir.json"), "[]");
        write(root.join("doc-a/notes.txt"), "ignored");
        write(root.join("README.md"), "ignored");

        let docs = load_corpus_dir(&root).expect("corpus should load");
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["doc-a", "doc-b"]);
        assert_eq!(docs[0].annotator_names().collect::<Vec<_>>(), ["amir"]);
        assert_eq!(docs[1].annotator_names().collect::<Vec<_>>(), ["amir", "zoe"]);
        assert_eq!(docs[1].mentions_of("amir").unwrap()[0].sentence, Some(0));

        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn bad_annotator_file_names_the_file() {
        let root = temp_dir("bad");
        write(root.join("d1/anno.json"), "[{\"id\": 3}]");
        match load_corpus_dir(&root) {
            Err(StoreError::Parse { location, .. }) => assert!(location.contains("anno.json")),
            other => panic!("expected parse error, got {other:?}"),
        }
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn missing_root_is_a_layout_error() {
        let missing = std::env::temp_dir().join("iaa-layout-definitely-missing-root");
        assert!(matches!(
            load_corpus_dir(missing),
            Err(StoreError::Layout(_))
        ));
    }
}

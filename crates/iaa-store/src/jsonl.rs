//! JSONL storage: one document per line in, one record per line out.
//!
//! Blank lines and lines starting with `#` are skipped on read. Writes to a
//! path go through a hidden temporary sibling, an fsync, a rename and an
//! fsync of the parent directory, so readers never see a partial file.

use crate::error::StoreError;
use iaa_kernel::{AlignedRow, Document};
use serde::Serialize;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Read documents from a JSONL reader. `source` names the input in errors.
pub fn read_documents(reader: impl BufRead, source: &str) -> Result<Vec<Document>, StoreError> {
    let mut documents = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let location = format!("{source}:{}", line_no + 1);
        let line = line.map_err(|e| StoreError::Io {
            path: location.clone(),
            message: e.to_string(),
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let document: Document = serde_json::from_str(trimmed).map_err(|e| StoreError::Parse {
            location,
            message: e.to_string(),
        })?;
        documents.push(document);
    }
    tracing::debug!(source, documents = documents.len(), "read jsonl corpus");
    Ok(documents)
}

/// Read documents from a JSONL file.
pub fn read_documents_from_path(path: impl AsRef<Path>) -> Result<Vec<Document>, StoreError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| StoreError::io(path, e))?;
    validate_text_bytes(path, &bytes)?;
    read_documents(
        BufReader::new(bytes.as_slice()),
        &path.display().to_string(),
    )
}

/// Write any serializable records, one JSON object per line.
pub fn write_lines<T: Serialize>(
    writer: &mut impl Write,
    records: &[T],
    target: &str,
) -> Result<(), StoreError> {
    for record in records {
        let line = serde_json::to_string(record).map_err(|e| StoreError::Parse {
            location: target.to_string(),
            message: e.to_string(),
        })?;
        writeln!(writer, "{line}").map_err(|e| StoreError::Io {
            path: target.to_string(),
            message: e.to_string(),
        })?;
    }
    Ok(())
}

pub fn write_rows(writer: &mut impl Write, rows: &[AlignedRow]) -> Result<(), StoreError> {
    write_lines(writer, rows, "<rows>")
}

/// Replace the file at `path` with `records` as JSONL.
pub fn write_jsonl_to_path<T: Serialize>(
    path: impl AsRef<Path>,
    records: &[T],
) -> Result<(), StoreError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }

    let tmp_path = tmp_write_path(path);
    let write_result = (|| -> Result<(), StoreError> {
        let file = File::create(&tmp_path).map_err(|e| StoreError::io(&tmp_path, e))?;
        let mut writer = BufWriter::new(file);
        write_lines(&mut writer, records, &tmp_path.display().to_string())?;
        writer.flush().map_err(|e| StoreError::io(&tmp_path, e))?;
        let file = writer
            .into_inner()
            .map_err(|e| StoreError::io(&tmp_path, e))?;
        file.sync_all().map_err(|e| StoreError::io(&tmp_path, e))?;
        Ok(())
    })();

    if let Err(error) = write_result {
        let _ = fs::remove_file(&tmp_path);
        return Err(error);
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        StoreError::io(path, e)
    })?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    File::open(dir)
        .and_then(|d| d.sync_all())
        .map_err(|e| StoreError::io(dir, e))?;
    tracing::debug!(path = %path.display(), records = records.len(), "wrote jsonl");
    Ok(())
}

/// Hidden sibling of `path`, unique per process and call.
fn tmp_write_path(path: &Path) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or(path.as_os_str()));
    name.push(format!(".{}.{nanos}.tmp", std::process::id()));
    path.with_file_name(name)
}

/// Input must be NUL-free UTF-8 before it reaches the JSON parser.
pub(crate) fn validate_text_bytes(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    if let Some(offset) = bytes.iter().position(|&b| b == 0) {
        return Err(StoreError::Corrupt(format!(
            "{}: contains NUL at byte {offset}",
            path.display()
        )));
    }
    std::str::from_utf8(bytes).map(drop).map_err(|e| {
        StoreError::Corrupt(format!(
            "{}: invalid UTF-8 after byte {}",
            path.display(),
            e.valid_up_to()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use iaa_kernel::{Cell, DocumentId, Mention};

    fn temp_path(prefix: &str) -> PathBuf {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "iaa-jsonl-{prefix}-{}-{unique}.jsonl",
            std::process::id()
        ))
    }

    const CORPUS: &str = r#"
# two annotators, one document
{"id":"d1","annotators":[{"name":"a","mentions":[{"id":"e1","start":0,"end":5,"attributes":{"type":"attack"}}]},{"name":"b","mentions":[]}]}

{"id":"d2","annotators":[]}
"#;

    #[test]
    fn skips_blank_and_comment_lines() {
        let docs = read_documents(CORPUS.as_bytes(), "corpus").expect("corpus should parse");
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id.as_str(), "d1");
        assert_eq!(docs[0].mentions_of("a").map(<[_]>::len), Some(1));
        assert!(docs[1].annotators.is_empty());
    }

    #[test]
    fn parse_error_carries_line_number() {
        let input = "{\"id\":\"d1\"}\n\n{not json}\n";
        match read_documents(input.as_bytes(), "corpus.jsonl") {
            Err(StoreError::Parse { location, .. }) => assert_eq!(location, "corpus.jsonl:3"),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_nul_payload() {
        let path = temp_path("nul");
        fs::write(&path, b"{\"id\":\"d1\"}\n\0garbage").expect("fixture should write");
        match read_documents_from_path(&path) {
            Err(StoreError::Corrupt(message)) => {
                assert!(message.contains("contains NUL at byte 12"), "{message}")
            }
            other => panic!("expected corrupt input error, got {other:?}"),
        }
        let _ = fs::remove_file(path);
    }

    #[test]
    fn write_replaces_file_atomically() {
        let path = temp_path("rows");
        let row = |id: &str| AlignedRow {
            document: DocumentId::new(id),
            cells: vec![Cell::Mention(Mention::new("e1", 0, 3)), Cell::NoMention],
        };
        write_jsonl_to_path(&path, &[row("first")]).expect("first write should succeed");
        write_jsonl_to_path(&path, &[row("second"), row("third")])
            .expect("second write should succeed");

        let text = fs::read_to_string(&path).expect("rows should exist");
        assert!(!text.contains("first"));
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("\"no_mention\""));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn write_into_new_directory_leaves_no_temp_files() {
        let dir = temp_path("nested").with_extension("d");
        let path = dir.join("out/rows.jsonl");
        write_jsonl_to_path(&path, &["x", "y"]).expect("write should succeed");

        let names: Vec<_> = fs::read_dir(path.parent().expect("has parent"))
            .expect("dir should exist")
            .map(|e| e.expect("entry").file_name())
            .collect();
        assert_eq!(names, [OsString::from("rows.jsonl")]);
        assert!(tmp_write_path(&path).starts_with(&dir));
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn rejects_invalid_utf8() {
        let path = temp_path("utf8");
        fs::write(&path, b"{\"id\":\"d\xff\"}\n").expect("fixture should write");
        match read_documents_from_path(&path) {
            Err(StoreError::Corrupt(message)) => assert!(message.contains("after byte 8")),
            other => panic!("expected corrupt input error, got {other:?}"),
        }
        let _ = fs::remove_file(path);
    }

    #[test]
    fn documents_survive_write_and_read() {
        let docs = read_documents(CORPUS.as_bytes(), "corpus").expect("corpus should parse");
        let mut buffer = Vec::new();
        write_lines(&mut buffer, &docs, "buffer").expect("write should succeed");
        let back = read_documents(buffer.as_slice(), "buffer").expect("reparse should succeed");
        assert_eq!(back, docs);
    }
}

//! `.tlbundle` containers: a JSON object listing base64-encoded members.
//!
//! ```json
//! {"files": [{"name": "wm.json", "content": "eyJ0eXBlIjoi..."}]}
//! ```

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use tracelens_core::{LoadError, TraceFile};

pub const BUNDLE_EXTENSION: &str = "tlbundle";

/// Nested bundles deeper than this are treated as corrupted.
const MAX_NESTING: usize = 8;

#[derive(Serialize, Deserialize)]
struct Bundle {
    files: Vec<BundleMember>,
}

#[derive(Serialize, Deserialize)]
struct BundleMember {
    name: String,
    content: String,
}

pub fn is_bundle(file: &TraceFile) -> bool {
    file.has_extension(BUNDLE_EXTENSION)
}

fn unpack_one(file: &TraceFile) -> Result<Vec<TraceFile>, LoadError> {
    let corrupted = || LoadError::CorruptedArchive {
        file: file.name.clone(),
    };
    let bundle: Bundle = serde_json::from_slice(&file.content).map_err(|_| corrupted())?;
    bundle
        .files
        .into_iter()
        .map(|member| {
            let content = STANDARD.decode(member.content).map_err(|_| corrupted())?;
            Ok(TraceFile::new(member.name, content))
        })
        .collect()
}

/// Expand bundles (recursively) into their members; other files pass
/// through untouched. A bundle that cannot be opened is reported and
/// skipped as a whole.
pub fn flatten(files: Vec<TraceFile>) -> (Vec<TraceFile>, Vec<LoadError>) {
    let mut out = Vec::new();
    let mut errors = Vec::new();
    let mut stack: Vec<(TraceFile, usize)> = files.into_iter().rev().map(|f| (f, 0)).collect();

    while let Some((file, depth)) = stack.pop() {
        if !is_bundle(&file) {
            out.push(file);
            continue;
        }
        if depth >= MAX_NESTING {
            errors.push(LoadError::CorruptedArchive { file: file.name });
            continue;
        }
        match unpack_one(&file) {
            Ok(members) => {
                tracing::debug!(bundle = %file.name, members = members.len(), "unpacked bundle");
                stack.extend(members.into_iter().rev().map(|m| (m, depth + 1)));
            }
            Err(err) => errors.push(err),
        }
    }
    (out, errors)
}

/// Encode `files` as a bundle named `name`.
pub fn pack(name: impl Into<String>, files: &[TraceFile]) -> TraceFile {
    let bundle = Bundle {
        files: files
            .iter()
            .map(|f| BundleMember {
                name: f.name.clone(),
                content: STANDARD.encode(&f.content),
            })
            .collect(),
    };
    // serializing plain strings cannot fail
    let content = serde_json::to_vec(&bundle).unwrap_or_default();
    TraceFile::new(name, content)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(files: &[TraceFile]) -> Vec<&str> {
        files.iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn plain_files_pass_through() {
        let (files, errors) = flatten(vec![TraceFile::new("a.json", "{}")]);
        assert_eq!(names(&files), vec!["a.json"]);
        assert!(errors.is_empty());
    }

    #[test]
    fn nested_bundles_keep_member_order() {
        let inner = pack("inner.tlbundle", &[TraceFile::new("b.json", "b")]);
        let outer = pack(
            "outer.tlbundle",
            &[TraceFile::new("a.json", "a"), inner, TraceFile::new("c.json", "c")],
        );
        let (files, errors) = flatten(vec![outer, TraceFile::new("d.json", "d")]);
        assert!(errors.is_empty());
        assert_eq!(names(&files), vec!["a.json", "b.json", "c.json", "d.json"]);
        assert_eq!(files[1].content.as_ref(), b"b");
    }

    #[test]
    fn corrupted_bundle_is_reported() {
        let broken = TraceFile::new("broken.tlbundle", "not json");
        let bad_base64 = TraceFile::new(
            "bad.TLBUNDLE",
            r#"{"files": [{"name": "x.json", "content": "***"}]}"#,
        );
        let (files, errors) = flatten(vec![broken, bad_base64, TraceFile::new("ok.json", "{}")]);
        assert_eq!(names(&files), vec!["ok.json"]);
        assert_eq!(
            errors,
            vec![
                LoadError::CorruptedArchive {
                    file: "broken.tlbundle".into()
                },
                LoadError::CorruptedArchive {
                    file: "bad.TLBUNDLE".into()
                },
            ]
        );
    }
}

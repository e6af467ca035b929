use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use super::error::AssembleError;
use crate::infrastructure::storage::ObjectStore;

const SEGMENT_EXT: &str = "ts";
const MANIFEST_EXT: &str = "m3u8";
const SEGMENT_CONTENT_TYPE: &str = "video/mp2t";
const MANIFEST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";

/// Uploads a transcoded package to the object store and republishes the
/// manifest with every segment reference rewritten to the segment's
/// uploaded address. The manifest goes up last, only after all segment
/// uploads have landed.
pub struct PackageAssembler {
    store: Arc<dyn ObjectStore>,
    concurrency: usize,
}

impl PackageAssembler {
    pub fn new(store: Arc<dyn ObjectStore>, concurrency: usize) -> Self {
        Self {
            store,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn assemble(&self, job_id: &str, output_dir: &Path) -> Result<String, AssembleError> {
        let (segments, manifest) = classify_output(output_dir).await?;

        let segment_map = self.upload_segments(job_id, output_dir, &segments).await?;
        info!(job_id, segments = segment_map.len(), "segment uploads complete");

        let manifest_text = tokio::fs::read_to_string(output_dir.join(&manifest)).await?;
        let rewritten = rewrite_manifest(&manifest_text, &segment_map)?;

        let manifest_name = format!("{job_id}-output.{MANIFEST_EXT}");
        let asset = self
            .store
            .upload(
                &manifest_name,
                Bytes::from(rewritten.into_bytes()),
                MANIFEST_CONTENT_TYPE,
            )
            .await
            .map_err(|e| AssembleError::UploadFailure {
                name: manifest_name.clone(),
                detail: e.to_string(),
            })?;

        Ok(asset.address)
    }

    /// Bounded-fan-out upload of every segment; any single failure
    /// aborts the whole assembly. Objects are keyed `<job_id>-<file>` so
    /// concurrent jobs cannot collide and a retried job overwrites its
    /// own previous attempt.
    async fn upload_segments(
        &self,
        job_id: &str,
        output_dir: &Path,
        segments: &[String],
    ) -> Result<HashMap<String, String>, AssembleError> {
        let mut uploads = stream::iter(segments.iter().cloned())
            .map(|name| {
                let store = self.store.clone();
                let local_path = output_dir.join(&name);
                let remote_name = format!("{job_id}-{name}");
                async move {
                    let body = tokio::fs::read(&local_path)
                        .await
                        .map_err(|e| AssembleError::UploadFailure {
                            name: name.clone(),
                            detail: e.to_string(),
                        })?;
                    let asset = store
                        .upload(&remote_name, Bytes::from(body), SEGMENT_CONTENT_TYPE)
                        .await
                        .map_err(|e| AssembleError::UploadFailure {
                            name: name.clone(),
                            detail: e.to_string(),
                        })?;
                    Ok::<_, AssembleError>((name, asset.address))
                }
            })
            .buffer_unordered(self.concurrency);

        let mut map = HashMap::new();
        while let Some(result) = uploads.next().await {
            let (name, address) = result?;
            map.insert(name, address);
        }
        Ok(map)
    }
}

/// Splits the output directory into segment files and the single
/// manifest. Zero or multiple manifests mean the engine misbehaved.
async fn classify_output(output_dir: &Path) -> Result<(Vec<String>, String), AssembleError> {
    let mut segments = Vec::new();
    let mut manifests = Vec::new();

    let mut entries = tokio::fs::read_dir(output_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let path: PathBuf = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        match path.extension().and_then(|e| e.to_str()) {
            Some(SEGMENT_EXT) => segments.push(name.to_string()),
            Some(MANIFEST_EXT) => manifests.push(name.to_string()),
            _ => {}
        }
    }

    // Stable upload order; playback order is owned by the manifest.
    segments.sort();

    match manifests.as_slice() {
        [one] => Ok((segments, one.clone())),
        [] => Err(AssembleError::Layout("no manifest in output".to_string())),
        many => Err(AssembleError::Layout(format!(
            "{} manifests in output, expected exactly one",
            many.len()
        ))),
    }
}

/// Replaces each segment-reference line with its uploaded address.
/// Matching is whole-token only, which keeps `seg1.ts` from mangling
/// `seg10.ts`, and makes the rewrite idempotent: an already-absolute
/// reference is never a key in the map and passes through untouched.
///
/// The manifest/upload correspondence is enforced in one direction
/// only. A reference with no uploaded counterpart is an error (the
/// player would get a dead link). An uploaded segment the manifest
/// never references just logs a warning: rewriting an already-rewritten
/// manifest leaves every map entry unreferenced, so erroring here would
/// make the rewrite non-reentrant for retried assemblies.
pub fn rewrite_manifest(
    manifest: &str,
    segment_map: &HashMap<String, String>,
) -> Result<String, AssembleError> {
    let mut out = Vec::with_capacity(manifest.lines().count());
    for line in manifest.lines() {
        let token = line.trim();
        if token.is_empty() || token.starts_with('#') {
            out.push(line.to_string());
            continue;
        }
        if let Some(address) = segment_map.get(token) {
            out.push(address.clone());
        } else if token.contains("://") {
            // Already rewritten on a previous attempt.
            out.push(line.to_string());
        } else {
            return Err(AssembleError::RewriteFailure(token.to_string()));
        }
    }

    let referenced: usize = manifest
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .filter(|l| segment_map.contains_key(*l))
        .count();
    if referenced < segment_map.len() {
        warn!(
            uploaded = segment_map.len(),
            referenced, "manifest does not reference every uploaded segment"
        );
    }

    let mut text = out.join("\n");
    text.push('\n');
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::MemoryObjectStore;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn rewrite_replaces_whole_tokens_only() {
        let manifest = "#EXTM3U\n#EXTINF:10,\nseg1.ts\n#EXTINF:10,\nseg10.ts\n";
        let map = map(&[
            ("seg1.ts", "http://store/b/j-seg1.ts"),
            ("seg10.ts", "http://store/b/j-seg10.ts"),
        ]);
        let out = rewrite_manifest(manifest, &map).unwrap();
        assert!(out.contains("http://store/b/j-seg1.ts\n"));
        assert!(out.contains("http://store/b/j-seg10.ts\n"));
        // A substring replace would have produced this corruption.
        assert!(!out.contains("j-seg1.ts0"));
        assert!(!out.contains("seg1.ts0.ts"));
    }

    #[test]
    fn rewrite_preserves_directive_lines_and_order() {
        let manifest = "#EXTM3U\n#EXT-X-TARGETDURATION:10\nseg0.ts\nseg1.ts\nseg2.ts\n#EXT-X-ENDLIST\n";
        let map = map(&[
            ("seg0.ts", "http://s/0"),
            ("seg1.ts", "http://s/1"),
            ("seg2.ts", "http://s/2"),
        ]);
        let out = rewrite_manifest(manifest, &map).unwrap();
        assert_eq!(
            out,
            "#EXTM3U\n#EXT-X-TARGETDURATION:10\nhttp://s/0\nhttp://s/1\nhttp://s/2\n#EXT-X-ENDLIST\n"
        );
    }

    #[test]
    fn rewrite_is_idempotent() {
        let manifest = "#EXTM3U\nseg0.ts\n";
        let map = map(&[("seg0.ts", "http://s/0")]);
        let once = rewrite_manifest(manifest, &map).unwrap();
        let twice = rewrite_manifest(&once, &map).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn rewrite_tolerates_unreferenced_uploads() {
        // The engine may emit a segment the manifest never picked up;
        // the rewrite must still succeed (and stay reentrant) rather
        // than fail the whole job.
        let manifest = "#EXTM3U\nseg0.ts\n";
        let map = map(&[("seg0.ts", "http://s/0"), ("orphan.ts", "http://s/x")]);
        let once = rewrite_manifest(manifest, &map).unwrap();
        assert_eq!(once, "#EXTM3U\nhttp://s/0\n");
        let twice = rewrite_manifest(&once, &map).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn rewrite_rejects_unmapped_segment_references() {
        let manifest = "#EXTM3U\nghost.ts\n";
        let err = rewrite_manifest(manifest, &map(&[])).unwrap_err();
        match err {
            AssembleError::RewriteFailure(token) => assert_eq!(token, "ghost.ts"),
            other => panic!("expected RewriteFailure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn assemble_uploads_segments_then_rewritten_manifest() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["seg0.ts", "seg1.ts", "seg2.ts"] {
            std::fs::write(dir.path().join(name), name.as_bytes()).unwrap();
        }
        std::fs::write(
            dir.path().join("output.m3u8"),
            "#EXTM3U\nseg0.ts\nseg1.ts\nseg2.ts\n",
        )
        .unwrap();

        let store = Arc::new(MemoryObjectStore::default());
        let assembler = PackageAssembler::new(store.clone(), 2);
        let url = assembler.assemble("job-42", dir.path()).await.unwrap();
        assert!(url.ends_with("job-42-output.m3u8"));

        let objects = store.objects();
        assert_eq!(objects.len(), 4);
        let manifest = String::from_utf8(objects["job-42-output.m3u8"].clone()).unwrap();
        for name in ["seg0.ts", "seg1.ts", "seg2.ts"] {
            // No local filename survives as a standalone reference, and
            // the per-job object for it exists.
            assert!(objects.contains_key(&format!("job-42-{name}")));
            assert!(!manifest.lines().any(|l| l == name));
        }
        // References stay in playback order.
        let refs: Vec<&str> = manifest.lines().filter(|l| !l.starts_with('#')).collect();
        assert_eq!(refs.len(), 3);
        assert!(refs[0].contains("seg0.ts"));
        assert!(refs[1].contains("seg1.ts"));
        assert!(refs[2].contains("seg2.ts"));
    }

    #[tokio::test]
    async fn failed_segment_upload_aborts_assembly() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("seg0.ts"), b"x").unwrap();
        std::fs::write(dir.path().join("output.m3u8"), "#EXTM3U\nseg0.ts\n").unwrap();

        let store = Arc::new(MemoryObjectStore::failing());
        let assembler = PackageAssembler::new(store.clone(), 2);
        let err = assembler.assemble("job-f", dir.path()).await.unwrap_err();
        match err {
            AssembleError::UploadFailure { name, .. } => assert_eq!(name, "seg0.ts"),
            other => panic!("expected UploadFailure, got {other:?}"),
        }
        // The manifest never went up.
        assert!(!store.objects().contains_key("job-f-output.m3u8"));
    }

    #[tokio::test]
    async fn missing_manifest_is_a_layout_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("seg0.ts"), b"x").unwrap();

        let assembler = PackageAssembler::new(Arc::new(MemoryObjectStore::default()), 2);
        let err = assembler.assemble("job-l", dir.path()).await.unwrap_err();
        assert!(matches!(err, AssembleError::Layout(_)));
    }
}

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Metadata attached to a document by the loading/chunking stage.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DocumentMetadata {
    /// Absolute or display path of the originating file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Path relative to the project root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,

    /// Lowercased extension including the dot, e.g. `.md`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,

    /// Name of the parent folder (characters, places, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,

    /// Position of the chunk within its file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<usize>,

    /// Any other scalar metadata
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Stable identifier of a [`Document`], derived from its content and metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An immutable passage of retrievable text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// The passage text (post-chunking)
    pub content: String,

    #[serde(default)]
    pub metadata: DocumentMetadata,
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: DocumentMetadata::default(),
        }
    }

    pub fn with_metadata(content: impl Into<String>, metadata: DocumentMetadata) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }

    /// Identifier used to de-duplicate documents across result sets.
    ///
    /// Two documents with equal content and metadata always share an id.
    pub fn id(&self) -> DocumentId {
        let mut hasher = Sha256::new();
        let meta = &self.metadata;
        for field in [
            &meta.source,
            &meta.relative_path,
            &meta.file_name,
            &meta.file_type,
            &meta.folder,
        ] {
            hasher.update(field.as_deref().unwrap_or_default().as_bytes());
            hasher.update([0x1f]);
        }
        if let Some(index) = meta.chunk_index {
            hasher.update(index.to_le_bytes());
        }
        hasher.update([0x1e]);
        for (key, value) in &meta.extra {
            hasher.update(key.as_bytes());
            hasher.update([b'=']);
            hasher.update(value.to_string().as_bytes());
            hasher.update([0x1f]);
        }
        hasher.update([0x1e]);
        hasher.update(self.content.as_bytes());
        DocumentId(format!("{:x}", hasher.finalize()))
    }

    /// Display name of the document's origin.
    pub fn source(&self) -> &str {
        self.metadata
            .relative_path
            .as_deref()
            .or(self.metadata.source.as_deref())
            .unwrap_or("unknown")
    }

    /// First `max_chars` characters of the content on a single line.
    pub fn preview(&self, max_chars: usize) -> String {
        let flat: String = self
            .content
            .chars()
            .map(|c| if c == '\n' { ' ' } else { c })
            .take(max_chars)
            .collect();
        if self.content.chars().count() > max_chars {
            format!("{flat}...")
        } else {
            flat
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn metadata(path: &str, chunk: usize) -> DocumentMetadata {
        DocumentMetadata {
            relative_path: Some(path.to_string()),
            chunk_index: Some(chunk),
            ..Default::default()
        }
    }

    #[test]
    fn test_id_is_stable() {
        let a = Document::with_metadata("Maya is a programmer", metadata("maya.md", 0));
        let b = a.clone();
        assert_eq!(a.id(), b.id());
        assert_eq!(a.id().as_str().len(), 64);
    }

    #[test]
    fn test_id_depends_on_content_and_metadata() {
        let base = Document::with_metadata("The Nexus", metadata("world.md", 0));
        let other_chunk = Document::with_metadata("The Nexus", metadata("world.md", 1));
        let other_text = Document::with_metadata("The Nexus core", metadata("world.md", 0));

        assert_ne!(base.id(), other_chunk.id());
        assert_ne!(base.id(), other_text.id());
    }

    #[test]
    fn test_id_includes_extra_metadata() {
        let mut meta = metadata("alex.md", 0);
        let plain = Document::with_metadata("Alex", meta.clone());
        meta.extra
            .insert("pov".to_string(), serde_json::Value::String("alex".into()));
        let tagged = Document::with_metadata("Alex", meta);

        assert_ne!(plain.id(), tagged.id());
    }

    #[test]
    fn test_source_fallbacks() {
        let doc = Document::new("text");
        assert_eq!(doc.source(), "unknown");

        let doc = Document::with_metadata(
            "text",
            DocumentMetadata {
                source: Some("/notes/places.md".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(doc.source(), "/notes/places.md");
    }

    #[test]
    fn test_preview() {
        let doc = Document::new("line one\nline two");
        assert_eq!(doc.preview(8), "line one...");
        assert_eq!(doc.preview(100), "line one line two");
    }

    #[test]
    fn test_metadata_serde_flattens_extra() {
        let json = r#"{"relative_path":"a.md","tone":"grim"}"#;
        let meta: DocumentMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta.relative_path.as_deref(), Some("a.md"));
        assert_eq!(
            meta.extra.get("tone"),
            Some(&serde_json::Value::String("grim".to_string()))
        );
    }
}

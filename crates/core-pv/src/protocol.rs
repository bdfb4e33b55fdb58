//! PV reference parsing.
//!
//! A reference is a text identifier from a display file. A leading
//! `pva://` selects PVAccess; everything else is Channel Access. For
//! PVA the remainder may carry a dotted field path with bracketed
//! element indices (`Camera.dimension[0].size`): the first dotted
//! segment is the server-side channel name, the rest navigates the
//! served structure. CA names pass through whole; record field
//! suffixes like `.SEVR` belong to the server-side name there.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PvProtocol {
    #[default]
    Ca,
    Pva,
}

/// One dotted segment of a PVA field path, with any bracketed indices
/// that followed it (`dimension[0]` -> name "dimension", indices [0]).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathSegment {
    pub name: String,
    pub indices: Vec<usize>,
}

/// A parsed field path. `request_path()` renders the form sent over
/// the network: indices stripped, since servers only serve the
/// unindexed field; the indices are applied locally on extraction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FieldPath {
    pub segments: Vec<PathSegment>,
}

impl FieldPath {
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn request_path(&self) -> String {
        self.segments
            .iter()
            .map(|segment| segment.name.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(&segment.name)?;
            for index in &segment.indices {
                write!(f, "[{index}]")?;
            }
        }
        Ok(())
    }
}

/// A parsed PV reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PvReference {
    pub protocol: PvProtocol,
    /// Original text, trimmed. This is what channel keys are built on.
    pub raw: String,
    /// Server-side channel name (prefix and field path removed).
    pub name: String,
    /// PVA structure navigation; always empty for CA.
    pub path: FieldPath,
}

impl PvReference {
    /// Parse a display-file channel string. Empty (after trimming)
    /// yields a reference with an empty name that callers treat as
    /// "no channel configured".
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Self {
                protocol: PvProtocol::Ca,
                raw: String::new(),
                name: String::new(),
                path: FieldPath::default(),
            };
        }

        let lower = trimmed.to_ascii_lowercase();
        if let Some(rest) = lower
            .starts_with("pva://")
            .then(|| &trimmed["pva://".len()..])
        {
            let (name, path) = split_pva_path(rest);
            return Self {
                protocol: PvProtocol::Pva,
                raw: trimmed.to_string(),
                name,
                path,
            };
        }

        Self {
            protocol: PvProtocol::Ca,
            raw: trimmed.to_string(),
            name: trimmed.to_string(),
            path: FieldPath::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }
}

fn split_pva_path(rest: &str) -> (String, FieldPath) {
    let mut parts = rest.splitn(2, '.');
    let name = parts.next().unwrap_or("").to_string();
    let path = parts
        .next()
        .map(parse_field_path)
        .unwrap_or_default();
    (name, path)
}

fn parse_field_path(text: &str) -> FieldPath {
    let mut segments = Vec::new();
    for piece in text.split('.') {
        if piece.is_empty() {
            continue;
        }
        let mut name = piece;
        let mut indices = Vec::new();
        while let Some(open) = name.rfind('[') {
            let Some(close) = name[open..].find(']') else {
                break;
            };
            let inner = &name[open + 1..open + close];
            match inner.parse::<usize>() {
                Ok(index) => indices.insert(0, index),
                Err(_) => break,
            }
            name = &name[..open];
        }
        segments.push(PathSegment {
            name: name.to_string(),
            indices,
        });
    }
    FieldPath { segments }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ca_names_pass_through() {
        let parsed = PvReference::parse("  LINAC:BPM1.SEVR ");
        assert_eq!(parsed.protocol, PvProtocol::Ca);
        assert_eq!(parsed.name, "LINAC:BPM1.SEVR");
        assert_eq!(parsed.raw, "LINAC:BPM1.SEVR");
        assert!(parsed.path.is_empty());
    }

    #[test]
    fn pva_prefix_is_case_insensitive() {
        let parsed = PvReference::parse("PVA://dev:temp");
        assert_eq!(parsed.protocol, PvProtocol::Pva);
        assert_eq!(parsed.name, "dev:temp");
    }

    #[test]
    fn pva_dotted_path_with_index() {
        let parsed = PvReference::parse("pva://Camera.dimension[0].size");
        assert_eq!(parsed.protocol, PvProtocol::Pva);
        assert_eq!(parsed.name, "Camera");
        assert_eq!(parsed.path.segments.len(), 2);
        assert_eq!(parsed.path.segments[0].name, "dimension");
        assert_eq!(parsed.path.segments[0].indices, vec![0]);
        assert_eq!(parsed.path.segments[1].name, "size");
        assert!(parsed.path.segments[1].indices.is_empty());
        // Network-side request strips the indices.
        assert_eq!(parsed.path.request_path(), "dimension.size");
        assert_eq!(parsed.path.to_string(), "dimension[0].size");
    }

    #[test]
    fn empty_reference() {
        assert!(PvReference::parse("   ").is_empty());
        assert!(!PvReference::parse("X").is_empty());
    }
}

// media.rs - media descriptors and the URL query convention

use std::collections::BTreeMap;

/// Sidecar metadata attached to a media reference (`info.type` and friends).
pub type MediaInfo = BTreeMap<String, String>;

const VIDEO_EXTENSIONS: [&str; 3] = ["mp4", "webm", "ogg"];
const MODEL_EXTENSIONS: [&str; 2] = ["glb", "gltf"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Image,
    Video,
    Model,
}

/// One media load request. Replaced wholesale on every new media event.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaDescriptor {
    pub source_ref: String,
    pub filename: String,
    pub is_video: bool,
    pub info: Option<MediaInfo>,
}

impl MediaDescriptor {
    /// Build a descriptor from a path or URL, deriving the filename and the
    /// video flag from it.
    pub fn from_source(source_ref: impl Into<String>, info: Option<MediaInfo>) -> Self {
        let source_ref = source_ref.into();
        let filename = file_name_of(&source_ref).to_string();
        let is_video = has_extension(&source_ref, &VIDEO_EXTENSIONS);
        Self {
            source_ref,
            filename,
            is_video,
            info: info.filter(|m| !m.is_empty()),
        }
    }

    pub fn kind(&self) -> SourceKind {
        if has_extension(&self.filename, &MODEL_EXTENSIONS)
            || has_extension(&self.source_ref, &MODEL_EXTENSIONS)
        {
            SourceKind::Model
        } else if self.is_video {
            SourceKind::Video
        } else {
            SourceKind::Image
        }
    }

    /// `info.type`, if present.
    pub fn info_type(&self) -> Option<&str> {
        self.info.as_ref()?.get("type").map(String::as_str)
    }
}

fn file_name_of(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    path.rsplit('/').next().unwrap_or(path)
}

fn has_extension(path: &str, exts: &[&str]) -> bool {
    let name = file_name_of(path);
    match name.rsplit_once('.') {
        Some((_, ext)) => exts.iter().any(|e| ext.eq_ignore_ascii_case(e)),
        None => false,
    }
}

/// Decode `%XX` escapes and `+` the way browsers decode form-encoded query
/// strings. Malformed escapes are kept verbatim.
pub fn decode_component(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                let (hi, lo) = (bytes[i + 1], bytes[i + 2]);
                let hex = (hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit())
                    .then(|| (hex_value(hi) << 4) | hex_value(lo));
                match hex {
                    Some(b) => {
                        out.push(b);
                        i += 3;
                    }
                    None => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        _ => b - b'A' + 10,
    }
}

/// A source specified through a query string.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySource {
    pub source_ref: String,
    pub info: Option<MediaInfo>,
}

impl QuerySource {
    pub fn into_descriptor(self) -> MediaDescriptor {
        MediaDescriptor::from_source(self.source_ref, self.info)
    }
}

/// Interpret a query string (with or without the leading `?`).
///
/// Bare text is the source itself. With `key=value` pairs, `src`, `file` or
/// `path` names the source (in that order), falling back to the first key with
/// an empty value; every other pair becomes an `info` entry.
pub fn parse_query(query: &str) -> Option<QuerySource> {
    let query = query.strip_prefix('?').unwrap_or(query);
    if query.is_empty() {
        return None;
    }
    if !query.contains('=') {
        return Some(QuerySource {
            source_ref: query.to_string(),
            info: None,
        });
    }

    let pairs: Vec<(String, String)> = query
        .split('&')
        .filter(|p| !p.is_empty())
        .map(|p| match p.split_once('=') {
            Some((k, v)) => (decode_component(k), decode_component(v)),
            None => (decode_component(p), String::new()),
        })
        .collect();

    let lookup = |key: &str| {
        pairs
            .iter()
            .find(|(k, v)| k == key && !v.is_empty())
            .map(|(_, v)| v.clone())
    };
    let mut source_ref = lookup("src")
        .or_else(|| lookup("file"))
        .or_else(|| lookup("path"))
        .unwrap_or_default();
    let mut bare_key = None;
    if source_ref.is_empty() {
        if let Some((k, _)) = pairs.iter().find(|(k, v)| v.is_empty() && !k.is_empty()) {
            source_ref = k.clone();
            bare_key = Some(k.clone());
        }
    }
    if source_ref.is_empty() {
        return None;
    }

    let mut info = MediaInfo::new();
    for (k, v) in pairs {
        if matches!(k.as_str(), "src" | "file" | "path") {
            continue;
        }
        if v.is_empty() && bare_key.as_deref() == Some(k.as_str()) {
            continue;
        }
        info.insert(k, v);
    }

    Some(QuerySource {
        source_ref,
        info: (!info.is_empty()).then_some(info),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_filename_and_video_flag() {
        let d = MediaDescriptor::from_source("data/trips/clip_vr180.MP4", None);
        assert_eq!(d.filename, "clip_vr180.MP4");
        assert!(d.is_video);
        assert_eq!(d.kind(), SourceKind::Video);

        let d = MediaDescriptor::from_source("room.jpg", None);
        assert!(!d.is_video);
        assert_eq!(d.kind(), SourceKind::Image);

        let d = MediaDescriptor::from_source("models/chair.GLB", None);
        assert_eq!(d.kind(), SourceKind::Model);
    }

    #[test]
    fn empty_info_is_dropped() {
        let d = MediaDescriptor::from_source("a.png", Some(MediaInfo::new()));
        assert!(d.info.is_none());
        assert_eq!(d.info_type(), None);
    }

    #[test]
    fn bare_query_is_the_source() {
        let q = parse_query("?data/pano/room.jpg").unwrap();
        assert_eq!(q.source_ref, "data/pano/room.jpg");
        assert!(q.info.is_none());
    }

    #[test]
    fn keyed_query_splits_source_and_info() {
        let q = parse_query("file=data%2Fa+b.png&type=vr360&title=Hall").unwrap();
        assert_eq!(q.source_ref, "data/a b.png");
        let info = q.info.unwrap();
        assert_eq!(info.get("type").map(String::as_str), Some("vr360"));
        assert_eq!(info.get("title").map(String::as_str), Some("Hall"));
        assert!(!info.contains_key("file"));
    }

    #[test]
    fn src_wins_over_file_and_path() {
        let q = parse_query("path=p.png&file=f.png&src=s.png").unwrap();
        assert_eq!(q.source_ref, "s.png");
        assert!(q.info.is_none());
    }

    #[test]
    fn empty_valued_key_is_fallback_source() {
        let q = parse_query("data/x_sbs.png&type=sbs").unwrap();
        assert_eq!(q.source_ref, "data/x_sbs.png");
        let info = q.info.unwrap();
        assert_eq!(info.len(), 1);
        assert_eq!(info.get("type").map(String::as_str), Some("sbs"));
    }

    #[test]
    fn query_without_source_is_none() {
        assert_eq!(parse_query("type=vr180"), None);
        assert_eq!(parse_query(""), None);
        assert_eq!(parse_query("?"), None);
    }

    #[test]
    fn malformed_escape_is_kept() {
        assert_eq!(decode_component("100%"), "100%");
        assert_eq!(decode_component("a%zzb"), "a%zzb");
        assert_eq!(decode_component("%41"), "A");
        // a sign is not a hex digit; the `+` still reads as a space
        assert_eq!(decode_component("%+1"), "% 1");
        assert_eq!(decode_component("%-1"), "%-1");
    }
}

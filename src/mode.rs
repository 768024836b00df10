// mode.rs - projection mode classification from filename and sidecar metadata

use crate::media::{MediaDescriptor, SourceKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ViewMode {
    Flat,   // plain 2D image or video on a plane
    Sbs,    // side-by-side stereo on a plane
    Vr180,  // stereo hemisphere, viewed from inside
    Vr360,  // mono equirectangular sky
    Model,  // glTF / GLB asset
}

impl ViewMode {
    pub const ALL: [ViewMode; 5] = [
        ViewMode::Flat,
        ViewMode::Sbs,
        ViewMode::Vr180,
        ViewMode::Vr360,
        ViewMode::Model,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ViewMode::Flat => "flat",
            ViewMode::Sbs => "sbs",
            ViewMode::Vr180 => "vr180",
            ViewMode::Vr360 => "vr360",
            ViewMode::Model => "model",
        }
    }
}

/// Classify a media reference. Only the name and metadata are consulted,
/// so the answer is available before anything is decoded.
pub fn detect(descriptor: &MediaDescriptor) -> ViewMode {
    if descriptor.kind() == SourceKind::Model {
        return ViewMode::Model;
    }
    if let Some(mode) = mode_from_filename(&descriptor.filename) {
        return mode;
    }
    descriptor
        .info_type()
        .and_then(mode_from_info_type)
        .unwrap_or(ViewMode::Flat)
}

fn mode_from_filename(filename: &str) -> Option<ViewMode> {
    let name = filename.to_ascii_lowercase();
    if name.contains("vr180") {
        Some(ViewMode::Vr180)
    } else if name.contains("vr360") {
        Some(ViewMode::Vr360)
    } else if has_sbs_token(&name) {
        Some(ViewMode::Sbs)
    } else {
        None
    }
}

fn mode_from_info_type(info_type: &str) -> Option<ViewMode> {
    let ty = info_type.to_ascii_lowercase();
    if ty.contains("180") {
        Some(ViewMode::Vr180)
    } else if ty == "vr360" || has_word(&ty, "360") {
        Some(ViewMode::Vr360)
    } else if ty.contains("sbs") {
        Some(ViewMode::Sbs)
    } else {
        None
    }
}

/// `sbs` preceded by start, `_` or `-`, and followed by end, `_`, `-` or `.`.
fn has_sbs_token(name: &str) -> bool {
    name.match_indices("sbs").any(|(at, tok)| {
        let before = name[..at].chars().next_back();
        let after = name[at + tok.len()..].chars().next();
        matches!(before, None | Some('_') | Some('-'))
            && matches!(after, None | Some('_') | Some('-') | Some('.'))
    })
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// `needle` occurring with word boundaries on both sides.
fn has_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(at, tok)| {
        let before = haystack[..at].chars().next_back();
        let after = haystack[at + tok.len()..].chars().next();
        !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaInfo;

    fn with_type(name: &str, ty: &str) -> MediaDescriptor {
        let mut info = MediaInfo::new();
        info.insert("type".into(), ty.into());
        MediaDescriptor::from_source(name, Some(info))
    }

    fn bare(name: &str) -> MediaDescriptor {
        MediaDescriptor::from_source(name, None)
    }

    #[test]
    fn vr180_filename_beats_metadata() {
        for ty in ["vr360", "sbs", "flat", "360"] {
            assert_eq!(detect(&with_type("trip_VR180_day2.jpg", ty)), ViewMode::Vr180);
        }
    }

    #[test]
    fn filename_tokens() {
        assert_eq!(detect(&bare("clip_vr180.mp4")), ViewMode::Vr180);
        assert_eq!(detect(&bare("hall.vr360.jpg")), ViewMode::Vr360);
        assert_eq!(detect(&bare("pair_sbs.png")), ViewMode::Sbs);
        assert_eq!(detect(&bare("sbs-left.png")), ViewMode::Sbs);
        assert_eq!(detect(&bare("x-SBS_y.png")), ViewMode::Sbs);
        assert_eq!(detect(&bare("data/clips/sbs")), ViewMode::Sbs);
    }

    #[test]
    fn sbs_needs_token_boundaries() {
        assert_eq!(detect(&bare("hobbsbs.png")), ViewMode::Flat);
        assert_eq!(detect(&bare("sbsfoo.png")), ViewMode::Flat);
        assert_eq!(detect(&bare("absbs.png")), ViewMode::Flat);
    }

    #[test]
    fn info_type_signals() {
        assert_eq!(detect(&with_type("room.jpg", "vr360")), ViewMode::Vr360);
        assert_eq!(detect(&with_type("room.jpg", "VR180")), ViewMode::Vr180);
        assert_eq!(detect(&with_type("room.jpg", "180")), ViewMode::Vr180);
        assert_eq!(detect(&with_type("room.jpg", "mono 360")), ViewMode::Vr360);
        assert_eq!(detect(&with_type("room.jpg", "half-sbs")), ViewMode::Sbs);
        assert_eq!(detect(&with_type("room.jpg", "x3600")), ViewMode::Flat);
        assert_eq!(detect(&with_type("room.jpg", "photo")), ViewMode::Flat);
    }

    #[test]
    fn sbs_metadata_without_filename_token() {
        for ty in ["sbs", "SBS", "full-sbs", "sbs_lr"] {
            assert_eq!(detect(&with_type("pair.png", ty)), ViewMode::Sbs);
        }
    }

    #[test]
    fn model_extension_precedes_everything() {
        assert_eq!(detect(&with_type("robot_vr180.glb", "vr180")), ViewMode::Model);
        assert_eq!(detect(&bare("scene.gltf")), ViewMode::Model);
    }

    #[test]
    fn nothing_matched_is_flat() {
        assert_eq!(detect(&bare("holiday.jpg")), ViewMode::Flat);
        assert_eq!(detect(&bare("clip.webm")), ViewMode::Flat);
    }
}

use serde::{Deserialize, Serialize};

/// Kind of elementary stream a demuxer can hand out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    Audio,
    Video,
}

/// How aggressively the source should buffer ahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preload {
    None,
    Metadata,
    #[default]
    Auto,
}

impl Preload {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Some(Preload::None),
            "metadata" => Some(Preload::Metadata),
            "auto" => Some(Preload::Auto),
            _ => None,
        }
    }
}

/// Natural (unscaled) dimensions of the decoded video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct VideoSize {
    pub width: u32,
    pub height: u32,
}

impl VideoSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preload_parse_is_case_insensitive() {
        assert_eq!(Preload::parse("Metadata"), Some(Preload::Metadata));
        assert_eq!(Preload::parse(" none "), Some(Preload::None));
        assert_eq!(Preload::parse("eager"), None);
    }
}

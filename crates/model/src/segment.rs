use std::sync::LazyLock;

use percent_encoding::percent_decode_str;
use regex::Regex;
use url::Url;

/// Matched links longer than this are summarized as `scheme://host/…/file`.
pub const MAX_UNSHORTENED_LINK_LENGTH: usize = 50;

const YOUTUBE_EMBED_PREFIX: &str = "https://www.youtube.com/embed/";
const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "gif"];
const VIDEO_EXTENSIONS: [&str; 4] = ["avi", "mov", "mp4", "webm"];

static LINK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)(?:(?:https?|ftp|file)://|www\.|ftp\.)",
        r"(?:\([-A-Z0-9+&@#/%=~_|$?!:,.]*\)|[-A-Z0-9+&@#/%=~_|$?!:,.])*",
        r"(?:\([-A-Z0-9+&@#/%=~_|$?!:,.]*\)|[A-Z0-9+&@#/%=~_|$])",
    ))
    .expect("link pattern is a valid regex")
});

static YOUTUBE_VIDEO_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[?]v[=]([0-9a-zA-Z_-]+)").expect("video id pattern is a valid regex")
});

/// Display class of one fragment of a line's message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    Plain,
    Link,
    Embed,
    Image,
    Video,
}

impl SegmentKind {
    pub fn is_plain(self) -> bool {
        matches!(self, Self::Plain)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Link => "link",
            Self::Embed => "embed",
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

/// One classified fragment. Segments are never edited; a message change rebuilds all of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    kind: SegmentKind,
    text: String,
    summary: String,
    embed_url: Option<String>,
}

impl Segment {
    pub fn plain(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            kind: SegmentKind::Plain,
            summary: text.clone(),
            text,
            embed_url: None,
        }
    }

    /// Builds a non-plain segment from matched link text, degrading to `Link`
    /// whenever the text does not parse as a usable http(s) URL.
    pub fn link(text: impl Into<String>) -> Self {
        let text = text.into();
        match LinkParts::parse(&text) {
            Some(parts) => {
                let (kind, embed_url) = parts.classify(&text);
                Self {
                    kind,
                    summary: parts.summary(&text),
                    text,
                    embed_url,
                }
            }
            None => Self {
                kind: SegmentKind::Link,
                summary: text.clone(),
                text,
                embed_url: None,
            },
        }
    }

    pub fn kind(&self) -> SegmentKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn embed_url(&self) -> Option<&str> {
        self.embed_url.as_deref()
    }
}

struct LinkParts {
    scheme: String,
    host: String,
    file: String,
    extension: String,
}

impl LinkParts {
    fn parse(text: &str) -> Option<Self> {
        if !text.starts_with("http") {
            return None;
        }

        let url = Url::parse(text).ok()?;
        let host = url.host_str().unwrap_or_default().to_string();
        let file = url
            .path_segments()
            .and_then(|segments| segments.last())
            .map(|segment| percent_decode_str(segment).decode_utf8_lossy().into_owned())
            .unwrap_or_default();
        if host.is_empty() || file.is_empty() {
            return None;
        }

        // A file name without a dot is its own "extension".
        let extension = file
            .rsplit('.')
            .next()
            .unwrap_or_default()
            .to_lowercase();

        Some(Self {
            scheme: url.scheme().to_string(),
            host,
            file,
            extension,
        })
    }

    fn classify(&self, text: &str) -> (SegmentKind, Option<String>) {
        let extension = self.extension.as_str();
        if IMAGE_EXTENSIONS.contains(&extension) {
            return (SegmentKind::Image, None);
        }
        if VIDEO_EXTENSIONS.contains(&extension) {
            return (SegmentKind::Video, None);
        }
        if self.host.contains("youtube.com") {
            return match YOUTUBE_VIDEO_ID.captures(text) {
                Some(captures) => (
                    SegmentKind::Embed,
                    Some(format!("{YOUTUBE_EMBED_PREFIX}{}", &captures[1])),
                ),
                None => (SegmentKind::Link, None),
            };
        }
        (SegmentKind::Link, None)
    }

    fn summary(&self, text: &str) -> String {
        if text.chars().count() > MAX_UNSHORTENED_LINK_LENGTH && !self.extension.is_empty() {
            format!("{}://{}/\u{2026}/{}", self.scheme, self.host, self.file)
        } else {
            text.to_string()
        }
    }
}

/// Splits a message into display segments.
///
/// Only the first link-like match is lifted out. Whatever follows it, further
/// links included, stays in one trailing plain segment.
pub fn classify(message: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut rest = message;

    if let Some(found) = LINK_PATTERN.find(message) {
        let leading = message[..found.start()].trim();
        if !leading.is_empty() {
            segments.push(Segment::plain(leading));
        }
        segments.push(Segment::link(found.as_str()));
        rest = &message[found.end()..];
    }

    let trailing = rest.trim();
    if !trailing.is_empty() {
        segments.push(Segment::plain(trailing));
    }

    segments
}

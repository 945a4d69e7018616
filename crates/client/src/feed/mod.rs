//! Feed model and RSS 2.0 serialization.

mod date;

use chrono::{DateTime, Utc};
use rss::{ChannelBuilder, EnclosureBuilder, GuidBuilder, ImageBuilder, ItemBuilder};

pub use date::parse_date;

/// Generator string used when the SDD does not name one.
pub const DEFAULT_GENERATOR: &str = concat!("sitefeed/", env!("CARGO_PKG_VERSION"));

/// Channel-level metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedChannel {
    pub title: String,
    pub link: String,
    pub description: String,
    pub language: Option<String>,
    pub generator: Option<String>,
    pub favicon: Option<String>,
}

/// Media attached to an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enclosure {
    pub url: String,
    pub mime_type: String,
}

impl Enclosure {
    /// Image enclosure with a media type guessed from the URL.
    pub fn image(url: impl Into<String>) -> Self {
        let url = url.into();
        let mime_type = image_mime_type(&url).to_string();
        Self { url, mime_type }
    }
}

/// One output entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: Option<String>,
    pub id: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub published: DateTime<Utc>,
    pub enclosure: Option<Enclosure>,
}

/// A complete feed ready to serialize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    pub channel: FeedChannel,
    pub entries: Vec<FeedEntry>,
}

impl Feed {
    /// Serialize as an RSS 2.0 document.
    ///
    /// The output depends only on the feed's contents; no build timestamp
    /// is written.
    pub fn to_rss(&self) -> String {
        let items: Vec<rss::Item> = self.entries.iter().map(entry_to_item).collect();

        let image = self.channel.favicon.as_ref().map(|favicon| {
            ImageBuilder::default()
                .url(favicon.clone())
                .title(self.channel.title.clone())
                .link(self.channel.link.clone())
                .build()
        });

        let channel = ChannelBuilder::default()
            .title(self.channel.title.clone())
            .link(self.channel.link.clone())
            .description(self.channel.description.clone())
            .language(self.channel.language.clone())
            .generator(Some(self.channel.generator.clone().unwrap_or_else(|| DEFAULT_GENERATOR.to_string())))
            .image(image)
            .items(items)
            .build();

        channel.to_string()
    }
}

fn entry_to_item(entry: &FeedEntry) -> rss::Item {
    let guid = entry.id.as_ref().map(|id| {
        GuidBuilder::default()
            .value(id.clone())
            .permalink(entry.link.as_deref() == Some(id.as_str()))
            .build()
    });

    let enclosure = entry.enclosure.as_ref().map(|enclosure| {
        EnclosureBuilder::default()
            .url(enclosure.url.clone())
            .length("0".to_string())
            .mime_type(enclosure.mime_type.clone())
            .build()
    });

    ItemBuilder::default()
        .title(entry.title.clone())
        .link(entry.link.clone())
        .description(entry.description.clone())
        .guid(guid)
        .pub_date(Some(entry.published.to_rfc2822()))
        .enclosure(enclosure)
        .build()
}

/// Media type for an image URL, judged by its extension.
///
/// Unknown or missing extensions are reported as JPEG.
pub fn image_mime_type(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let extension = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "avif" => "image/avif",
        _ => "image/jpeg",
    }
}

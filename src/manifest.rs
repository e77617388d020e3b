//! Deep Zoom manifest documents.
//!
//! Two XML documents are produced, both consumed by Deep Zoom viewers
//! (OpenSeadragon, Silverlight MultiScaleImage):
//!
//! Per-image descriptor (`{name}.dzi`):
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <Image TileSize="256" Overlap="1" Format="jpg" xmlns="http://schemas.microsoft.com/deepzoom/2008">
//!   <Size Width="4200" Height="20000" />
//! </Image>
//! ```
//!
//! Collection descriptor (`collection.dzc`):
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <Collection MaxLevel="14" TileSize="256" Format="jpg" NextItemId="2" ServerFormat="Default" xmlns="http://schemas.microsoft.com/deepzoom/2008">
//!   <Items>
//!     <I Id="0" N="page_0000" Source="page_0000.dzi">
//!       <Size Width="4200" Height="20000" />
//!     </I>
//!     ...
//!   </Items>
//! </Collection>
//! ```
//!
//! The attribute order and layout above are the contract; the documents are
//! built with `format!` rather than a serializer so the output is
//! byte-for-byte stable. Names and sources are XML-escaped.

use crate::imaging::OutputFormat;
use quick_xml::escape::escape;
use std::fmt::Write;

pub const DEEPZOOM_NAMESPACE: &str = "http://schemas.microsoft.com/deepzoom/2008";

/// File extension of per-image manifests.
pub const IMAGE_MANIFEST_EXTENSION: &str = "dzi";

/// File extension of collection manifests.
pub const COLLECTION_MANIFEST_EXTENSION: &str = "dzc";

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Contents of a per-image `.dzi` manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageManifest {
    pub tile_size: u32,
    pub overlap: u32,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
}

impl ImageManifest {
    pub fn to_xml(&self) -> String {
        format!(
            "{XML_DECLARATION}\n\
             <Image TileSize=\"{}\" Overlap=\"{}\" Format=\"{}\" xmlns=\"{DEEPZOOM_NAMESPACE}\">\n\
             \x20 <Size Width=\"{}\" Height=\"{}\" />\n\
             </Image>\n",
            self.tile_size, self.overlap, self.format, self.width, self.height
        )
    }
}

/// One entry of a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionItem {
    pub id: usize,
    /// Display name: the source image's file stem.
    pub name: String,
    /// Per-image manifest file name, relative to the collection manifest.
    pub source: String,
    pub width: u32,
    pub height: u32,
}

/// Contents of a `.dzc` collection manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionManifest {
    pub max_level: u32,
    pub tile_size: u32,
    pub format: OutputFormat,
    pub items: Vec<CollectionItem>,
}

impl CollectionManifest {
    /// Ids are assigned contiguously from 0, so the next free id is the count.
    pub fn next_item_id(&self) -> usize {
        self.items.len()
    }

    pub fn to_xml(&self) -> String {
        let mut xml = String::new();
        // Writing to a String cannot fail.
        let _ = writeln!(xml, "{XML_DECLARATION}");
        let _ = writeln!(
            xml,
            "<Collection MaxLevel=\"{}\" TileSize=\"{}\" Format=\"{}\" NextItemId=\"{}\" ServerFormat=\"Default\" xmlns=\"{DEEPZOOM_NAMESPACE}\">",
            self.max_level,
            self.tile_size,
            self.format,
            self.next_item_id()
        );
        let _ = writeln!(xml, "  <Items>");
        for item in &self.items {
            let _ = writeln!(
                xml,
                "    <I Id=\"{}\" N=\"{}\" Source=\"{}\">",
                item.id,
                escape(item.name.as_str()),
                escape(item.source.as_str())
            );
            let _ = writeln!(
                xml,
                "      <Size Width=\"{}\" Height=\"{}\" />",
                item.width, item.height
            );
            let _ = writeln!(xml, "    </I>");
        }
        let _ = writeln!(xml, "  </Items>");
        let _ = writeln!(xml, "</Collection>");
        xml
    }
}

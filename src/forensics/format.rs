//! Magic-byte format detection.

use serde::{Deserialize, Serialize};

const PNG_SIGNATURE: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_SIGNATURE: &[u8] = &[0xFF, 0xD8, 0xFF];
const ICO_SIGNATURE: &[u8] = &[0x00, 0x00, 0x01, 0x00];
const AVIF_BRANDS: &[&[u8]] = &[b"avif", b"avis"];
const HEIC_BRANDS: &[&[u8]] = &[
    b"heic", b"heix", b"hevc", b"hevx", b"heim", b"heis", b"mif1", b"msf1",
];
/// How far into a text document to look for an `<svg` root
const SVG_SNIFF_LEN: usize = 1024;

/// Image formats recognized from content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Webp,
    Bmp,
    Tiff,
    Ico,
    Avif,
    Heic,
    Svg,
}

impl ImageFormat {
    /// Every recognized format.
    pub const ALL: [ImageFormat; 10] = [
        ImageFormat::Jpeg,
        ImageFormat::Png,
        ImageFormat::Gif,
        ImageFormat::Webp,
        ImageFormat::Bmp,
        ImageFormat::Tiff,
        ImageFormat::Ico,
        ImageFormat::Avif,
        ImageFormat::Heic,
        ImageFormat::Svg,
    ];

    /// Looks a format up by its stored name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|format| format.as_str().eq_ignore_ascii_case(name))
    }

    /// Canonical media type.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Webp => "image/webp",
            ImageFormat::Bmp => "image/bmp",
            ImageFormat::Tiff => "image/tiff",
            ImageFormat::Ico => "image/x-icon",
            ImageFormat::Avif => "image/avif",
            ImageFormat::Heic => "image/heic",
            ImageFormat::Svg => "image/svg+xml",
        }
    }

    /// Short lower-case name, as stored.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
            ImageFormat::Gif => "gif",
            ImageFormat::Webp => "webp",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Tiff => "tiff",
            ImageFormat::Ico => "ico",
            ImageFormat::Avif => "avif",
            ImageFormat::Heic => "heic",
            ImageFormat::Svg => "svg",
        }
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies the image format from leading bytes.
///
/// Returns `None` for anything unrecognized, including images served with an
/// image Content-Type whose bytes say otherwise.
pub fn sniff_format(data: &[u8]) -> Option<ImageFormat> {
    if data.starts_with(PNG_SIGNATURE) {
        return Some(ImageFormat::Png);
    }
    if data.starts_with(JPEG_SIGNATURE) {
        return Some(ImageFormat::Jpeg);
    }
    if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        return Some(ImageFormat::Gif);
    }
    if data.len() >= 12 && &data[..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        return Some(ImageFormat::Webp);
    }
    if data.starts_with(b"II*\0") || data.starts_with(b"MM\0*") {
        return Some(ImageFormat::Tiff);
    }
    if data.len() >= 12 && &data[4..8] == b"ftyp" {
        let brand = &data[8..12];
        if AVIF_BRANDS.contains(&brand) {
            return Some(ImageFormat::Avif);
        }
        if HEIC_BRANDS.contains(&brand) {
            return Some(ImageFormat::Heic);
        }
        return None;
    }
    if data.len() >= 14 && data.starts_with(b"BM") {
        return Some(ImageFormat::Bmp);
    }
    if data.len() >= 6 && data.starts_with(ICO_SIGNATURE) {
        return Some(ImageFormat::Ico);
    }
    if looks_like_svg(data) {
        return Some(ImageFormat::Svg);
    }
    None
}

fn looks_like_svg(data: &[u8]) -> bool {
    let head = &data[..data.len().min(SVG_SNIFF_LEN)];
    let text = String::from_utf8_lossy(head);
    let text = text.trim_start_matches('\u{feff}').trim_start();
    text.starts_with('<') && text.to_ascii_lowercase().contains("<svg")
}

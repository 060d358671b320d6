//! Source location map
//!
//! Writes a standalone HTML page showing an OpenStreetMap (Leaflet) map with a single
//! marker on the pollution source.

use std::{
    fs::File,
    io::{self, Write},
    path::{Path, PathBuf},
};

use crate::SourcePoint;

#[derive(thiserror::Error, Debug)]
pub enum MapError {
    #[error("failed to write the map to {0:?}")]
    Io(PathBuf, #[source] io::Error),
}
type Result<T> = std::result::Result<T, MapError>;

const LEAFLET: &str = "https://unpkg.com/leaflet@1.9.4/dist";

fn escape(text: &str) -> String {
    text.chars()
        .fold(String::with_capacity(text.len()), |mut s, c| {
            match c {
                '&' => s.push_str("&amp;"),
                '<' => s.push_str("&lt;"),
                '>' => s.push_str("&gt;"),
                '"' => s.push_str("&quot;"),
                '\'' => s.push_str("&#39;"),
                c => s.push(c),
            }
            s
        })
}

/// Escapes `text` for a double-quoted JavaScript string inside a `<script>` element
fn escape_js(text: &str) -> String {
    text.chars()
        .fold(String::with_capacity(text.len()), |mut s, c| {
            match c {
                '\\' => s.push_str("\\\\"),
                '\n' => s.push_str("\\n"),
                '\r' => s.push_str("\\r"),
                '\u{2028}' => s.push_str("\\u2028"),
                '\u{2029}' => s.push_str("\\u2029"),
                '/' => s.push_str("\\/"),
                c => s.push(c),
            }
            s
        })
}

/// HTML map with a marker on the source
#[derive(Debug, Clone)]
pub struct MarkerMap {
    source: SourcePoint,
    zoom: u8,
    title: String,
    popup: Option<String>,
}
impl MarkerMap {
    pub fn new(source: SourcePoint) -> Self {
        Self {
            source,
            zoom: 15,
            title: String::from("Pollution source"),
            popup: None,
        }
    }
    pub fn zoom(self, zoom: u8) -> Self {
        Self { zoom, ..self }
    }
    pub fn title<S: Into<String>>(self, title: S) -> Self {
        Self {
            title: title.into(),
            ..self
        }
    }
    /// Marker popup text, the source coordinates if not set
    pub fn popup<S: Into<String>>(self, popup: S) -> Self {
        Self {
            popup: Some(popup.into()),
            ..self
        }
    }
    pub fn to_html(&self) -> String {
        let SourcePoint {
            latitude,
            longitude,
        } = self.source;
        let popup = escape_js(&escape(
            &self
                .popup
                .clone()
                .unwrap_or_else(|| self.source.to_string()),
        ));
        format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<link rel="stylesheet" href="{leaflet}/leaflet.css">
<script src="{leaflet}/leaflet.js"></script>
<style>html, body, #map {{ height: 100%; margin: 0; }}</style>
</head>
<body>
<div id="map"></div>
<script>
var map = L.map("map").setView([{latitude}, {longitude}], {zoom});
L.tileLayer("https://tile.openstreetmap.org/{{z}}/{{x}}/{{y}}.png", {{
    maxZoom: 19,
    attribution: "&copy; OpenStreetMap contributors"
}}).addTo(map);
L.marker([{latitude}, {longitude}]).addTo(map).bindPopup("{popup}");
</script>
</body>
</html>
"#,
            title = escape(&self.title),
            leaflet = LEAFLET,
            latitude = latitude,
            longitude = longitude,
            zoom = self.zoom,
            popup = popup,
        )
    }
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        File::create(path)
            .and_then(|mut file| file.write_all(self.to_html().as_bytes()))
            .map_err(|e| MapError::Io(path.to_path_buf(), e))?;
        log::info!("map written to {:?}", path);
        Ok(())
    }
}

//! On-disk layout formats, chosen by file extension.

use std::io::{BufReader, Read, Write};
use std::path::Path;

use gds21::ser::SerializationFormat;
use gds21::GdsLibrary;

use crate::error::Result;

/// File formats a [`GdsLibrary`] can be read from and written to.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum LayoutFormat {
    /// Binary GDSII stream.
    Gds,
    Json,
    Yaml,
    Toml,
}

impl LayoutFormat {
    /// Infers the format from `path`'s extension, case-insensitively.
    ///
    /// Anything not recognized as a text format is treated as a GDSII stream.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        match ext.as_deref() {
            Some("json") => Self::Json,
            Some("yaml") | Some("yml") => Self::Yaml,
            Some("toml") => Self::Toml,
            _ => Self::Gds,
        }
    }

    fn text(&self) -> Option<SerializationFormat> {
        match self {
            Self::Gds => None,
            Self::Json => Some(SerializationFormat::Json),
            Self::Yaml => Some(SerializationFormat::Yaml),
            Self::Toml => Some(SerializationFormat::Toml),
        }
    }

    /// Loads a library from `path` in this format.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<GdsLibrary> {
        let lib = match self.text() {
            None => GdsLibrary::open(path)?,
            Some(fmt) => fmt.open(path)?,
        };
        Ok(lib)
    }

    /// Reads a library from `src` in this format.
    pub fn read_from(&self, src: impl Read) -> Result<GdsLibrary> {
        let lib = match self.text() {
            None => GdsLibrary::read(src)?,
            Some(fmt) => {
                let mut s = String::new();
                BufReader::new(src).read_to_string(&mut s)?;
                fmt.from_str(&s)?
            }
        };
        Ok(lib)
    }

    /// Writes `lib` to `dest` in this format.
    pub fn write_to(&self, lib: &GdsLibrary, dest: impl Write) -> Result<()> {
        match self.text() {
            None => lib.write(dest)?,
            Some(fmt) => fmt.write(lib, dest)?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions() {
        assert_eq!(LayoutFormat::from_path("a/b.gds"), LayoutFormat::Gds);
        assert_eq!(LayoutFormat::from_path("b.GDS"), LayoutFormat::Gds);
        assert_eq!(LayoutFormat::from_path("b.gds2"), LayoutFormat::Gds);
        assert_eq!(LayoutFormat::from_path("noext"), LayoutFormat::Gds);
        assert_eq!(LayoutFormat::from_path("b.json"), LayoutFormat::Json);
        assert_eq!(LayoutFormat::from_path("b.YML"), LayoutFormat::Yaml);
        assert_eq!(LayoutFormat::from_path("b.yaml"), LayoutFormat::Yaml);
        assert_eq!(LayoutFormat::from_path("b.toml"), LayoutFormat::Toml);
    }

    #[test]
    fn text_round_trip() {
        let mut lib = GdsLibrary::new("text");
        lib.structs.push(gds21::GdsStruct::new("cell"));
        let mut buf = Vec::new();
        LayoutFormat::Json.write_to(&lib, &mut buf).unwrap();
        let back = LayoutFormat::Json.read_from(buf.as_slice()).unwrap();
        assert_eq!(back, lib);
    }
}

//! Reading source files with their encoding and writing them back atomically.
//!
//! Files with a BOM are decoded as UTF-8 or UTF-16 accordingly. Without a BOM
//! the bytes are UTF-8 when they are valid UTF-8 and Windows-1252 otherwise,
//! which is what legacy C# code bases are usually saved in.

use encoding_rs::WINDOWS_1252;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Utf8Bom,
    Utf16Le,
    Utf16Be,
    Windows1252,
}

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16LE_BOM: &[u8] = &[0xFF, 0xFE];
const UTF16BE_BOM: &[u8] = &[0xFE, 0xFF];

/// Decoded file contents plus the encoding to write them back with.
#[derive(Debug, Clone)]
pub struct SourceText {
    pub text: String,
    pub encoding: TextEncoding,
}

impl SourceText {
    pub fn decode(bytes: &[u8]) -> io::Result<Self> {
        let (encoding, text) = if let Some(rest) = bytes.strip_prefix(UTF8_BOM) {
            (TextEncoding::Utf8Bom, utf8(rest)?)
        } else if let Some(rest) = bytes.strip_prefix(UTF16LE_BOM) {
            (TextEncoding::Utf16Le, utf16(rest, u16::from_le_bytes)?)
        } else if let Some(rest) = bytes.strip_prefix(UTF16BE_BOM) {
            (TextEncoding::Utf16Be, utf16(rest, u16::from_be_bytes)?)
        } else {
            match std::str::from_utf8(bytes) {
                Ok(text) => (TextEncoding::Utf8, text.to_string()),
                Err(_) => {
                    let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
                    (TextEncoding::Windows1252, text.into_owned())
                }
            }
        };
        Ok(SourceText { text, encoding })
    }

    /// Encode `text` the same way the original file was encoded.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self.encoding {
            TextEncoding::Utf8 => text.as_bytes().to_vec(),
            TextEncoding::Utf8Bom => [UTF8_BOM, text.as_bytes()].concat(),
            TextEncoding::Utf16Le => {
                let mut out = UTF16LE_BOM.to_vec();
                out.extend(text.encode_utf16().flat_map(u16::to_le_bytes));
                out
            }
            TextEncoding::Utf16Be => {
                let mut out = UTF16BE_BOM.to_vec();
                out.extend(text.encode_utf16().flat_map(u16::to_be_bytes));
                out
            }
            TextEncoding::Windows1252 => WINDOWS_1252.encode(text).0.into_owned(),
        }
    }
}

fn utf8(bytes: &[u8]) -> io::Result<String> {
    String::from_utf8(bytes.to_vec()).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> io::Result<String> {
    if bytes.len() % 2 != 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "odd number of bytes in UTF-16 text",
        ));
    }
    let units = bytes.chunks_exact(2).map(|c| unit([c[0], c[1]]));
    char::decode_utf16(units)
        .collect::<Result<String, _>>()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

pub fn read_source(path: &Path) -> io::Result<SourceText> {
    SourceText::decode(&fs::read(path)?)
}

/// Replace `path` with `bytes` through a temporary file in the same
/// directory and a rename. Readers see either the old or the new contents;
/// the temporary file is removed if any step fails.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    if let Ok(meta) = fs::metadata(path) {
        fs::set_permissions(tmp.path(), meta.permissions())?;
    }
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_decode_detects_boms() {
        let plain = SourceText::decode(b"class A { }").unwrap();
        assert_eq!(plain.encoding, TextEncoding::Utf8);

        let bom = SourceText::decode(&[UTF8_BOM, &b"class A { }"[..]].concat()).unwrap();
        assert_eq!(bom.encoding, TextEncoding::Utf8Bom);
        assert_eq!(bom.text, "class A { }");

        let le: Vec<u8> = UTF16LE_BOM
            .iter()
            .copied()
            .chain("é".encode_utf16().flat_map(u16::to_le_bytes))
            .collect();
        let decoded = SourceText::decode(&le).unwrap();
        assert_eq!(decoded.encoding, TextEncoding::Utf16Le);
        assert_eq!(decoded.text, "é");
    }

    #[test]
    fn test_encode_restores_original_encoding() {
        for original in [
            [UTF8_BOM, "class Ä { }".as_bytes()].concat(),
            [UTF16BE_BOM.to_vec(), "class Ä { }".encode_utf16().flat_map(u16::to_be_bytes).collect()].concat(),
        ] {
            let src = SourceText::decode(&original).unwrap();
            assert_eq!(src.encode(&src.text), original);
        }
    }

    #[test]
    fn test_non_utf8_without_bom_falls_back_to_windows_1252() {
        let original = b"// caf\xE9\nclass Orders : ITable { }\n".to_vec();
        let src = SourceText::decode(&original).unwrap();
        assert_eq!(src.encoding, TextEncoding::Windows1252);
        assert!(src.text.starts_with("// café\n"));
        assert_eq!(src.encode(&src.text), original);
        let edited = src.text.replace(": ITable", ": TableBase, ITable");
        assert_eq!(
            src.encode(&edited),
            b"// caf\xE9\nclass Orders : TableBase, ITable { }\n".to_vec()
        );
    }

    #[test]
    fn test_truncated_utf16_is_invalid_data() {
        let err = SourceText::decode(&[0xFF, 0xFE, 0x63]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_write_atomic_replaces_and_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("Orders.cs");
        fs::write(&target, "old").unwrap();
        write_atomic(&target, b"new").unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "new");
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_write_atomic_missing_directory_fails_cleanly() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("missing").join("Orders.cs");
        assert!(write_atomic(&target, b"new").is_err());
        assert!(!target.exists());
    }
}

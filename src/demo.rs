//! Compressed demo handling.
//!
//! FACEIT delivers demos as zstd-compressed `.dem.zst` files. A download is
//! decompressed into a hidden temporary file inside the destination folder,
//! checked for a demo signature, and only then renamed to its final name.
//! The temporary file is owned by a [`tempfile::TempPath`], so it is removed
//! on every path that does not reach the rename, including unwinding.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use tempfile::TempPath;
use thiserror::Error;

use crate::platform::FileSystem;

/// Suffix of a downloaded, compressed demo.
pub const COMPRESSED_SUFFIX: &str = ".dem.zst";

/// Length of the signature at the start of a demo file.
pub const MAGIC_LEN: usize = 8;

/// Accepted demo signatures: Source 2 (CS2) and the legacy Source format.
pub const DEMO_MAGICS: [&[u8; MAGIC_LEN]; 2] = [b"PBDEMS2\0", b"HL2DEMO\0"];

const CHUNK_SIZE: usize = 64 * 1024;

/// Errors from decompressing and installing a demo.
#[derive(Debug, Error)]
pub enum DemoError {
    /// The file name does not end in [`COMPRESSED_SUFFIX`].
    #[error("File is not a compressed demo ({COMPRESSED_SUFFIX}): {}", path.display())]
    NotCompressedDemo {
        /// The rejected path.
        path: PathBuf,
    },

    /// The compressed file could not be opened.
    #[error("Failed to open {}", path.display())]
    Open {
        /// The compressed file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The compressed stream is corrupt or truncated.
    #[error("corrupt or truncated zstd stream")]
    Decode {
        /// Underlying decoder error.
        #[source]
        source: io::Error,
    },

    /// The decompressed data does not start with a demo signature.
    #[error("decompressed data is not a demo file (bad signature)")]
    BadSignature,

    /// The temporary output could not be created or written.
    #[error("Failed to write decompressed demo")]
    Write {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Returns `true` if `name` ends in [`COMPRESSED_SUFFIX`], ignoring ASCII case.
#[must_use]
pub fn has_compressed_suffix(name: &str) -> bool {
    name.len() > COMPRESSED_SUFFIX.len()
        && name
            .get(name.len() - COMPRESSED_SUFFIX.len()..)
            .is_some_and(|tail| tail.eq_ignore_ascii_case(COMPRESSED_SUFFIX))
}

/// Returns the installed file name for a compressed demo: its base name with
/// the trailing `.zst` removed.
///
/// # Errors
///
/// Returns [`DemoError::NotCompressedDemo`] if the base name is not a
/// non-empty name ending in [`COMPRESSED_SUFFIX`].
pub fn installed_name(source: &Path) -> Result<String, DemoError> {
    let not_demo = || DemoError::NotCompressedDemo {
        path: source.to_path_buf(),
    };

    let name = source
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(not_demo)?;

    if !has_compressed_suffix(name) {
        return Err(not_demo());
    }

    Ok(name[..name.len() - ".zst".len()].to_string())
}

/// Returns `true` if `header` is a known demo signature.
#[must_use]
pub fn is_demo_magic(header: &[u8]) -> bool {
    DEMO_MAGICS.iter().any(|magic| header == magic.as_slice())
}

/// A verified, decompressed demo waiting in a temporary file.
#[derive(Debug)]
pub struct DecompressedDemo {
    temp: TempPath,
    size: u64,
}

impl DecompressedDemo {
    /// Returns the decompressed size in bytes.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Returns the temporary file location.
    #[must_use]
    pub fn temp_path(&self) -> &Path {
        &self.temp
    }

    /// Moves the demo to `dest`. On failure the temporary file is deleted.
    ///
    /// # Errors
    ///
    /// Returns the rename error.
    pub fn install(self, fs: &dyn FileSystem, dest: &Path) -> io::Result<()> {
        fs.rename(&self.temp, dest)?;
        if let Err(e) = self.temp.keep() {
            tracing::debug!(error = %e, "Temporary demo path already released");
        }
        Ok(())
    }
}

/// Decompresses `source` into a temporary file inside `dir` and verifies the
/// demo signature.
///
/// # Errors
///
/// Returns [`DemoError::Open`] if `source` cannot be opened,
/// [`DemoError::Decode`] or [`DemoError::BadSignature`] if the content is not
/// a valid compressed demo, and [`DemoError::Write`] if the output cannot be
/// written. No file is left in `dir` on error.
pub fn decompress_into(source: &Path, dir: &Path) -> Result<DecompressedDemo, DemoError> {
    let input = File::open(source).map_err(|e| DemoError::Open {
        path: source.to_path_buf(),
        source: e,
    })?;
    let mut decoder =
        zstd::stream::read::Decoder::new(input).map_err(|e| DemoError::Decode { source: e })?;

    let mut temp = tempfile::Builder::new()
        .prefix(".demo-")
        .suffix(".part")
        .tempfile_in(dir)
        .map_err(|e| DemoError::Write { source: e })?;

    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut header = Vec::with_capacity(MAGIC_LEN);
    let mut size: u64 = 0;

    loop {
        let n = match decoder.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(DemoError::Decode { source: e }),
        };

        if header.len() < MAGIC_LEN {
            let take = (MAGIC_LEN - header.len()).min(n);
            header.extend_from_slice(&buf[..take]);
            if header.len() == MAGIC_LEN && !is_demo_magic(&header) {
                return Err(DemoError::BadSignature);
            }
        }

        temp.write_all(&buf[..n])
            .map_err(|e| DemoError::Write { source: e })?;
        size += n as u64;
    }

    if header.len() < MAGIC_LEN {
        return Err(DemoError::BadSignature);
    }

    temp.flush().map_err(|e| DemoError::Write { source: e })?;
    temp.as_file()
        .sync_all()
        .map_err(|e| DemoError::Write { source: e })?;

    tracing::debug!(
        temp = %temp.path().display(),
        bytes = size,
        "Decompressed demo"
    );

    Ok(DecompressedDemo {
        temp: temp.into_temp_path(),
        size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::OsFileSystem;
    use tempfile::tempdir;

    fn demo_bytes() -> Vec<u8> {
        let mut data = b"PBDEMS2\0".to_vec();
        data.extend((0..50_000u32).map(|i| (i.wrapping_mul(2_654_435_761) >> 13) as u8));
        data
    }

    fn write_compressed(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, zstd::encode_all(data, 3).unwrap()).unwrap();
        path
    }

    fn entries(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect()
    }

    #[test]
    fn suffix_check_ignores_case() {
        assert!(has_compressed_suffix("nuke.dem.zst"));
        assert!(has_compressed_suffix("NUKE.DEM.ZST"));
        assert!(!has_compressed_suffix("nuke.dem"));
        assert!(!has_compressed_suffix("nuke.zst"));
        assert!(!has_compressed_suffix(".dem.zst"));
    }

    #[test]
    fn installed_name_strips_zst() {
        let name = installed_name(Path::new("/downloads/nuke_08feb2026.dem.zst")).unwrap();
        assert_eq!(name, "nuke_08feb2026.dem");
    }

    #[test]
    fn installed_name_rejects_other_files() {
        assert!(matches!(
            installed_name(Path::new("/downloads/archive.tar.zst")),
            Err(DemoError::NotCompressedDemo { .. })
        ));
        assert!(installed_name(Path::new("/")).is_err());
    }

    #[test]
    fn magic_detection() {
        assert!(is_demo_magic(b"PBDEMS2\0"));
        assert!(is_demo_magic(b"HL2DEMO\0"));
        assert!(!is_demo_magic(b"PBDEMS2"));
        assert!(!is_demo_magic(b"GARBAGE!"));
    }

    #[test]
    fn decompress_and_install() {
        let downloads = tempdir().unwrap();
        let csgo = tempdir().unwrap();
        let data = demo_bytes();
        let source = write_compressed(downloads.path(), "a.dem.zst", &data);

        let demo = decompress_into(&source, csgo.path()).unwrap();
        assert_eq!(demo.size(), data.len() as u64);
        assert!(demo.temp_path().starts_with(csgo.path()));

        let dest = csgo.path().join("a.dem");
        demo.install(&OsFileSystem, &dest).unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), data);
        assert_eq!(entries(csgo.path()), vec![dest]);
    }

    #[test]
    fn dropped_demo_removes_temp_file() {
        let downloads = tempdir().unwrap();
        let csgo = tempdir().unwrap();
        let source = write_compressed(downloads.path(), "a.dem.zst", &demo_bytes());

        let demo = decompress_into(&source, csgo.path()).unwrap();
        drop(demo);

        assert!(entries(csgo.path()).is_empty());
    }

    #[test]
    fn garbage_input_is_decode_error() {
        let downloads = tempdir().unwrap();
        let csgo = tempdir().unwrap();
        let source = downloads.path().join("bad.dem.zst");
        std::fs::write(&source, b"this is not zstd at all").unwrap();

        let err = decompress_into(&source, csgo.path()).unwrap_err();
        assert!(matches!(err, DemoError::Decode { .. }));
        assert!(entries(csgo.path()).is_empty());
    }

    #[test]
    fn truncated_input_is_decode_error() {
        let downloads = tempdir().unwrap();
        let csgo = tempdir().unwrap();
        let compressed = zstd::encode_all(demo_bytes().as_slice(), 3).unwrap();
        let source = downloads.path().join("cut.dem.zst");
        std::fs::write(&source, &compressed[..compressed.len() / 2]).unwrap();

        let err = decompress_into(&source, csgo.path()).unwrap_err();
        assert!(matches!(err, DemoError::Decode { .. }));
        assert!(entries(csgo.path()).is_empty());
    }

    #[test]
    fn wrong_signature_is_rejected() {
        let downloads = tempdir().unwrap();
        let csgo = tempdir().unwrap();
        let source = write_compressed(downloads.path(), "x.dem.zst", b"just some text file");

        let err = decompress_into(&source, csgo.path()).unwrap_err();
        assert!(matches!(err, DemoError::BadSignature));
        assert!(entries(csgo.path()).is_empty());
    }

    #[test]
    fn empty_output_is_rejected() {
        let downloads = tempdir().unwrap();
        let csgo = tempdir().unwrap();
        let source = write_compressed(downloads.path(), "empty.dem.zst", b"");

        let err = decompress_into(&source, csgo.path()).unwrap_err();
        assert!(matches!(err, DemoError::BadSignature));
        assert!(entries(csgo.path()).is_empty());
    }

    #[test]
    fn missing_source_is_open_error() {
        let csgo = tempdir().unwrap();
        let err = decompress_into(&csgo.path().join("missing.dem.zst"), csgo.path()).unwrap_err();
        assert!(matches!(err, DemoError::Open { .. }));
    }
}

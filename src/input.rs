//! Input resolver: turns the command line's inputs (stdin, a single file,
//! or a set of glob patterns) into one [`ServableFile`].

use std::io;
use std::path::PathBuf;
use std::time::SystemTime;

use bytes::Bytes;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, warn};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{Error, Result};
use crate::file::{FileContent, ServableFile};
use crate::stat_stream::{StatStream, StreamStats};

/// Naming overrides from the command line.
#[derive(Debug, Clone, Default)]
pub struct InputOptions {
    /// Override the served filename.
    pub filename: Option<String>,
    /// Override the served filename's extension.
    pub extension: Option<String>,
    /// Treat a single argument as a glob pattern and build an archive.
    pub glob: bool,
}

/// Resolve the positional arguments into a servable file.
///
/// No arguments reads stdin; one argument serves that file directly; more
/// than one (or `glob`) archives every match into a zip. In every case the
/// descriptor's size is final before this function returns.
pub async fn resolve(files: &[String], options: &InputOptions) -> Result<ServableFile> {
    match files {
        [] => from_stdin(options).await,
        [file] if !options.glob => from_file(file, options).await,
        patterns => from_archive(patterns, options).await,
    }
}

async fn from_stdin(options: &InputOptions) -> Result<ServableFile> {
    let name = append_extension(
        options.filename.clone().unwrap_or_else(|| "stdin.txt".into()),
        options.extension.as_deref(),
        ".txt",
    );

    debug!(%name, "serving data read from stdin");

    let (bytes, stats) = buffer_tracked(tokio::io::stdin()).await?;
    stats.finalized().await;

    Ok(ServableFile::new(
        name,
        stats.size(),
        SystemTime::now(),
        FileContent::Memory(bytes),
    ))
}

async fn from_file(path: &str, options: &InputOptions) -> Result<ServableFile> {
    debug!(path, "serving a single file");

    let file = File::open(path).await?;
    let metadata = file.metadata().await?;
    let modified = metadata.modified().unwrap_or_else(|_| SystemTime::now());

    let display_name = apply_extension(
        options.filename.clone().unwrap_or_else(|| path.to_owned()),
        options.extension.as_deref(),
    );

    Ok(ServableFile::new(
        display_name,
        metadata.len(),
        modified,
        FileContent::Disk(file),
    ))
}

async fn from_archive(patterns: &[String], options: &InputOptions) -> Result<ServableFile> {
    if options.extension.is_some() {
        warn!("setting extension on a zip of the passed files");
    }

    let name = append_extension(
        options
            .filename
            .clone()
            .unwrap_or_else(|| "archive.zip".into()),
        options.extension.as_deref(),
        ".zip",
    );

    debug!(%name, "serving an archive of multiple files");

    let entries = expand(patterns)?;
    let archive = build_zip(entries).await?;

    let (bytes, stats) = buffer_tracked(io::Cursor::new(archive)).await?;
    stats.finalized().await;

    Ok(ServableFile::new(
        name,
        stats.size(),
        SystemTime::now(),
        FileContent::Memory(bytes),
    ))
}

/// Drain a source through a [`StatStream`] into memory, so that the size
/// is finalized before the descriptor is constructed.
async fn buffer_tracked<R: AsyncRead + Unpin>(source: R) -> Result<(Bytes, StreamStats)> {
    let stats = StreamStats::new();
    let mut stream = StatStream::new(source, stats.clone());

    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await?;

    Ok((Bytes::from(buf), stats))
}

fn expand(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for pattern in patterns {
        for entry in glob::glob(pattern)? {
            paths.push(entry.map_err(|err| Error::Io(err.into_error()))?);
        }
    }

    Ok(paths)
}

async fn build_zip(paths: Vec<PathBuf>) -> Result<Vec<u8>> {
    let cwd = std::env::current_dir()?;

    tokio::task::spawn_blocking(move || {
        let mut zip = ZipWriter::new(io::Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        for path in paths {
            let metadata = std::fs::metadata(&path)?;
            let name = path
                .strip_prefix(&cwd)
                .unwrap_or(&path)
                .to_string_lossy()
                .into_owned();

            if metadata.is_file() {
                debug!(%name, "adding file to archive");

                zip.start_file(&name, options)?;
                let mut file = std::fs::File::open(&path)?;
                io::copy(&mut file, &mut zip)?;
            } else if metadata.is_dir() {
                debug!(%name, "adding directory to archive");

                zip.add_directory(&name, options)?;
            }
        }

        Ok(zip.finish()?.into_inner())
    })
    .await
    .map_err(|err| Error::Io(io::Error::new(io::ErrorKind::Other, err)))?
}

// Single-file naming: the last extension is swapped for the override, so
// `report.html` with `-e txt` serves as `report.txt`.
fn apply_extension(name: String, extension: Option<&str>) -> String {
    match extension {
        None => name,
        Some(ext) => {
            let mut path = PathBuf::from(name);
            path.set_extension(ext);
            path.to_string_lossy().into_owned()
        }
    }
}

// Stdin/archive naming: only the default suffix is stripped before the
// override is appended. A custom `backup.tar.gz` with `-e zip` becomes
// `backup.tar.gz.zip`, not `backup.tar.zip`.
fn append_extension(name: String, extension: Option<&str>, default_suffix: &str) -> String {
    match extension {
        None => name,
        Some(ext) => {
            let stem = name.strip_suffix(default_suffix).unwrap_or(&name);
            format!("{stem}.{ext}")
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::Path;

    use super::*;

    fn write_file(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents).unwrap();
        path
    }

    #[test]
    fn extension_override_replaces_last_extension() {
        assert_eq!(apply_extension("report.html".into(), Some("txt")), "report.txt");
        assert_eq!(apply_extension("noext".into(), Some("txt")), "noext.txt");
        assert_eq!(apply_extension("report.html".into(), None), "report.html");
    }

    #[test]
    fn extension_override_strips_only_the_default_suffix() {
        assert_eq!(
            append_extension("stdin.txt".into(), Some("json"), ".txt"),
            "stdin.json"
        );
        assert_eq!(
            append_extension("archive.zip".into(), Some("cbz"), ".zip"),
            "archive.cbz"
        );
        // custom names keep all of their dots
        assert_eq!(
            append_extension("backup.tar.gz".into(), Some("zip"), ".zip"),
            "backup.tar.gz.zip"
        );
        assert_eq!(
            append_extension("stdin.txt".into(), None, ".txt"),
            "stdin.txt"
        );
    }

    #[tokio::test]
    async fn single_file_uses_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "data.bin", b"0123456789");

        let file = resolve(
            &[path.to_string_lossy().into_owned()],
            &InputOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(file.size(), 10);
        assert_eq!(file.basename(), "data.bin");
    }

    #[tokio::test]
    async fn single_file_filename_and_extension_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "data.bin", b"42");

        let options = InputOptions {
            filename: Some("renamed.bin".into()),
            extension: Some("dat".into()),
            glob: false,
        };
        let file = resolve(&[path.to_string_lossy().into_owned()], &options)
            .await
            .unwrap();

        assert_eq!(file.basename(), "renamed.dat");
        assert_eq!(file.size(), 2);
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let err = resolve(
            &["definitely-missing-973.bin".into()],
            &InputOptions::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Io(_)));
    }

    #[tokio::test]
    async fn multiple_files_become_an_archive() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_file(dir.path(), "a.txt", b"first");
        let b = write_file(dir.path(), "b.txt", b"second");

        let file = resolve(
            &[
                a.to_string_lossy().into_owned(),
                b.to_string_lossy().into_owned(),
            ],
            &InputOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(file.basename(), "archive.zip");
        assert!(file.size() > 0);

        // the served bytes are a readable zip holding both files
        let FileContent::Memory(bytes) = file.into_content() else {
            panic!("archive should be buffered in memory");
        };
        let mut archive = zip::ZipArchive::new(io::Cursor::new(bytes.to_vec())).unwrap();
        assert_eq!(archive.len(), 2);

        let names: Vec<String> = archive.file_names().map(str::to_owned).collect();
        assert!(names.iter().any(|name| name.ends_with("a.txt")));
        assert!(names.iter().any(|name| name.ends_with("b.txt")));

        let mut contents = String::new();
        {
            use std::io::Read;

            let index = names
                .iter()
                .position(|name| name.ends_with("a.txt"))
                .unwrap();
            archive
                .by_index(index)
                .unwrap()
                .read_to_string(&mut contents)
                .unwrap();
        }
        assert_eq!(contents, "first");
    }

    #[tokio::test]
    async fn glob_pattern_archives_matches() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "one.log", b"one");
        write_file(dir.path(), "two.log", b"two");
        write_file(dir.path(), "skip.txt", b"skip");

        let pattern = dir.path().join("*.log").to_string_lossy().into_owned();
        let options = InputOptions {
            glob: true,
            ..Default::default()
        };
        let file = resolve(&[pattern], &options).await.unwrap();

        let FileContent::Memory(bytes) = file.into_content() else {
            panic!("archive should be buffered in memory");
        };
        let archive = zip::ZipArchive::new(io::Cursor::new(bytes.to_vec())).unwrap();
        assert_eq!(archive.len(), 2);
    }

    #[tokio::test]
    async fn buffered_sources_report_final_size() {
        let (bytes, stats) = buffer_tracked(io::Cursor::new(vec![1u8; 9000]))
            .await
            .unwrap();

        assert_eq!(bytes.len(), 9000);
        assert!(stats.is_finalized());
        assert_eq!(stats.size(), 9000);
        assert_eq!(stats.blocks(), 24);
    }
}

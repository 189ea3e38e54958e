//! Incremental reader for one followed stream file.

use std::fs::{self, File, Metadata};
use std::io::{self, BufRead, BufReader, Seek, SeekFrom, Write};
use std::sync::{Mutex, PoisonError};

use camino::{Utf8Path, Utf8PathBuf};
use pmgo_config::StreamKind;
use tracing::{debug, info};

use super::{LogError, write_line};

/// Identifies the file behind a path so a replacement can be detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileIdentity {
    device: u64,
    inode: u64,
}

impl FileIdentity {
    #[cfg(unix)]
    fn of(metadata: &Metadata) -> Option<Self> {
        use std::os::unix::fs::MetadataExt;
        Some(Self {
            device: metadata.dev(),
            inode: metadata.ino(),
        })
    }

    #[cfg(not(unix))]
    fn of(_metadata: &Metadata) -> Option<Self> {
        None
    }
}

struct OpenFile {
    reader: BufReader<File>,
    identity: Option<FileIdentity>,
    position: u64,
}

/// Tails one stream file from its first byte.
///
/// Each [`StreamTail::poll`] emits every complete line appended since the
/// previous poll. A trailing line without a newline is held back until the
/// newline arrives. When caught up, the tail checks whether the path now
/// names a different file, vanished, or shrank, and starts over from the top
/// of whatever file is there.
pub(super) struct StreamTail {
    stream: StreamKind,
    path: Utf8PathBuf,
    file: Option<OpenFile>,
    pending: Vec<u8>,
}

impl StreamTail {
    pub(super) fn new(stream: StreamKind, path: Utf8PathBuf) -> Self {
        Self {
            stream,
            path,
            file: None,
            pending: Vec::new(),
        }
    }

    pub(super) const fn stream(&self) -> StreamKind {
        self.stream
    }

    /// Emits newly completed lines and returns how many were written.
    ///
    /// A missing file is not an error; the tail keeps waiting for it.
    pub(super) fn poll<W: Write>(&mut self, sink: &Mutex<W>) -> Result<usize, LogError> {
        if self.file.is_none() {
            self.file = open(&self.path)?;
            if self.file.is_some() {
                debug!(stream = %self.stream, path = %self.path, "following log file");
            }
        }
        let Some(file) = self.file.as_mut() else {
            return Ok(0);
        };

        let emitted = drain(&self.path, file, &mut self.pending, sink)?;
        if emitted == 0 {
            self.check_replacement()?;
        }
        Ok(emitted)
    }

    fn check_replacement(&mut self) -> Result<(), LogError> {
        let Some(file) = self.file.as_mut() else {
            return Ok(());
        };
        let metadata = match fs::metadata(&self.path) {
            Ok(metadata) => metadata,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                info!(stream = %self.stream, path = %self.path, "log file removed, waiting for it to return");
                self.file = None;
                self.pending.clear();
                return Ok(());
            }
            Err(source) => {
                return Err(LogError::Metadata {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let identity = FileIdentity::of(&metadata);
        if identity.is_some() && file.identity.is_some() && identity != file.identity {
            info!(stream = %self.stream, path = %self.path, "log file replaced, reopening");
            self.pending.clear();
            self.file = open(&self.path)?;
            return Ok(());
        }

        if metadata.len() < file.position {
            info!(stream = %self.stream, path = %self.path, "log file truncated, reading from the start");
            file.reader
                .seek(SeekFrom::Start(0))
                .map_err(|source| LogError::Read {
                    path: self.path.clone(),
                    source,
                })?;
            file.position = 0;
            self.pending.clear();
        }
        Ok(())
    }
}

fn open(path: &Utf8Path) -> Result<Option<OpenFile>, LogError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(LogError::Open {
                path: path.to_owned(),
                source,
            });
        }
    };
    let metadata = file.metadata().map_err(|source| LogError::Metadata {
        path: path.to_owned(),
        source,
    })?;
    Ok(Some(OpenFile {
        reader: BufReader::new(file),
        identity: FileIdentity::of(&metadata),
        position: 0,
    }))
}

fn drain<W: Write>(
    path: &Utf8Path,
    file: &mut OpenFile,
    pending: &mut Vec<u8>,
    sink: &Mutex<W>,
) -> Result<usize, LogError> {
    let mut emitted = 0;
    loop {
        let read = file
            .reader
            .read_until(b'\n', pending)
            .map_err(|source| LogError::Read {
                path: path.to_owned(),
                source,
            })?;
        if read == 0 {
            return Ok(emitted);
        }
        file.position += read as u64;
        if pending.ends_with(b"\n") {
            let mut guard = sink.lock().unwrap_or_else(PoisonError::into_inner);
            write_line(&mut *guard, pending).map_err(LogError::Write)?;
            drop(guard);
            pending.clear();
            emitted += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;

    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        path: Utf8PathBuf,
        tail: StreamTail,
        sink: Mutex<Vec<u8>>,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().expect("tempdir");
            let path = Utf8PathBuf::from_path_buf(dir.path().join("web.out")).expect("utf8 path");
            let tail = StreamTail::new(StreamKind::Stdout, path.clone());
            Self {
                _dir: dir,
                path,
                tail,
                sink: Mutex::new(Vec::new()),
            }
        }

        fn append(&self, text: &str) {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .expect("open for append");
            file.write_all(text.as_bytes()).expect("append");
        }

        fn poll(&mut self) -> usize {
            self.tail.poll(&self.sink).expect("poll")
        }

        fn output(&self) -> String {
            let bytes = self.sink.lock().expect("sink lock").clone();
            String::from_utf8(bytes).expect("utf8 output")
        }
    }

    #[test]
    fn missing_file_is_awaited() {
        let mut fixture = Fixture::new();
        assert_eq!(fixture.poll(), 0);
        fixture.append("first\n");
        assert_eq!(fixture.poll(), 1);
        assert_eq!(fixture.output(), "first\n");
    }

    #[test]
    fn existing_content_is_emitted_from_the_start() {
        let mut fixture = Fixture::new();
        fixture.append("one\ntwo\n");
        assert_eq!(fixture.poll(), 2);
        fixture.append("three\n");
        assert_eq!(fixture.poll(), 1);
        assert_eq!(fixture.poll(), 0);
        assert_eq!(fixture.output(), "one\ntwo\nthree\n");
    }

    #[test]
    fn partial_line_waits_for_newline() {
        let mut fixture = Fixture::new();
        fixture.append("hal");
        assert_eq!(fixture.poll(), 0);
        assert_eq!(fixture.output(), "");
        fixture.append("f done\n");
        assert_eq!(fixture.poll(), 1);
        assert_eq!(fixture.output(), "half done\n");
    }

    #[test]
    fn truncated_file_is_reread_from_the_top() {
        let mut fixture = Fixture::new();
        fixture.append("a long first line\n");
        assert_eq!(fixture.poll(), 1);
        fs::write(&fixture.path, "new\n").expect("truncate and rewrite");
        // The shorter file is noticed once the old position is past its end.
        fixture.poll();
        fixture.poll();
        assert_eq!(fixture.output(), "a long first line\nnew\n");
    }

    #[cfg(unix)]
    #[test]
    fn replaced_file_is_reopened() {
        let mut fixture = Fixture::new();
        fixture.append("old\n");
        assert_eq!(fixture.poll(), 1);

        let rotated = fixture.path.with_extension("out.1");
        fs::rename(&fixture.path, &rotated).expect("rotate");
        fixture.append("fresh\n");

        assert_eq!(fixture.poll(), 0);
        assert_eq!(fixture.poll(), 1);
        assert_eq!(fixture.output(), "old\nfresh\n");
    }

    #[test]
    fn removed_file_is_awaited_again() {
        let mut fixture = Fixture::new();
        fixture.append("before\n");
        assert_eq!(fixture.poll(), 1);
        fs::remove_file(&fixture.path).expect("remove");
        assert_eq!(fixture.poll(), 0);
        fixture.append("after\n");
        assert_eq!(fixture.poll(), 1);
        assert_eq!(fixture.output(), "before\nafter\n");
    }
}

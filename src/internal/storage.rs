use crate::internal::error::{Error, Result};
use crate::internal::streamname;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use uuid::Uuid;

// ========================================================================= //

/// A read cursor over the contents of a stream.
///
/// The bytes are shared between all handles to the same stream, but each
/// handle has its own position, so cloning a handle gives an independent
/// cursor.
#[derive(Clone, Debug)]
pub struct StreamHandle {
    name: Option<String>,
    data: Rc<[u8]>,
    position: u64,
}

impl StreamHandle {
    /// Creates an anonymous stream holding the given bytes.
    pub fn from_bytes(data: Vec<u8>) -> StreamHandle {
        StreamHandle { name: None, data: Rc::from(data), position: 0 }
    }

    /// Reads the whole file at `path` into a new anonymous stream.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<StreamHandle> {
        Ok(StreamHandle::from_bytes(fs::read(path)?))
    }

    pub(crate) fn named(name: String, data: Rc<[u8]>) -> StreamHandle {
        StreamHandle { name: Some(name), data, position: 0 }
    }

    /// Returns the decoded name of the stream this handle was opened from,
    /// if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the total length of the stream, in bytes.
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    /// Returns true if the stream holds no data.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the current read position.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Returns the full contents of the stream, regardless of position.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns true if both handles share the same underlying bytes.
    pub fn shares_data_with(&self, other: &StreamHandle) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }

    /// Returns a new handle over the same bytes, positioned at the start.
    pub fn duplicate(&self) -> StreamHandle {
        StreamHandle {
            name: self.name.clone(),
            data: self.data.clone(),
            position: 0,
        }
    }
}

impl Read for StreamHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let start = self.position.min(self.len()) as usize;
        let remaining = &self.data[start..];
        let count = remaining.len().min(buf.len());
        buf[..count].copy_from_slice(&remaining[..count]);
        self.position += count as u64;
        Ok(count)
    }
}

impl Seek for StreamHandle {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::End(delta) => self.len() as i64 + delta,
            SeekFrom::Current(delta) => self.position as i64 + delta,
        };
        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Cannot seek to before the start of a stream",
            ));
        }
        self.position = target as u64;
        Ok(self.position)
    }
}

// ========================================================================= //

#[derive(Clone)]
enum ImageNode {
    Storage(Uuid),
    Stream(Rc<[u8]>),
}

/// An in-memory copy of a sub-storage and everything beneath it.
#[derive(Clone)]
pub(crate) struct StorageImage {
    clsid: Uuid,
    entries: Vec<(PathBuf, ImageNode)>,
}

impl StorageImage {
    fn read_from<F: Read + Seek>(
        comp: &mut cfb::CompoundFile<F>,
        root: &Path,
    ) -> Result<StorageImage> {
        let clsid = *comp.entry(root)?.clsid();
        let mut children: Vec<(PathBuf, bool, Uuid)> = comp
            .walk_storage(root)?
            .filter(|entry| entry.path() != root)
            .map(|entry| {
                (entry.path().to_path_buf(), entry.is_stream(), *entry.clsid())
            })
            .collect();
        children.sort_by_key(|child| child.0.components().count());
        let mut entries = Vec::with_capacity(children.len());
        for (path, is_stream, child_clsid) in children.into_iter() {
            let relative = match path.strip_prefix(root) {
                Ok(relative) => relative.to_path_buf(),
                Err(_) => continue,
            };
            if is_stream {
                let mut data = Vec::new();
                comp.open_stream(&path)?.read_to_end(&mut data)?;
                entries.push((relative, ImageNode::Stream(Rc::from(data))));
            } else {
                entries.push((relative, ImageNode::Storage(child_clsid)));
            }
        }
        Ok(StorageImage { clsid, entries })
    }

    fn write_to<F: Read + Write + Seek>(
        &self,
        comp: &mut cfb::CompoundFile<F>,
        root: &Path,
    ) -> Result<()> {
        comp.create_storage(root)?;
        comp.set_storage_clsid(root, self.clsid)?;
        for (relative, node) in self.entries.iter() {
            let path = root.join(relative);
            match node {
                ImageNode::Storage(clsid) => {
                    comp.create_storage(&path)?;
                    comp.set_storage_clsid(&path, *clsid)?;
                }
                ImageNode::Stream(data) => {
                    comp.create_stream(&path)?.write_all(data)?;
                }
            }
        }
        Ok(())
    }

    pub(crate) fn num_entries(&self) -> usize {
        self.entries.len()
    }
}

// ========================================================================= //

fn root_path(name: &str) -> PathBuf {
    Path::new("/").join(name)
}

fn read_whole_stream<F: Read + Seek>(
    comp: &mut cfb::CompoundFile<F>,
    name: &str,
) -> Result<Rc<[u8]>> {
    let mut data = Vec::new();
    comp.open_stream(root_path(name))?.read_to_end(&mut data)?;
    Ok(Rc::from(data))
}

fn has_stream<F>(comp: &cfb::CompoundFile<F>, name: &str) -> bool {
    comp.is_stream(root_path(name))
}

// ========================================================================= //

/// The structured-storage side of a database: the input compound file, the
/// streams and sub-storages that will be written at commit, and the chain of
/// applied transforms.
///
/// Streams are keyed by their raw (encoded) directory names.  Streams that
/// belong to temporary rows are marked transient and never reach the file.
pub(crate) struct Storage {
    input: Option<cfb::CompoundFile<fs::File>>,
    streams: BTreeMap<String, StreamHandle>,
    transient: BTreeSet<String>,
    storages: BTreeMap<String, Option<StorageImage>>,
    transforms: Vec<cfb::CompoundFile<fs::File>>,
    read_only: bool,
}

impl Storage {
    pub(crate) fn new(
        input: Option<cfb::CompoundFile<fs::File>>,
        read_only: bool,
    ) -> Storage {
        Storage {
            input,
            streams: BTreeMap::new(),
            transient: BTreeSet::new(),
            storages: BTreeMap::new(),
            transforms: Vec::new(),
            read_only,
        }
    }

    /// Records every top-level entry of the input file.  Sub-storages are
    /// noted for lazy loading, plain streams are read into the stream cache,
    /// and table streams are left for the table loader.  Returns the decoded
    /// names of the table streams found.
    pub(crate) fn cache_structure(&mut self) -> Result<Vec<String>> {
        let comp = match self.input.as_mut() {
            Some(comp) => comp,
            None => return Ok(Vec::new()),
        };
        let children: Vec<(String, bool)> = comp
            .read_root_storage()
            .map(|entry| (entry.name().to_string(), entry.is_stream()))
            .collect();
        let mut table_names = Vec::new();
        for (name, is_stream) in children.into_iter() {
            if !is_stream {
                tracing::trace!("found storage {:?}", name);
                self.storages.entry(name).or_insert(None);
            } else if streamname::is_table_stream(&name) {
                let (decoded, _) = streamname::decode(&name);
                if decoded != streamname::STRING_POOL
                    && decoded != streamname::STRING_DATA
                {
                    table_names.push(decoded);
                }
            } else {
                let data = read_whole_stream(comp, &name)?;
                let (decoded, _) = streamname::decode(&name);
                tracing::trace!("cached stream {:?}", decoded);
                self.streams
                    .insert(name, StreamHandle::named(decoded, data));
            }
        }
        Ok(table_names)
    }

    // ===================================================================== //

    /// Opens the named sub-storage from the input file, or returns the
    /// already-open copy.
    pub(crate) fn open_storage(&mut self, name: &str) -> Result<&StorageImage> {
        let loaded = matches!(self.storages.get(name), Some(Some(_)));
        if !loaded {
            let path = root_path(name);
            let image = match self.input.as_mut() {
                Some(comp) if comp.is_storage(&path) => {
                    StorageImage::read_from(comp, &path)?
                }
                _ => not_found!("No storage named {:?}", name),
            };
            tracing::trace!(
                "opened storage {:?} ({} entries)",
                name,
                image.num_entries()
            );
            self.storages.insert(name.to_string(), Some(image));
        }
        match self.storages.get(name) {
            Some(Some(image)) => Ok(image),
            _ => not_found!("No storage named {:?}", name),
        }
    }

    /// Creates (or replaces) a sub-storage from a byte stream holding a
    /// complete compound file image.
    pub(crate) fn create_storage(
        &mut self,
        name: &str,
        source: &StreamHandle,
    ) -> Result<()> {
        if self.read_only {
            access_denied!("Cannot create storage {:?} in a read-only database",
                           name);
        }
        let mut comp = cfb::CompoundFile::open(Cursor::new(source.data()))
            .map_err(|error| {
                Error::FunctionFailed(format!(
                    "Stream for storage {:?} is not a compound file: {}",
                    name, error
                ))
            })?;
        let image = StorageImage::read_from(&mut comp, Path::new("/"))?;
        self.storages.insert(name.to_string(), Some(image));
        Ok(())
    }

    /// Forgets the named sub-storage so that it is not written at commit.
    pub(crate) fn destroy_storage(&mut self, name: &str) {
        if self.storages.remove(name).is_some() {
            tracing::trace!("destroyed storage {:?}", name);
        }
    }

    pub(crate) fn storage_names(&self) -> Vec<String> {
        self.storages.keys().cloned().collect()
    }

    // ===================================================================== //

    /// Looks up a stream by its raw name: first among already-open streams,
    /// then in the input file, then in each transform (most recent first).
    /// Successful lookups are cached.
    pub(crate) fn get_raw_stream(&mut self, name: &str) -> Result<StreamHandle> {
        if let Some(handle) = self.streams.get(name) {
            return Ok(handle.duplicate());
        }
        let (decoded, _) = streamname::decode(name);
        let mut found = None;
        if let Some(comp) = self.input.as_mut() {
            if has_stream(comp, name) {
                found = Some(read_whole_stream(comp, name)?);
            }
        }
        if found.is_none() {
            for comp in self.transforms.iter_mut() {
                if has_stream(comp, name) {
                    tracing::trace!("stream {:?} found in transform", decoded);
                    found = Some(read_whole_stream(comp, name)?);
                    break;
                }
            }
        }
        match found {
            Some(data) => {
                let handle = StreamHandle::named(decoded, data);
                self.streams.insert(name.to_string(), handle.duplicate());
                Ok(handle)
            }
            None => not_found!("No stream named {:?}", decoded),
        }
    }

    /// Reads a table stream from the input file or the transforms without
    /// caching it.  Returns `None` if no such stream exists.
    pub(crate) fn read_table_stream(
        &mut self,
        name: &str,
    ) -> Result<Option<Rc<[u8]>>> {
        if let Some(comp) = self.input.as_mut() {
            if has_stream(comp, name) {
                return Ok(Some(read_whole_stream(comp, name)?));
            }
        }
        for comp in self.transforms.iter_mut() {
            if has_stream(comp, name) {
                return Ok(Some(read_whole_stream(comp, name)?));
            }
        }
        Ok(None)
    }

    /// Replaces or creates the stream with the given raw name.
    pub(crate) fn write_raw_stream_data(
        &mut self,
        name: &str,
        data: Vec<u8>,
    ) -> Result<StreamHandle> {
        if self.read_only {
            access_denied!("Cannot write stream {:?} in a read-only database",
                           streamname::decode(name).0);
        }
        self.transient.remove(name);
        Ok(self.insert_stream(name, data))
    }

    /// Like `write_raw_stream_data`, but the stream lives in memory only and
    /// is skipped at commit.  Allowed on read-only databases.
    pub(crate) fn write_transient_stream(
        &mut self,
        name: &str,
        data: Vec<u8>,
    ) -> StreamHandle {
        self.transient.insert(name.to_string());
        self.insert_stream(name, data)
    }

    fn insert_stream(&mut self, name: &str, data: Vec<u8>) -> StreamHandle {
        let (decoded, _) = streamname::decode(name);
        let handle = StreamHandle::named(decoded, Rc::from(data));
        self.streams.insert(name.to_string(), handle.duplicate());
        handle
    }

    pub(crate) fn is_transient_stream(&self, name: &str) -> bool {
        self.transient.contains(name)
    }

    /// Returns a fresh cursor, rewound to the start, over an open stream.
    pub(crate) fn clone_open_stream(&self, name: &str) -> Result<StreamHandle> {
        match self.streams.get(name) {
            Some(handle) => Ok(handle.duplicate()),
            None => not_found!("Stream {:?} is not open",
                               streamname::decode(name).0),
        }
    }

    pub(crate) fn destroy_stream(&mut self, name: &str) -> bool {
        self.transient.remove(name);
        self.streams.remove(name).is_some()
    }

    /// Moves a stream to a new raw name, loading it first if it has not been
    /// opened yet.  Returns false if there is no stream to move.
    pub(crate) fn rename_stream(&mut self, from: &str, to: &str)
                                -> Result<bool> {
        if from == to {
            return Ok(self.get_raw_stream(from).is_ok());
        }
        let handle = match self.get_raw_stream(from) {
            Ok(handle) => handle,
            Err(_) => return Ok(false),
        };
        let data = handle.data().to_vec();
        let transient = self.is_transient_stream(from);
        self.destroy_stream(from);
        if transient {
            self.write_transient_stream(to, data);
        } else {
            self.write_raw_stream_data(to, data)?;
        }
        tracing::trace!("renamed stream {:?} to {:?}",
                        streamname::decode(from).0,
                        streamname::decode(to).0);
        Ok(true)
    }

    /// Returns the open streams as (raw name, handle) pairs, in name order.
    pub(crate) fn streams(&self) -> impl Iterator<Item = (&str, &StreamHandle)> {
        self.streams.iter().map(|(name, handle)| (name.as_str(), handle))
    }

    // ===================================================================== //

    pub(crate) fn push_transform(&mut self, comp: cfb::CompoundFile<fs::File>) {
        self.transforms.insert(0, comp);
    }

    pub(crate) fn num_transforms(&self) -> usize {
        self.transforms.len()
    }

    /// Drops the handle on the input file.
    pub(crate) fn close_input(&mut self) {
        self.input = None;
    }

    /// Replaces the input file, e.g. with the file just written by a commit.
    /// Already-open streams and storages are kept.
    pub(crate) fn set_input(&mut self, comp: cfb::CompoundFile<fs::File>) {
        self.input = Some(comp);
    }

    /// Loads every noted sub-storage, so that all of them can be copied.
    pub(crate) fn load_all_storages(&mut self) -> Result<()> {
        for name in self.storage_names() {
            self.open_storage(&name)?;
        }
        Ok(())
    }

    /// Copies every sub-storage into the output file.
    pub(crate) fn write_storages<F: Read + Write + Seek>(
        &self,
        out: &mut cfb::CompoundFile<F>,
    ) -> Result<()> {
        for (name, image) in self.storages.iter() {
            if let Some(image) = image {
                tracing::trace!("copying storage {:?}", name);
                image.write_to(out, &root_path(name))?;
            }
        }
        Ok(())
    }

    /// Copies every open stream into the output file.
    pub(crate) fn write_streams<F: Read + Write + Seek>(
        &self,
        out: &mut cfb::CompoundFile<F>,
    ) -> Result<()> {
        for (name, handle) in self.streams.iter() {
            if self.transient.contains(name) {
                continue;
            }
            if !streamname::fits(name) {
                function_failed!("Stream name {:?} is too long",
                                 streamname::decode(name).0);
            }
            tracing::trace!("copying stream {:?}", streamname::decode(name).0);
            out.create_stream(root_path(name))?.write_all(handle.data())?;
        }
        Ok(())
    }
}

// ========================================================================= //

#[cfg(test)]
mod tests {
    use super::{Storage, StreamHandle};
    use crate::internal::error::ErrorKind;
    use std::io::{Cursor, Read, Seek, SeekFrom, Write};

    #[test]
    fn cloned_handles_have_independent_cursors() {
        let mut original = StreamHandle::from_bytes(b"Hello, world!".to_vec());
        let mut clone = original.clone();
        clone.seek(SeekFrom::Start(7)).unwrap();
        let mut rest = String::new();
        clone.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "world!");
        assert_eq!(original.position(), 0);
        let mut buffer = [0u8; 5];
        original.read_exact(&mut buffer).unwrap();
        assert_eq!(&buffer, b"Hello");
        assert!(original.shares_data_with(&clone));
    }

    #[test]
    fn seek_before_start_fails() {
        let mut handle = StreamHandle::from_bytes(vec![1, 2, 3]);
        assert_eq!(handle.seek(SeekFrom::End(-1)).unwrap(), 2);
        assert!(handle.seek(SeekFrom::Current(-5)).is_err());
        assert_eq!(handle.seek(SeekFrom::Start(10)).unwrap(), 10);
        let mut buffer = Vec::new();
        assert_eq!(handle.read_to_end(&mut buffer).unwrap(), 0);
    }

    #[test]
    fn read_only_storage_rejects_writes() {
        let mut storage = Storage::new(None, true);
        let result = storage.write_raw_stream_data("Foo", vec![1]);
        assert_eq!(result.unwrap_err().kind(), ErrorKind::AccessDenied);
    }

    #[test]
    fn written_streams_are_found_and_rewound() {
        let mut storage = Storage::new(None, false);
        storage.write_raw_stream_data("Foo", b"abc".to_vec()).unwrap();
        let mut first = storage.get_raw_stream("Foo").unwrap();
        let mut byte = [0u8; 1];
        first.read_exact(&mut byte).unwrap();
        let second = storage.clone_open_stream("Foo").unwrap();
        assert_eq!(second.position(), 0);
        assert_eq!(first.position(), 1);
        let missing = storage.get_raw_stream("Bar").unwrap_err();
        assert_eq!(missing.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn transient_streams_are_not_written() {
        let mut storage = Storage::new(None, true);
        storage.write_transient_stream("Scratch", vec![7]);
        assert!(storage.is_transient_stream("Scratch"));
        assert_eq!(storage.clone_open_stream("Scratch").unwrap().data(), &[7]);

        let mut out = cfb::CompoundFile::create(Cursor::new(Vec::new()))
            .unwrap();
        storage.write_streams(&mut out).unwrap();
        assert!(!out.is_stream("/Scratch"));
    }

    #[test]
    fn rename_moves_stream_data() {
        let mut storage = Storage::new(None, false);
        storage.write_raw_stream_data("Old", b"abc".to_vec()).unwrap();
        assert!(storage.rename_stream("Old", "New").unwrap());
        assert!(storage.clone_open_stream("Old").is_err());
        assert_eq!(storage.clone_open_stream("New").unwrap().data(), b"abc");
        assert!(!storage.rename_stream("Missing", "Other").unwrap());
    }

    #[test]
    fn create_storage_from_image() {
        let mut comp = cfb::CompoundFile::create(Cursor::new(Vec::new()))
            .unwrap();
        comp.create_storage("/Inner").unwrap();
        comp.create_stream("/Inner/Data").unwrap().write_all(b"xyz").unwrap();
        comp.flush().unwrap();
        let bytes = comp.into_inner().into_inner();

        let mut storage = Storage::new(None, false);
        let source = StreamHandle::from_bytes(bytes);
        storage.create_storage("Embedded", &source).unwrap();
        assert_eq!(storage.storage_names(), vec!["Embedded".to_string()]);
        assert_eq!(storage.open_storage("Embedded").unwrap().num_entries(), 2);
        storage.destroy_storage("Embedded");
        storage.destroy_storage("Embedded");
        assert!(storage.storage_names().is_empty());
    }
}

// ========================================================================= //

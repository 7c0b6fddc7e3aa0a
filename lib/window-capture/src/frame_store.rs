use crate::{BYTES_PER_PIXEL, LogicalSize};
use memmap2::MmapMut;
use std::{fmt, sync::Arc};

#[cfg(target_os = "linux")]
use std::{
    fs::File,
    os::fd::{AsFd, BorrowedFd},
};

#[derive(thiserror::Error, Debug)]
pub enum FrameStoreError {
    #[error("invalid frame store dimensions {width}x{height} with {page_count} pages")]
    InvalidSize {
        width: u32,
        height: u32,
        page_count: usize,
    },

    #[error("shared memory allocation failed: {0}")]
    AllocationFailed(String),
}

/// One contiguous shared mapping. Pages are carved out of it by offset.
struct Segment {
    #[cfg(target_os = "linux")]
    file: File,
    _mmap: MmapMut,
    ptr: *mut u8,
    len: usize,
}

// SAFETY: the mapping lives as long as the segment. Mutable access to a byte
// range is only handed out through `FrameStore::page_mut` (exclusive borrow of
// the store) or through a `Page`, and every `Page` covers a distinct range.
unsafe impl Send for Segment {}
unsafe impl Sync for Segment {}

impl Segment {
    #[cfg(target_os = "linux")]
    fn allocate(len: usize) -> Result<Self, FrameStoreError> {
        use nix::sys::memfd;

        let memfd = memfd::memfd_create(c"xcapture", memfd::MFdFlags::MFD_CLOEXEC)
            .map_err(|e| FrameStoreError::AllocationFailed(format!("memfd_create: {e}")))?;

        let file = File::from(memfd);
        file.set_len(len as u64)
            .map_err(|e| FrameStoreError::AllocationFailed(format!("set_len({len}): {e}")))?;

        // SAFETY: the file was created above and is not shared with anything
        // that could truncate it while mapped.
        let mut mmap = unsafe { MmapMut::map_mut(&file) }
            .map_err(|e| FrameStoreError::AllocationFailed(format!("mmap: {e}")))?;
        let ptr = mmap.as_mut_ptr();

        Ok(Self {
            file,
            _mmap: mmap,
            ptr,
            len,
        })
    }

    #[cfg(not(target_os = "linux"))]
    fn allocate(len: usize) -> Result<Self, FrameStoreError> {
        let mut mmap = MmapMut::map_anon(len)
            .map_err(|e| FrameStoreError::AllocationFailed(format!("mmap: {e}")))?;
        let ptr = mmap.as_mut_ptr();

        Ok(Self {
            _mmap: mmap,
            ptr,
            len,
        })
    }
}

/// Fixed-size shared memory divided into equally sized frame pages.
///
/// The layout never changes after [`FrameStore::create`]: page `k` always starts
/// at `k * page_size()` and is exactly `page_size()` bytes long.
pub struct FrameStore {
    segment: Arc<Segment>,
    size: LogicalSize,
    page_count: usize,
}

impl FrameStore {
    pub fn create(width: u32, height: u32, page_count: usize) -> Result<Self, FrameStoreError> {
        if width == 0 || height == 0 || page_count == 0 {
            return Err(FrameStoreError::InvalidSize {
                width,
                height,
                page_count,
            });
        }

        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(BYTES_PER_PIXEL))
            .and_then(|v| v.checked_mul(page_count))
            .ok_or_else(|| {
                FrameStoreError::AllocationFailed(format!(
                    "{width}x{height}x{page_count} pages overflows"
                ))
            })?;

        let segment = Segment::allocate(len)?;
        log::info!("frame store: {page_count} pages of {width}x{height} ({len} bytes)");

        Ok(Self {
            segment: Arc::new(segment),
            size: LogicalSize::new(width, height),
            page_count,
        })
    }

    /// Dimensions of a single page in pixels.
    pub fn size(&self) -> LogicalSize {
        self.size
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn page_size(&self) -> usize {
        self.size.bytes()
    }

    pub fn page_offset(&self, index: usize) -> usize {
        self.page_size() * index
    }

    /// Total size of the shared segment in bytes.
    pub fn len(&self) -> usize {
        self.segment.len
    }

    pub fn is_empty(&self) -> bool {
        self.segment.len == 0
    }

    pub fn page(&self, index: usize) -> &[u8] {
        let offset = self.checked_offset(index);
        // SAFETY: in bounds of the mapping, and no `Page` exists while the store is alive.
        unsafe { std::slice::from_raw_parts(self.segment.ptr.add(offset), self.page_size()) }
    }

    pub fn page_mut(&mut self, index: usize) -> &mut [u8] {
        let offset = self.checked_offset(index);
        // SAFETY: as in `page`, and `&mut self` excludes any other borrow.
        unsafe { std::slice::from_raw_parts_mut(self.segment.ptr.add(offset), self.page_size()) }
    }

    /// File descriptor of the shared segment, for display servers that attach it.
    #[cfg(target_os = "linux")]
    pub fn as_fd(&self) -> BorrowedFd<'_> {
        self.segment.file.as_fd()
    }

    /// Split the store into one owned token per page, in index order.
    pub fn into_pages(self) -> Vec<Page> {
        let page_size = self.page_size();
        (0..self.page_count)
            .map(|index| Page {
                segment: self.segment.clone(),
                index,
                offset: index * page_size,
                len: page_size,
            })
            .collect()
    }

    fn checked_offset(&self, index: usize) -> usize {
        assert!(
            index < self.page_count,
            "page index {index} out of range 0..{}",
            self.page_count
        );
        self.page_offset(index)
    }
}

impl fmt::Debug for FrameStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameStore")
            .field("size", &self.size)
            .field("page_count", &self.page_count)
            .field("len", &self.segment.len)
            .finish()
    }
}

/// Exclusive handle to one page of a [`FrameStore`].
///
/// Pages are not `Clone`: whoever holds the token is the only one able to read
/// or write that slot. The token keeps the shared mapping alive.
pub struct Page {
    segment: Arc<Segment>,
    index: usize,
    offset: usize,
    len: usize,
}

impl Page {
    pub fn index(&self) -> usize {
        self.index
    }

    /// Byte offset of this page inside the shared segment.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: `offset + len <= segment.len` by construction and this token is
        // the only handle to the range.
        unsafe { std::slice::from_raw_parts(self.segment.ptr.add(self.offset), self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: see `as_slice`; `&mut self` makes the access exclusive.
        unsafe { std::slice::from_raw_parts_mut(self.segment.ptr.add(self.offset), self.len) }
    }
}

impl AsRef<[u8]> for Page {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("index", &self.index)
            .field("offset", &self.offset)
            .field("len", &self.len)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_layout() {
        for (width, height, page_count) in [(1, 1, 1), (3, 5, 2), (800, 600, 2), (17, 9, 4)] {
            let store = FrameStore::create(width, height, page_count).unwrap();
            let page_size = width as usize * height as usize * 4;

            assert_eq!(store.page_size(), page_size);
            assert_eq!(store.len(), page_size * page_count);

            for k in 0..page_count {
                assert_eq!(store.page_offset(k), k * page_size);
                assert_eq!(store.page(k).len(), page_size);
            }
        }
    }

    #[test]
    fn test_pages_do_not_overlap() {
        let mut store = FrameStore::create(7, 3, 3).unwrap();
        for k in 0..3 {
            store.page_mut(k).fill(k as u8 + 1);
        }

        for k in 0..3 {
            assert!(store.page(k).iter().all(|b| *b == k as u8 + 1));
        }
    }

    #[test]
    fn test_into_pages() {
        let store = FrameStore::create(4, 4, 2).unwrap();
        let page_size = store.page_size();
        let mut pages = store.into_pages();

        assert_eq!(pages.len(), 2);
        for (k, page) in pages.iter().enumerate() {
            assert_eq!(page.index(), k);
            assert_eq!(page.offset(), k * page_size);
            assert_eq!(page.len(), page_size);
        }

        pages[0].as_mut_slice().fill(0xaa);
        assert!(pages[1].as_slice().iter().all(|b| *b == 0));
        assert!(pages[0].as_slice().iter().all(|b| *b == 0xaa));
    }

    #[test]
    fn test_page_moves_across_threads() {
        let mut pages = FrameStore::create(2, 2, 2).unwrap().into_pages();
        let mut page = pages.pop().unwrap();

        let handle = std::thread::spawn(move || {
            page.as_mut_slice().fill(7);
            page
        });

        let page = handle.join().unwrap();
        assert_eq!(page.index(), 1);
        assert!(page.as_slice().iter().all(|b| *b == 7));
    }

    #[test]
    fn test_invalid_size() {
        assert!(matches!(
            FrameStore::create(0, 10, 2),
            Err(FrameStoreError::InvalidSize { .. })
        ));
        assert!(matches!(
            FrameStore::create(10, 10, 0),
            Err(FrameStoreError::InvalidSize { .. })
        ));
    }

    #[test]
    #[should_panic]
    fn test_page_out_of_range() {
        let store = FrameStore::create(2, 2, 2).unwrap();
        store.page(2);
    }
}

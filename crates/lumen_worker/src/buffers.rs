//! Buffer manager
//!
//! The transport owns bulk buffer memory. The worker only retains buffers
//! that engine objects alias and remembers which one is the current upload
//! staging buffer.

use lumen_engine::{MappedBuffer, RetainedBuffer};

use crate::error::{DispatchError, DispatchResult};

#[derive(Debug, Default)]
pub struct BufferManager {
    upload: Option<MappedBuffer>,
}

impl BufferManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retain `buffer` for an object that aliases it
    pub fn retain(&self, buffer: &MappedBuffer) -> DispatchResult<RetainedBuffer> {
        buffer
            .retain()
            .map_err(|e| DispatchError::Transport(format!("cannot retain {} byte buffer: {}", buffer.len(), e)))
    }

    /// Designate the upload staging buffer; the last pin wins
    pub fn pin_upload(&mut self, buffer: MappedBuffer) {
        log::debug!("Pinned {} byte upload buffer", buffer.len());
        self.upload = Some(buffer);
    }

    pub fn upload_buffer(&self) -> Option<&MappedBuffer> {
        self.upload.as_ref()
    }

    /// Copy the first `size` staged bytes into `dst` at offset `begin`
    ///
    /// The staged bytes are snapshotted and the buffer lock released before
    /// `dst` runs, so the destination may alias the upload buffer.
    pub fn copy_upload<F>(&self, begin: i64, size: i64, dst: F) -> DispatchResult<()>
    where
        F: FnOnce(usize, &[u8]) -> DispatchResult<()>,
    {
        let upload = self.upload.as_ref().ok_or(DispatchError::NoUploadBuffer)?;
        let out_of_range = DispatchError::UploadOutOfRange {
            begin,
            size,
            available: upload.len(),
        };
        let (Ok(begin), Ok(size)) = (usize::try_from(begin), usize::try_from(size)) else {
            return Err(out_of_range);
        };
        if size > upload.len() {
            return Err(out_of_range);
        }
        let staged = upload.read()[..size].to_vec();
        dst(begin, &staged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retain_unmapped_is_transport_error() {
        let manager = BufferManager::new();
        let buffer = MappedBuffer::new(vec![1, 2, 3]);
        let retained = manager.retain(&buffer).unwrap();
        assert_eq!(buffer.retain_count(), 1);
        drop(retained);

        buffer.unmap();
        assert!(matches!(manager.retain(&buffer), Err(DispatchError::Transport(_))));
    }

    #[test]
    fn test_last_pin_wins() {
        let mut manager = BufferManager::new();
        assert!(matches!(
            manager.copy_upload(0, 1, |_, _| Ok(())),
            Err(DispatchError::NoUploadBuffer)
        ));

        let first = MappedBuffer::new(vec![1; 4]);
        let second = MappedBuffer::new(vec![2; 8]);
        manager.pin_upload(first);
        manager.pin_upload(second.clone());
        assert!(manager.upload_buffer().unwrap().ptr_eq(&second));

        let mut copied = Vec::new();
        manager
            .copy_upload(16, 8, |begin, bytes| {
                assert_eq!(begin, 16);
                copied.extend_from_slice(bytes);
                Ok(())
            })
            .unwrap();
        assert_eq!(copied, vec![2; 8]);
    }

    #[test]
    fn test_upload_out_of_range() {
        let mut manager = BufferManager::new();
        manager.pin_upload(MappedBuffer::new(vec![0; 4]));
        assert!(matches!(
            manager.copy_upload(0, 5, |_, _| Ok(())),
            Err(DispatchError::UploadOutOfRange { available: 4, .. })
        ));
        assert!(manager.copy_upload(-1, 2, |_, _| Ok(())).is_err());
    }

    #[test]
    fn test_destination_may_lock_upload_buffer() {
        let mut manager = BufferManager::new();
        let buffer = MappedBuffer::new(vec![1, 2, 3, 4]);
        manager.pin_upload(buffer.clone());

        manager
            .copy_upload(2, 2, |begin, bytes| {
                buffer.write()[begin..begin + bytes.len()].copy_from_slice(bytes);
                Ok(())
            })
            .unwrap();
        assert_eq!(buffer.to_vec(), vec![1, 2, 1, 2]);
    }
}

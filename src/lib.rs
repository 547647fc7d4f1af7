//! Shared helpers for the workspace end-to-end tests

use shmstack_runtime::{ByteBacking, RuntimeError, SegmentOpener};

/// Hands every `shm` declaration a zeroed buffer of the given size
#[derive(Debug, Clone, Copy)]
pub struct BufferOpener(pub usize);

impl SegmentOpener for BufferOpener {
    fn open(&self, _name: &str) -> Result<Box<dyn ByteBacking>, RuntimeError> {
        Ok(Box::new(vec![0u8; self.0]))
    }
}

/// Fails every `shm` declaration the way a missing segment would
#[derive(Debug, Clone, Copy)]
pub struct MissingSegments;

impl SegmentOpener for MissingSegments {
    fn open(&self, name: &str) -> Result<Box<dyn ByteBacking>, RuntimeError> {
        Err(RuntimeError::Segment {
            name: format!("/{}", name),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })
    }
}

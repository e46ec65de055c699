//! Binary layout snapshots.
//!
//! A snapshot is a bitcode-encoded [`LayoutDocument`] plus the store's id
//! counter, behind a versioned header. Undo/redo stacks, autosave slots and
//! background-optimizer hand-offs hold these byte blobs; restoring one goes
//! through the same validation as a JSON import.

use crate::document::{DocumentError, LayoutDocument};
use crate::layout::LayoutStore;
use serde::{Deserialize, Serialize};

/// Magic number identifying a habitat layout snapshot.
pub const SNAPSHOT_MAGIC: u32 = 0x4AB1_0001;

/// Current format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

/// Errors from taking or restoring a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", SNAPSHOT_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("snapshot from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error("snapshot does not describe a valid layout: {0}")]
    Invalid(#[from] DocumentError),
}

/// Header prepended to every snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub magic: u32,
    pub version: u32,
}

impl SnapshotHeader {
    pub fn new() -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: FORMAT_VERSION,
        }
    }

    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(SnapshotError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(SnapshotError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

impl Default for SnapshotHeader {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LayoutSnapshot {
    header: SnapshotHeader,
    next_id: u64,
    document: LayoutDocument,
}

/// Encode a store into snapshot bytes.
pub fn take_snapshot(store: &LayoutStore) -> Result<Vec<u8>, SnapshotError> {
    let snapshot = LayoutSnapshot {
        header: SnapshotHeader::new(),
        next_id: store.next_id(),
        document: LayoutDocument::from_store(store, crate::document::DEFAULT_CELL_SIZE),
    };
    bitcode::serialize(&snapshot).map_err(|e| SnapshotError::Encode(e.to_string()))
}

/// Decode only the header, e.g. to check compatibility.
pub fn read_snapshot_header(data: &[u8]) -> Result<SnapshotHeader, SnapshotError> {
    // bitcode has no partial decoding, so this decodes the full payload.
    let snapshot: LayoutSnapshot =
        bitcode::deserialize(data).map_err(|e| SnapshotError::Decode(e.to_string()))?;
    Ok(snapshot.header)
}

/// Rebuild a store from snapshot bytes. The id counter is restored so ids
/// handed out before the snapshot are never reused.
pub fn restore_snapshot(data: &[u8]) -> Result<LayoutStore, SnapshotError> {
    let snapshot: LayoutSnapshot =
        bitcode::deserialize(data).map_err(|e| SnapshotError::Decode(e.to_string()))?;
    snapshot.header.validate()?;
    Ok(snapshot.document.into_store_with_next_id(snapshot.next_id)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::grid::{GridPosition, GridSize, Rotation};

    fn store() -> LayoutStore {
        let catalog = Catalog::default_habitat();
        let mut store = LayoutStore::new(GridSize::new(16, 12));
        store
            .place(catalog.require("galley").unwrap(), GridPosition::new(0, 0), Rotation::None)
            .unwrap();
        let medical = store
            .place(catalog.require("medical").unwrap(), GridPosition::new(4, 4), Rotation::None)
            .unwrap();
        store
            .place(catalog.require("life").unwrap(), GridPosition::new(10, 3), Rotation::Cw90)
            .unwrap();
        store.remove(medical).unwrap();
        store
    }

    #[test]
    fn restore_matches_original() {
        let original = store();
        let bytes = take_snapshot(&original).unwrap();
        let restored = restore_snapshot(&bytes).unwrap();
        assert_eq!(restored, original);
        assert_eq!(restored.next_id(), 4);
    }

    #[test]
    fn header_is_current() {
        let bytes = take_snapshot(&store()).unwrap();
        let header = read_snapshot_header(&bytes).unwrap();
        assert_eq!(header, SnapshotHeader::new());
    }

    #[test]
    fn garbage_fails_to_decode() {
        assert!(matches!(
            restore_snapshot(&[0xde, 0xad, 0xbe, 0xef]),
            Err(SnapshotError::Decode(_))
        ));
    }

    #[test]
    fn header_validation() {
        let wrong_magic = SnapshotHeader {
            magic: 0xDEAD_BEEF,
            version: FORMAT_VERSION,
        };
        assert!(matches!(
            wrong_magic.validate(),
            Err(SnapshotError::InvalidMagic(0xDEAD_BEEF))
        ));

        let future = SnapshotHeader {
            magic: SNAPSHOT_MAGIC,
            version: FORMAT_VERSION + 1,
        };
        assert!(matches!(future.validate(), Err(SnapshotError::FutureVersion(_))));

        let old = SnapshotHeader {
            magic: SNAPSHOT_MAGIC,
            version: 0,
        };
        assert!(matches!(old.validate(), Err(SnapshotError::UnsupportedVersion(0))));
    }

    #[test]
    fn tampered_snapshot_is_revalidated() {
        let mut snapshot = LayoutSnapshot {
            header: SnapshotHeader::new(),
            next_id: 3,
            document: LayoutDocument::from_store(&store(), 48),
        };
        // Put the second placement on top of the first.
        snapshot.document.layout[1].x = 0;
        snapshot.document.layout[1].y = 0;
        let bytes = bitcode::serialize(&snapshot).unwrap();
        assert!(matches!(restore_snapshot(&bytes), Err(SnapshotError::Invalid(_))));
    }
}

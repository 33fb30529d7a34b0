//! In-order reassembly of units that complete out of order.

use bytes::BytesMut;
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::types::{AudioBlob, CompletedUnit};

/// Appends unit blobs strictly by ascending index.
///
/// Units may be accepted in any order; a unit is appended only once every
/// lower index has been appended, so the output never has gaps or repeats.
#[derive(Debug)]
pub struct Reassembler {
    total: usize,
    next_index: usize,
    held: BTreeMap<usize, AudioBlob>,
    output: BytesMut,
}

impl Reassembler {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            next_index: 0,
            held: BTreeMap::new(),
            output: BytesMut::new(),
        }
    }

    pub fn accept(&mut self, unit: CompletedUnit) -> Result<()> {
        if unit.index >= self.total {
            return Err(Error::InvalidInput(format!(
                "unit {} outside 0..{}",
                unit.index, self.total
            )));
        }
        if unit.index < self.next_index || self.held.contains_key(&unit.index) {
            return Err(Error::InvalidInput(format!(
                "unit {} delivered twice",
                unit.index
            )));
        }

        self.held.insert(unit.index, unit.blob);
        while let Some(blob) = self.held.remove(&self.next_index) {
            self.output.extend_from_slice(&blob);
            self.next_index += 1;
        }
        Ok(())
    }

    /// Number of units accepted so far
    pub fn accepted(&self) -> usize {
        self.next_index + self.held.len()
    }

    pub fn is_complete(&self) -> bool {
        self.next_index == self.total
    }

    pub fn finish(self) -> Result<AudioBlob> {
        if !self.is_complete() {
            return Err(Error::InvalidInput(format!(
                "reassembly stopped at unit {} of {}",
                self.next_index, self.total
            )));
        }
        Ok(self.output.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(index: usize, data: &'static [u8]) -> CompletedUnit {
        CompletedUnit {
            index,
            blob: AudioBlob::from_static(data),
        }
    }

    #[test]
    fn test_last_first_still_in_order() {
        let mut reassembler = Reassembler::new(3);
        reassembler.accept(unit(2, b"C")).unwrap();
        reassembler.accept(unit(0, b"A")).unwrap();
        assert!(!reassembler.is_complete());
        reassembler.accept(unit(1, b"B")).unwrap();

        assert_eq!(reassembler.finish().unwrap().as_ref(), b"ABC".as_slice());
    }

    #[test]
    fn test_duplicates_and_strays_rejected() {
        let mut reassembler = Reassembler::new(2);
        reassembler.accept(unit(0, b"A")).unwrap();
        assert!(reassembler.accept(unit(0, b"A")).is_err());
        assert!(reassembler.accept(unit(5, b"Z")).is_err());
        assert_eq!(reassembler.accepted(), 1);
    }

    #[test]
    fn test_incomplete_finish_fails() {
        let mut reassembler = Reassembler::new(2);
        reassembler.accept(unit(1, b"B")).unwrap();
        assert!(reassembler.finish().is_err());
    }
}

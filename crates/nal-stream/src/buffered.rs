use crate::annexb::AnnexBReader;
use crate::unit::NalUnit;
use crate::{check_payload, copy_payload, Advance, NalError, NalStream};
use std::fs::File;
use std::io::{BufWriter, Cursor, Write};
use std::path::Path;
use tracing::debug;

/// Whole-buffer walker: parses every unit at open, writes the output at close
pub struct BufferedWalker {
    units: Vec<NalUnit>,
    /// Index of the next unit `advance` will move to
    next: usize,
    output: Option<File>,
}

impl BufferedWalker {
    pub fn open(input: &Path, output: Option<&Path>) -> Result<Self, NalError> {
        let data = std::fs::read(input)?;
        let size = data.len();

        let mut reader = AnnexBReader::new(Cursor::new(data));
        let mut units = Vec::new();
        while let Some(raw) = reader.next_unit()? {
            units.push(NalUnit::from_raw(raw));
        }

        let output = match output {
            Some(path) => Some(File::create(path)?),
            None => None,
        };
        debug!(
            "Parsed {} NAL units from {} ({} bytes)",
            units.len(),
            input.display(),
            size
        );

        Ok(Self {
            units,
            next: 0,
            output,
        })
    }

    fn current_index(&self) -> Result<usize, NalError> {
        if self.next == 0 || self.next > self.units.len() {
            return Err(NalError::NoCurrentUnit);
        }
        Ok(self.next - 1)
    }

    fn current(&self) -> Result<&NalUnit, NalError> {
        let idx = self.current_index()?;
        Ok(&self.units[idx])
    }
}

impl NalStream for BufferedWalker {
    fn advance(&mut self) -> Result<Advance, NalError> {
        if self.next < self.units.len() {
            self.next += 1;
            Ok(Advance::Unit)
        } else {
            // Park past the end so no unit stays current
            self.next = self.units.len() + 1;
            Ok(Advance::End)
        }
    }

    fn unit_type(&self) -> Result<u8, NalError> {
        Ok(self.current()?.unit_type())
    }

    fn unit_size(&self) -> Result<usize, NalError> {
        Ok(self.current()?.payload().len())
    }

    fn read_payload(&self, buf: &mut [u8]) -> Result<usize, NalError> {
        Ok(copy_payload(self.current()?.payload(), buf))
    }

    fn write_payload(&mut self, payload: &[u8]) -> Result<usize, NalError> {
        if self.output.is_none() {
            return Err(NalError::ReadOnly);
        }
        check_payload(payload)?;
        let idx = self.current_index()?;
        self.units[idx].replace_payload(payload);
        Ok(payload.len())
    }

    fn close(mut self: Box<Self>) -> Result<(), NalError> {
        if let Some(file) = self.output.take() {
            let mut writer = BufWriter::new(file);
            for unit in &self.units {
                unit.write_to(&mut writer)?;
            }
            writer.flush()?;
            debug!("Wrote {} NAL units", self.units.len());
        }
        Ok(())
    }
}

use crate::annexb::AnnexBReader;
use crate::unit::NalUnit;
use crate::{check_payload, copy_payload, Advance, NalError, NalStream};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Incremental walker: one unit in memory at a time
pub struct StreamingWalker {
    reader: AnnexBReader<BufReader<File>>,
    writer: Option<BufWriter<File>>,
    current: Option<NalUnit>,
    finished: bool,
    units: u64,
}

impl StreamingWalker {
    pub fn open(input: &Path, output: Option<&Path>) -> Result<Self, NalError> {
        let reader = AnnexBReader::new(BufReader::new(File::open(input)?));
        let writer = match output {
            Some(path) => Some(BufWriter::new(File::create(path)?)),
            None => None,
        };
        debug!(
            "Opened streaming NAL walker on {} (writable: {})",
            input.display(),
            writer.is_some()
        );

        Ok(Self {
            reader,
            writer,
            current: None,
            finished: false,
            units: 0,
        })
    }

    /// Hand the current unit to the output, if any
    fn flush_current(&mut self) -> Result<(), NalError> {
        if let Some(unit) = self.current.take() {
            if let Some(writer) = self.writer.as_mut() {
                unit.write_to(writer)?;
            }
        }
        Ok(())
    }

    fn current(&self) -> Result<&NalUnit, NalError> {
        self.current.as_ref().ok_or(NalError::NoCurrentUnit)
    }
}

impl NalStream for StreamingWalker {
    fn advance(&mut self) -> Result<Advance, NalError> {
        self.flush_current()?;
        if self.finished {
            return Ok(Advance::End);
        }

        match self.reader.next_unit()? {
            Some(raw) => {
                self.current = Some(NalUnit::from_raw(raw));
                self.units += 1;
                Ok(Advance::Unit)
            }
            None => {
                self.finished = true;
                Ok(Advance::End)
            }
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
        if self.writer.is_none() {
            return Err(NalError::ReadOnly);
        }
        check_payload(payload)?;
        let unit = self.current.as_mut().ok_or(NalError::NoCurrentUnit)?;
        unit.replace_payload(payload);
        Ok(payload.len())
    }

    fn close(mut self: Box<Self>) -> Result<(), NalError> {
        self.flush_current()?;

        if let Some(mut writer) = self.writer.take() {
            let mut copied = 0u64;
            if !self.finished {
                while let Some(raw) = self.reader.next_unit()? {
                    NalUnit::from_raw(raw).write_to(&mut writer)?;
                    copied += 1;
                }
            }
            writer.flush()?;
            debug!(
                "Closed streaming NAL walker after {} units ({} copied through)",
                self.units, copied
            );
        } else {
            debug!("Closed read-only NAL walker after {} units", self.units);
        }
        Ok(())
    }
}

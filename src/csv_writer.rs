use crate::traits::CSVWrite;
use anyhow::Result;
use csv::{Writer, WriterBuilder};
use serde::Serialize;
use std::io::{self, Stdout, Write};

pub struct CSVWriter<W: Write> {
    writer: Writer<W>,
}

impl CSVWriter<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> CSVWriter<W> {
    pub fn new(inner: W) -> Self {
        CSVWriter {
            writer: WriterBuilder::new().has_headers(false).from_writer(inner),
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> Result<W> {
        self.writer.into_inner().map_err(|e| anyhow::anyhow!("{}", e.error()))
    }
}

impl<W: Write> CSVWrite for CSVWriter<W> {
    fn write_record<T: Serialize>(&mut self, record: &T) -> Result<()> {
        Ok(self.writer.serialize(record)?)
    }

    fn flush(&mut self) -> Result<()> {
        Ok(self.writer.flush()?)
    }
}

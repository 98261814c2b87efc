use crate::domain::projection::TransactionInfo;
use crate::error::Result;
use std::io::Write;

/// Writes projected ledger rows as CSV, header first.
pub struct LedgerWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> LedgerWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_transactions<'a, I>(&mut self, rows: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a TransactionInfo>,
    {
        for row in rows {
            self.writer.serialize(row)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

//! Relative terminal frame.
//!
//! The frame reserves N blank lines, then addresses rows relative to a saved
//! anchor at the top of that block, so redraws never depend on the absolute
//! cursor position.

use std::io::{Result, Stdout, Write, stdout};

use crossterm::{
    QueueableCommand,
    cursor::{MoveDown, MoveToColumn, MoveUp, RestorePosition, SavePosition},
    terminal::{Clear, ClearType},
};

#[derive(Debug)]
pub struct RelativeFrame {
    stdout: Stdout,
    rows: u16,
    started: bool,
}

impl RelativeFrame {
    pub fn new(rows: u16) -> Self {
        Self {
            stdout: stdout(),
            rows,
            started: false,
        }
    }

    /// Reserve the rows and anchor the cursor at the first one.
    pub fn start(&mut self) -> Result<()> {
        for _ in 0..self.rows {
            writeln!(self.stdout)?;
        }
        if self.rows > 0 {
            self.stdout.queue(MoveUp(self.rows))?;
        }
        self.stdout.queue(MoveToColumn(0))?.queue(SavePosition)?;
        self.stdout.flush()?;
        self.started = true;
        Ok(())
    }

    /// Redraw one row. Output is queued until [`flush`](Self::flush).
    pub fn write_row(&mut self, row: u16, draw: impl FnOnce(&mut Stdout) -> Result<()>) -> Result<()> {
        if !self.started {
            self.start()?;
        }
        if row >= self.rows {
            return Ok(());
        }

        self.stdout.queue(RestorePosition)?;
        if row > 0 {
            self.stdout.queue(MoveDown(row))?;
        }
        self.stdout.queue(MoveToColumn(0))?;
        draw(&mut self.stdout)?;
        self.stdout
            .queue(Clear(ClearType::UntilNewLine))?
            .queue(RestorePosition)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.stdout.flush()
    }

    /// Leave the cursor on the line below the frame.
    pub fn finish(&mut self) -> Result<()> {
        if !self.started {
            return Ok(());
        }
        self.stdout.queue(RestorePosition)?;
        if self.rows > 0 {
            self.stdout.queue(MoveDown(self.rows))?;
        }
        self.stdout.queue(MoveToColumn(0))?;
        self.started = false;
        self.stdout.flush()
    }
}

//! Gap filling between sparse cells.
//!
//! Decoders satisfy one of two contracts:
//!
//! - **Explicit gaps** ([`ExplicitGaps`]): the decoder emits a missing-cell
//!   event for every skipped column and a row-end event after the last cell.
//!   The session never computes a gap; it only checks that each cell lands on
//!   the next free slot.
//! - **Reference inference** ([`ReferenceInference`]): only present cells are
//!   reported, so the number of placeholders is derived from the distance
//!   between successive column references, and trailing placeholders from
//!   the header row's width.
//!
//! Column numbers here are 1-based; 0 stands for "before the first column".

use crate::common::{Error, Result};
use crate::sheet::address::column_to_index;
use crate::sheet::config::SessionConfig;
use crate::sheet::event::CellColumn;

/// Number of empty cells strictly between two references in one row.
///
/// # Examples
///
/// ```
/// use gridfold::sheet::fill_between;
/// assert_eq!(fill_between("A3", "D3").unwrap(), 2);
/// assert_eq!(fill_between("Z1", "AA1").unwrap(), 0);
/// assert!(fill_between("D3", "A3").is_err());
/// ```
pub fn fill_between(previous: &str, current: &str) -> Result<usize> {
    fill_between_indices(column_to_index(previous)?, column_to_index(current)?)
}

/// [`fill_between`] on 1-based column numbers, with 0 as the row start.
///
/// Fails with [`Error::NegativeGap`] unless `current > previous`.
pub fn fill_between_indices(previous: u32, current: u32) -> Result<usize> {
    if current <= previous {
        return Err(Error::NegativeGap { previous, current });
    }
    Ok((current - previous - 1) as usize)
}

/// Number of empty cells appended after `last` so a row reaches `max`.
///
/// Defined as `fill_between(last, max) + 1`. The cells strictly between the
/// two columns plus the `max` column itself come to `max - last`, which is
/// what is computed. A row that already ends at or past the header column
/// gets nothing instead of an error.
pub fn pad_trailing(max: &str, last: &str) -> Result<usize> {
    Ok(pad_trailing_indices(
        column_to_index(max)?,
        column_to_index(last)?,
    ))
}

/// [`pad_trailing`] on 1-based column numbers.
///
/// `(max - last - 1) + 1` collapses to `max - last`; saturating keeps a row
/// wider than the header at zero padding.
#[inline]
pub fn pad_trailing_indices(max: u32, last: u32) -> usize {
    max.saturating_sub(last) as usize
}

/// 1-based column number of a cell position.
pub fn column_number(column: &CellColumn) -> Result<u32> {
    match column {
        CellColumn::Index(index) => index
            .checked_add(1)
            .ok_or_else(|| Error::MalformedReference(index.to_string())),
        CellColumn::Reference(reference) => column_to_index(reference),
    }
}

/// The most recently placed cell of the open row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastPlaced {
    /// 1-based column number
    pub column: u32,
    /// 0-based slot in the row buffer
    pub slot: usize,
    /// Slot holds raw text kept from a cell with a malformed reference
    pub recovered: bool,
}

impl LastPlaced {
    pub fn new(column: u32, slot: usize) -> Self {
        Self {
            column,
            slot,
            recovered: false,
        }
    }

    /// A slot filled by malformed-reference recovery; never replaced.
    pub fn recovered(column: u32, slot: usize) -> Self {
        Self {
            column,
            slot,
            recovered: true,
        }
    }

    /// Whether a cell at `column` repeats this one and overwrites its slot.
    pub fn is_repeated_by(&self, column: u32) -> bool {
        !self.recovered && self.column == column
    }
}

/// Where the next value goes in the row buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Push `gap` placeholders, then the value
    Append { gap: usize },
    /// Overwrite an existing slot (same column reported twice)
    Replace(usize),
}

/// A gap-detection contract a decoder satisfies.
pub trait GapStrategy {
    /// Build the strategy for a new session.
    fn from_config(config: &SessionConfig) -> Self
    where
        Self: Sized;

    /// Placement of a present cell at 1-based `column`.
    ///
    /// `filled` is the current length of the row buffer.
    fn place(
        &mut self,
        row: u32,
        column: u32,
        last: Option<LastPlaced>,
        filled: usize,
    ) -> Result<Placement>;

    /// Placement of an explicitly signalled missing cell.
    fn place_missing(
        &mut self,
        row: u32,
        column: u32,
        last: Option<LastPlaced>,
        filled: usize,
    ) -> Result<Placement> {
        self.place(row, column, last, filled)
    }

    /// Placeholders to append when an accepted row closes.
    fn close_row(&mut self, last: Option<LastPlaced>, filled: usize) -> usize;
}

/// Gap strategy for decoders that signal every missing cell.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExplicitGaps;

impl GapStrategy for ExplicitGaps {
    fn from_config(_config: &SessionConfig) -> Self {
        ExplicitGaps
    }

    fn place(
        &mut self,
        row: u32,
        column: u32,
        last: Option<LastPlaced>,
        filled: usize,
    ) -> Result<Placement> {
        let expected = u32::try_from(filled).unwrap_or(u32::MAX).saturating_add(1);
        if column == expected {
            return Ok(Placement::Append { gap: 0 });
        }
        if let Some(last) = last
            && last.is_repeated_by(column)
        {
            return Ok(Placement::Replace(last.slot));
        }
        if column < expected {
            Err(Error::NegativeGap {
                previous: expected - 1,
                current: column,
            })
        } else {
            Err(Error::UnsignalledGap {
                row,
                expected,
                found: column,
            })
        }
    }

    fn close_row(&mut self, _last: Option<LastPlaced>, _filled: usize) -> usize {
        0
    }
}

/// Gap strategy for decoders that report only present cells.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceInference {
    pad_to_header: bool,
    /// Last column of the session's first accepted row
    header_width: Option<u32>,
}

impl ReferenceInference {
    pub fn new(pad_to_header: bool) -> Self {
        Self {
            pad_to_header,
            header_width: None,
        }
    }

    pub fn header_width(&self) -> Option<u32> {
        self.header_width
    }
}

impl GapStrategy for ReferenceInference {
    fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.pad_to_header)
    }

    fn place(
        &mut self,
        _row: u32,
        column: u32,
        last: Option<LastPlaced>,
        _filled: usize,
    ) -> Result<Placement> {
        match last {
            Some(last) if last.is_repeated_by(column) => Ok(Placement::Replace(last.slot)),
            Some(last) if last.recovered && last.column == column => {
                Ok(Placement::Append { gap: 0 })
            },
            Some(last) => Ok(Placement::Append {
                gap: fill_between_indices(last.column, column)?,
            }),
            None => Ok(Placement::Append {
                gap: fill_between_indices(0, column)?,
            }),
        }
    }

    fn close_row(&mut self, last: Option<LastPlaced>, _filled: usize) -> usize {
        let last_column = last.map_or(0, |l| l.column);
        match self.header_width {
            None => {
                self.header_width = Some(last_column);
                0
            },
            Some(width) if self.pad_to_header => pad_trailing_indices(width, last_column),
            Some(_) => 0,
        }
    }
}

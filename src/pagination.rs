use crate::error::{AppError, AppResult};

pub const DEFAULT_FROM: i64 = 0;
pub const DEFAULT_SIZE: i64 = 10;
pub const MAX_SIZE: i64 = 20;

/// Offset/limit window over an ordered result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    offset: u32,
    size: u32,
}

impl Page {
    /// `from >= 0`, `1 <= size <= 20`.
    pub fn new(from: i64, size: i64) -> AppResult<Self> {
        if from < 0 {
            return Err(AppError::InvalidData(format!(
                "Parameter from must be >= 0, got {}",
                from
            )));
        }
        if !(1..=MAX_SIZE).contains(&size) {
            return Err(AppError::InvalidData(format!(
                "Parameter size must be between 1 and {}, got {}",
                MAX_SIZE, size
            )));
        }
        let offset = u32::try_from(from)
            .map_err(|_| AppError::InvalidData(format!("Parameter from is too large: {}", from)))?;
        Ok(Self {
            offset,
            size: size as u32,
        })
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn size(&self) -> u32 {
        self.size
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            offset: DEFAULT_FROM as u32,
            size: DEFAULT_SIZE as u32,
        }
    }
}

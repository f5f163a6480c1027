// Register addresses for the DMARD09
pub const REG_CTRL: u8 = 0x00;
pub const REG_DATA: u8 = 0x01;
/// Status byte pair followed by the X, Y and Z words
pub const REG_STAT: u8 = 0x0A;
pub const REG_CHIPID: u8 = 0x18;
pub const REG_CONTROL: u8 = 0x1D;

pub const CHIPID_VALUE: u8 = 0x95;

/// Bytes in one status/data block read from `REG_STAT`
pub const BUF_DATA_LEN: usize = 8;

/// Registers that may be read through the debug register interface
pub fn is_readable_reg(reg: u8) -> bool {
    matches!(reg, REG_CHIPID | REG_DATA | REG_CTRL | REG_CONTROL)
}

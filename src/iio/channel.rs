/// Channel measurement type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChanType {
    Accel,
}

impl ChanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChanType::Accel => "accel",
        }
    }
}

/// Channel modifier, used when `modified` is set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    None,
    X,
    Y,
    Z,
}

impl Modifier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modifier::None => "",
            Modifier::X => "x",
            Modifier::Y => "y",
            Modifier::Z => "z",
        }
    }
}

/// Kind of value a consumer can query on a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChanInfo {
    Raw = 0,
    Scale = 1,
}

impl ChanInfo {
    pub const ALL: [ChanInfo; 2] = [ChanInfo::Raw, ChanInfo::Scale];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChanInfo::Raw => "raw",
            ChanInfo::Scale => "scale",
        }
    }
}

/// Bit set of [`ChanInfo`] values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InfoMask(u32);

impl InfoMask {
    pub const NONE: InfoMask = InfoMask(0);

    pub const fn bit(info: ChanInfo) -> Self {
        InfoMask(1 << info as u32)
    }

    pub const fn with(self, info: ChanInfo) -> Self {
        InfoMask(self.0 | 1 << info as u32)
    }

    pub fn contains(&self, info: ChanInfo) -> bool {
        self.0 & (1 << info as u32) != 0
    }
}

/// Static description of one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChanSpec {
    pub chan_type: ChanType,
    pub modified: bool,
    pub channel2: Modifier,
    /// Driver-private value, handed back untouched in `read_raw`
    pub address: usize,
    pub info_mask_separate: InfoMask,
    pub info_mask_shared_by_type: InfoMask,
}

impl ChanSpec {
    /// sysfs-style attribute name for `info`, e.g. `in_accel_x_raw` for a
    /// per-channel value or `in_accel_scale` for a type-wide one.
    pub fn attr_name(&self, info: ChanInfo, shared_by_type: bool) -> String {
        if shared_by_type || !self.modified {
            format!("in_{}_{}", self.chan_type.as_str(), info.as_str())
        } else {
            format!(
                "in_{}_{}_{}",
                self.chan_type.as_str(),
                self.channel2.as_str(),
                info.as_str()
            )
        }
    }
}

/// How `read_raw` filled its output values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IioVal {
    /// `val` holds an integer; `val2` is unused
    Int,
}

//! X-line configuration: enforcement presentation, sweep cadence and
//! static lines loaded at startup.

use serde::Deserialize;

use crate::xline::{EnforcementOptions, LineType, XLine};

/// `[xlines]` block.
#[derive(Debug, Clone, Deserialize)]
pub struct XLinesConfig {
    /// Notice sent to a banned client before it is disconnected.
    #[serde(default)]
    pub banner: Option<String>,
    /// Show only "X-Lined" as the public quit message, keeping the reason
    /// for operators.
    #[serde(default)]
    pub hide_bans: bool,
    /// Seconds between expiry sweeps and pending-line application.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval: u64,
    #[serde(default)]
    pub gline: Vec<StaticLine>,
    #[serde(default)]
    pub kline: Vec<StaticLine>,
    #[serde(default)]
    pub zline: Vec<StaticLine>,
    #[serde(default)]
    pub qline: Vec<StaticLine>,
    /// E-lines. Reloading these replaces every E-line in the store.
    #[serde(default)]
    pub exception: Vec<StaticLine>,
}

impl Default for XLinesConfig {
    fn default() -> Self {
        Self {
            banner: None,
            hide_bans: false,
            sweep_interval: default_sweep_interval(),
            gline: Vec::new(),
            kline: Vec::new(),
            zline: Vec::new(),
            qline: Vec::new(),
            exception: Vec::new(),
        }
    }
}

fn default_sweep_interval() -> u64 {
    5
}

impl XLinesConfig {
    pub fn enforcement_options(&self) -> EnforcementOptions {
        EnforcementOptions {
            banner: self.banner.clone(),
            hide_bans: self.hide_bans,
        }
    }

    /// Static ban blocks with their line types.
    pub fn ban_blocks(&self) -> [(LineType, &[StaticLine]); 4] {
        [
            (LineType::Gline, self.gline.as_slice()),
            (LineType::Kline, self.kline.as_slice()),
            (LineType::Zline, self.zline.as_slice()),
            (LineType::Qline, self.qline.as_slice()),
        ]
    }

    /// Static ban lines, stamped with `now` as their set time.
    pub fn ban_lines(&self, now: i64) -> Vec<XLine> {
        self.ban_blocks()
            .into_iter()
            .flat_map(|(line_type, block)| block.iter().map(move |entry| entry.to_line(line_type, now)))
            .collect()
    }

    /// Configured E-lines, stamped with `now` as their set time.
    pub fn exception_lines(&self, now: i64) -> Vec<XLine> {
        self.exception
            .iter()
            .map(|entry| entry.to_line(LineType::Eline, now))
            .collect()
    }
}

/// One `[[xlines.<type>]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct StaticLine {
    pub mask: String,
    #[serde(default = "default_reason")]
    pub reason: String,
    /// Seconds; zero is permanent.
    #[serde(default)]
    pub duration: u64,
    #[serde(default = "default_source")]
    pub source: String,
}

fn default_reason() -> String {
    "No reason".to_string()
}

fn default_source() -> String {
    "<config>".to_string()
}

impl StaticLine {
    pub fn to_line(&self, line_type: LineType, now: i64) -> XLine {
        XLine::new(
            line_type,
            &self.mask,
            now,
            self.duration,
            self.source.as_str(),
            self.reason.as_str(),
        )
    }
}

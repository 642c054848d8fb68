//! BS / CS110 transponder table filled from NIT transport stream ids

use clap::ValueEnum;
use serde::Serialize;

use crate::constants::*;

/// How relative TS numbers are assigned on BS transponders before output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SortMethod {
    /// Slot taken from the low three bits of the TSID
    #[default]
    #[value(name = "low-bits")]
    ByTsidLowBits,
    /// Shift so the first valid TSID sits in slot 0, gaps kept
    #[value(name = "shift")]
    ShiftToZero,
    /// Valid TSIDs packed to the front
    #[value(name = "compact")]
    Compact,
}

/// One transponder with its eight relative TS slots
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transponder {
    pub transponder: String,
    pub number: u32,
    pub frequency_idx: u32,
    pub frequency_khz: u32,
    pub frequency_if_khz: u32,
    pub has_lock: bool,
    /// 0xFFFF marks an empty slot
    pub transport_stream_id: [u16; RELATIVE_TS_SLOTS],
}

impl Transponder {
    fn new(transponder: String, number: u32, frequency_idx: u32, frequency_khz: u32) -> Self {
        Self {
            transponder,
            number,
            frequency_idx,
            frequency_khz,
            frequency_if_khz: frequency_khz - LNB_LOCAL_FREQUENCY_KHZ,
            has_lock: false,
            transport_stream_id: [INVALID_TSID; RELATIVE_TS_SLOTS],
        }
    }

    /// BS transponder `number` (odd, 1..=23)
    fn bs(number: u32) -> Self {
        let idx = (number - 1) / 2;
        Self::new(
            format!("BS{number}"),
            number,
            idx,
            BS_BASE_FREQUENCY_KHZ + idx * BS_CHANNEL_STEP_KHZ,
        )
    }

    /// CS110 transponder `number` (even, 2..=24)
    fn cs(number: u32) -> Self {
        let idx = (number - 2) / 2 + BS_TRANSPONDERS as u32;
        Self::new(
            format!("ND{number}"),
            number,
            idx,
            CS_BASE_FREQUENCY_KHZ + (idx - BS_TRANSPONDERS as u32) * CS_CHANNEL_STEP_KHZ,
        )
    }

    fn set_transport_stream_id(&mut self, tsid: u16) {
        self.has_lock = true;
        self.transport_stream_id[(tsid & 0x07) as usize] = tsid;
    }

    /// Valid TSIDs with their slot numbers
    pub fn streams(&self) -> impl Iterator<Item = (usize, u16)> + '_ {
        self.transport_stream_id
            .iter()
            .copied()
            .enumerate()
            .filter(|&(_, tsid)| tsid != INVALID_TSID)
    }

    pub fn sort_relative_ts_number(&mut self, method: SortMethod) {
        let old = self.transport_stream_id;
        let mut slots = [INVALID_TSID; RELATIVE_TS_SLOTS];
        match method {
            SortMethod::ByTsidLowBits => {
                for tsid in old.into_iter().filter(|&t| t != INVALID_TSID) {
                    slots[(tsid & 0x07) as usize] = tsid;
                }
            }
            SortMethod::ShiftToZero => match old.iter().position(|&t| t != INVALID_TSID) {
                Some(first) => slots[..RELATIVE_TS_SLOTS - first].copy_from_slice(&old[first..]),
                None => return,
            },
            SortMethod::Compact => {
                for (slot, tsid) in slots.iter_mut().zip(old.into_iter().filter(|&t| t != INVALID_TSID)) {
                    *slot = tsid;
                }
            }
        }
        self.transport_stream_id = slots;
    }
}

/// All BS and CS110 transponders, in frequency order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelRegistry {
    #[serde(rename = "BS")]
    bs: Vec<Transponder>,
    #[serde(rename = "CS")]
    cs: Vec<Transponder>,
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelRegistry {
    /// Empty BS table; CS110 is preset since a BS capture never carries it.
    pub fn new() -> Self {
        let mut registry = Self {
            bs: (0..BS_TRANSPONDERS as u32).map(|i| Transponder::bs(2 * i + 1)).collect(),
            cs: (0..CS_TRANSPONDERS as u32).map(|i| Transponder::cs(2 * i + 2)).collect(),
        };
        for &tsid in CS_PRESET_TSIDS {
            registry.set_transport_stream_id(tsid);
        }
        registry
    }

    /// Files `tsid` under its transponder; false when it names none.
    pub fn set_transport_stream_id(&mut self, tsid: u16) -> bool {
        if tsid == 0 || tsid == INVALID_TSID {
            return false;
        }
        let number = ((tsid & 0x01F0) >> 4) as usize;
        let transponder = match number {
            1..=24 if number % 2 == 1 => &mut self.bs[(number - 1) / 2],
            1..=24 => &mut self.cs[(number - 2) / 2],
            _ => {
                log::debug!("TSID 0x{tsid:04X} maps to no transponder");
                return false;
            }
        };
        transponder.set_transport_stream_id(tsid);
        true
    }

    /// Applies `method` to every BS transponder.
    pub fn sort_relative_ts_number(&mut self, method: SortMethod) {
        for t in &mut self.bs {
            t.sort_relative_ts_number(method);
        }
    }

    pub fn bs(&self) -> &[Transponder] {
        &self.bs
    }

    pub fn cs(&self) -> &[Transponder] {
        &self.cs
    }
}

//! Channel table output in tuner / recorder configuration formats

use std::fmt::Write;

use anyhow::bail;
use clap::ValueEnum;
use encoding_rs::SHIFT_JIS;
use serde::Serialize;

use crate::constants::INVALID_TSID;
use crate::registry::{ChannelRegistry, SortMethod, Transponder};

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    #[value(name = "json")]
    Json,
    /// libdvbv5 channel file, IF frequencies
    #[value(name = "dvbv5")]
    Dvbv5,
    /// libdvbv5 channel file with LNB, RF frequencies
    #[value(name = "dvbv5lnb")]
    Dvbv5Lnb,
    #[value(name = "mirakurun")]
    Mirakurun,
    /// BonDriver_DVB (Linux)
    #[value(name = "bondvb")]
    BonDvb,
    /// BonDriver_LinuxPT
    #[value(name = "bonpt")]
    BonPt,
    /// BonDriver_LinuxPTX
    #[value(name = "bonptx")]
    BonPtx,
    /// BonDriver_PX4 ChSet.txt
    #[value(name = "bonpx4")]
    BonPx4,
    /// BonDriver_PX3
    #[value(name = "bonpx3")]
    BonPx3,
    /// BonDriver_BDA
    #[value(name = "bonbda")]
    BonBda,
    /// BonDriver_PlexPX
    #[value(name = "bonplexpx")]
    BonPlexPx,
}

/// Byte encoding of the rendered text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    /// Shift_JIS as used by Windows (CP932)
    Cp932,
    /// UTF-16LE preceded by the FF FE byte order mark
    Utf16LeBom,
}

impl Format {
    /// File name pattern; `%` escapes are expanded with the local date
    fn file_name_pattern(self) -> &'static str {
        match self {
            Format::Json => "tsids%y%m%d.json",
            Format::Dvbv5 => "dvbv5_channels_isdbs.conf",
            Format::Dvbv5Lnb => "dvbv5_channels_isdbs_lnb.conf",
            Format::Mirakurun => "channels%y%m%d.yml",
            Format::BonDvb => "BonDriver_DVB-S.conf",
            Format::BonPt => "BonDriver_LinuxPT-S.conf",
            Format::BonPtx => "BonDriver_LinuxPTX-S.ini",
            Format::BonPx4 => "BonDriver_PX4-S.ChSet.txt",
            Format::BonPx3 => "BonDriver_PX3_S.ini",
            Format::BonBda => "BonDriver_BDA_S.ini",
            Format::BonPlexPx => "BonDriver_PlexPX_S.ini",
        }
    }

    /// Output file name used when none is given
    pub fn default_file_name(self) -> String {
        let pattern = self.file_name_pattern();
        if pattern.contains('%') {
            chrono::Local::now().format(pattern).to_string()
        } else {
            pattern.to_string()
        }
    }

    /// Drivers that address a stream by its relative TS number want them
    /// starting at zero.
    pub fn default_sort(self) -> SortMethod {
        match self {
            Format::BonPt | Format::BonPtx => SortMethod::ShiftToZero,
            _ => SortMethod::ByTsidLowBits,
        }
    }

    pub fn encoding(self) -> TextEncoding {
        match self {
            Format::BonPx4 | Format::BonBda | Format::BonPlexPx => TextEncoding::Cp932,
            Format::BonPx3 => TextEncoding::Utf16LeBom,
            _ => TextEncoding::Utf8,
        }
    }
}

/// Renders `registry` in `format`, encoded as the target expects.
pub fn render(format: Format, registry: &ChannelRegistry) -> anyhow::Result<Vec<u8>> {
    let text = match format {
        Format::Json => json(registry)?,
        Format::Dvbv5 => dvbv5(registry, false)?,
        Format::Dvbv5Lnb => dvbv5(registry, true)?,
        Format::Mirakurun => mirakurun(registry)?,
        Format::BonDvb => bondriver_linux(registry, LastColumn::Tsid)?,
        Format::BonPt => bondriver_linux(registry, LastColumn::TsNumber)?,
        Format::BonPtx => bondriver_ptx(registry)?,
        Format::BonPx4 => bondriver_px4(registry)?,
        Format::BonPx3 => bondriver_px3(registry)?,
        Format::BonBda => bondriver_bda(registry, BDA_HEADER)?,
        Format::BonPlexPx => bondriver_bda(registry, PLEX_PX_HEADER)?,
    };
    encode(&text, format.encoding())
}

fn encode(text: &str, encoding: TextEncoding) -> anyhow::Result<Vec<u8>> {
    Ok(match encoding {
        TextEncoding::Utf8 => text.as_bytes().to_vec(),
        TextEncoding::Cp932 => {
            let (bytes, _, had_errors) = SHIFT_JIS.encode(text);
            if had_errors {
                bail!("output contains characters not representable in CP932");
            }
            bytes.into_owned()
        }
        TextEncoding::Utf16LeBom => {
            let mut bytes = vec![0xFF, 0xFE];
            bytes.extend(text.encode_utf16().flat_map(u16::to_le_bytes));
            bytes
        }
    })
}

/// Locked BS transponders, one item per valid relative TS slot
fn bs_streams(registry: &ChannelRegistry) -> impl Iterator<Item = (&Transponder, usize, u16)> {
    registry
        .bs()
        .iter()
        .filter(|t| t.has_lock)
        .flat_map(|t| t.streams().map(move |(slot, tsid)| (t, slot, tsid)))
}

/// Locked CS transponders with a TSID in slot 0
fn cs_streams(registry: &ChannelRegistry) -> impl Iterator<Item = (&Transponder, u16)> {
    registry
        .cs()
        .iter()
        .filter(|t| t.has_lock && t.transport_stream_id[0] != INVALID_TSID)
        .map(|t| (t, t.transport_stream_id[0]))
}

fn json(registry: &ChannelRegistry) -> anyhow::Result<String> {
    let mut out = Vec::new();
    let fmt = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut out, fmt);
    registry.serialize(&mut ser)?;
    Ok(String::from_utf8(out)?)
}

fn dvbv5(registry: &ChannelRegistry, lnb: bool) -> anyhow::Result<String> {
    let mut out = String::new();
    let lnb_line = if lnb { "\tLNB = 110BS\n" } else { "" };
    let frequency = |t: &Transponder| if lnb { t.frequency_khz } else { t.frequency_if_khz };

    for (t, slot, tsid) in bs_streams(registry) {
        write!(
            out,
            "[BS{:02}_{slot}]\n\tDELIVERY_SYSTEM = ISDBS\n{lnb_line}\tFREQUENCY = {}\n\tSTREAM_ID = {tsid}\n",
            t.number,
            frequency(t)
        )?;
    }
    for (t, tsid) in cs_streams(registry) {
        write!(
            out,
            "[CS{}]\n\tDELIVERY_SYSTEM = ISDBS\n{lnb_line}\tFREQUENCY = {}\n\tSTREAM_ID = {tsid}\n",
            t.number,
            frequency(t)
        )?;
    }
    Ok(out)
}

fn mirakurun(registry: &ChannelRegistry) -> anyhow::Result<String> {
    let mut out = String::new();
    for (t, slot, _) in bs_streams(registry) {
        let name = format!("BS{:02}_{slot}", t.number);
        write!(out, "- name: {name}\n  type: BS\n  channel: {name}\n  isDisabled: false\n")?;
    }
    for (t, _) in cs_streams(registry) {
        let name = format!("CS{}", t.number);
        write!(out, "- name: {name}\n  type: CS\n  channel: {name}\n  isDisabled: false\n")?;
    }
    Ok(out)
}

/// What the last column of a BonDriver_DVB / LinuxPT line carries
#[derive(Clone, Copy)]
enum LastColumn {
    Tsid,
    TsNumber,
}

fn bondriver_linux(registry: &ChannelRegistry, last: LastColumn) -> anyhow::Result<String> {
    let column = |slot: usize, tsid: u16| match last {
        LastColumn::Tsid => format!("0x{tsid:x}"),
        LastColumn::TsNumber => slot.to_string(),
    };

    let mut out = String::from("#ISDB_S\n; BS\n");
    let mut bonch = 0;
    for (t, slot, tsid) in bs_streams(registry) {
        writeln!(
            out,
            "BS{:02}/TS{slot}\t{bonch}\t{}\t{}",
            t.number,
            t.frequency_idx,
            column(slot, tsid)
        )?;
        bonch += 1;
    }

    out.push_str("\n; CS110\n");
    for (t, tsid) in cs_streams(registry) {
        writeln!(
            out,
            "ND{:02}\t{bonch}\t{}\t{}",
            t.number,
            t.frequency_idx,
            column(0, tsid)
        )?;
        bonch += 1;
    }
    Ok(out)
}

fn bondriver_ptx(registry: &ChannelRegistry) -> anyhow::Result<String> {
    let mut out =
        String::from("[Space.BS]\nName=BS\nSystem=ISDB-S\n\n[Space.BS.Channel]\n");
    for (bonch, (t, slot, _)) in bs_streams(registry).enumerate() {
        writeln!(out, "Ch{bonch}=BS{:02}/TS{slot},{},{slot}", t.number, t.frequency_idx)?;
    }

    out.push_str("\n[Space.CS110]\nName=CS110\nSystem=ISDB-S\n\n[Space.CS110.Channel]\n");
    for (bonch, (t, _)) in cs_streams(registry).enumerate() {
        writeln!(out, "Ch{bonch}=ND{:02}/TS0,{},0", t.number, t.frequency_idx)?;
    }
    Ok(out)
}

const PX4_HEADER: &str = ";\r\n\
; BonDriver_PX4 チャンネル定義ファイル (ISDB-S) (日本における衛星波デジタル放送用)\r\n\
; (BonDriver_PT3-STのChSet.txtと互換性あり)\r\n\
;\r\n\
; チャンネル空間定義 ($チャンネル空間名<TAB>チャンネル空間ID)\r\n\
$BS\t0\r\n\
$CS110\t1\r\n\
;\r\n\
; チャンネル定義 (チャンネル名<TAB>チャンネル空間ID<TAB>チャンネルID<TAB>PTX内部チャンネルID<TAB>TSID(ISDB-S用))\r\n";

fn bondriver_px4(registry: &ChannelRegistry) -> anyhow::Result<String> {
    let mut out = String::from(PX4_HEADER);

    out.push_str("; [BS]\r\n");
    for (bonch, (t, slot, tsid)) in bs_streams(registry).enumerate() {
        write!(
            out,
            "BS{:02}/TS{slot}\t0\t{bonch}\t{}\t{tsid}\r\n",
            t.number, t.frequency_idx
        )?;
    }

    out.push_str("; [CS]\r\n");
    for (bonch, (t, tsid)) in cs_streams(registry).enumerate() {
        write!(out, "ND{:02}\t1\t{bonch}\t{}\t{tsid}\r\n", t.number, t.frequency_idx)?;
    }
    Ok(out)
}

/// Channel column of the PX3 CS110 table, by position
const PX3_CS_CHANNELS: [u32; 12] = [237, 100, 221, 55, 228, 260, 251, 290, 240, 307, 160, 257];

fn bondriver_px3(registry: &ChannelRegistry) -> anyhow::Result<String> {
    let mut out = String::new();

    write!(out, "[BS]\r\nCHANNEL_NUM = {}\r\n", bs_streams(registry).count())?;
    for (i, (t, slot, tsid)) in bs_streams(registry).enumerate() {
        write!(
            out,
            "CH{:03} = BS{:02}/TS{slot},0,{},0x{tsid:x}\r\n",
            i + 1,
            t.number,
            t.frequency_khz
        )?;
    }

    write!(out, "\r\n[CS110]\r\nCHANNEL_NUM = {}\r\n", registry.cs().len())?;
    let locked = registry.cs().iter().filter(|t| t.has_lock);
    for (i, (t, channel)) in locked.zip(PX3_CS_CHANNELS).enumerate() {
        write!(
            out,
            "CH{:03} = ND{:02},{channel:03},{},0x0\r\n",
            i + 1,
            t.number,
            t.frequency_khz
        )?;
    }
    Ok(out)
}

const BDA_HEADER: &str = "[Tuner]\r\n\
Guid=\r\n\
FriendlyName0=\r\n\
Name=\"ISDB-S\"\r\n\
DVBSystemType=\"DVB-T\"\r\n\
DefaultNetwork=\"BS/CS110\"\r\n\
\r\n\
[BonDriver]\r\n\
DebugLog=NO\r\n\
; 録画用として使用する場合でCPU高負荷時等バッファーオーバーランによるDropが発生する場合は下記を調整すると効果があるかもしれません\r\n\
;ThreadPriorityStream=\"THREAD_PRIORITY_HIGHEST\"\r\n\
\r\n\
[Channel]\r\n\
ReserveUnusedCh=NO\r\n\
\r\n";

const PLEX_PX_HEADER: &str = "; PX-Q3PE/W3PE/W3PEV2/W3U3/W3U3V2/W3U2/S3U2用の衛星放送iniファイル\r\n\
[PlexPX]\r\n\
UseKnownGUID=YES\r\n\
ISDB-S=YES\r\n\
M2_Dec=NO\r\n\
\r\n\
[Tuner]\r\n\
Guid=\r\n\
FriendlyName0=\"HDTV_PX_W3PE BDA Digital Tuner_0\"\r\n\
FriendlyName1=\"HDTV_PX_W3PE BDA Digital Tuner_1\"\r\n\
FriendlyName2=\"HDTV_PX_W3U2 BDA Digital Tuner_0\"\r\n\
FriendlyName3=\"HDTV_PX_S3U2 BDA Digital Tuner_0\"\r\n\
FriendlyName4=\"HDTV_PX_W3U3 BDA Digital Tuner_0\"\r\n\
FriendlyName5=\"HDTV_PX_Q3PE BDA Digital Tuner_0\"\r\n\
FriendlyName6=\"HDTV_PX_Q3PE BDA Digital Tuner_1\"\r\n\
FriendlyName7=\"HDTV_PX_Q3PE BDA Digital Tuner_4\"\r\n\
FriendlyName8=\"HDTV_PX_Q3PE BDA Digital Tuner_5\"\r\n\
FriendlyName9=\"HDTV_PX_W3U3_V2 BDA Digital Tuner_0\"\r\n\
FriendlyName10=\"HDTV_PX_W3U3_V2 BDA Digital Tuner_2\"\r\n\
FriendlyName11=\"HDTV_PX_W3PEV2 BDA Digital Tuner_0\"\r\n\
FriendlyName12=\"HDTV_PX_W3PEV2 BDA Digital Tuner_4\"\r\n\
CaptureFriendlyName0=\"HDTV_PX_W3PE BDA Digital Capture_0\"\r\n\
CaptureFriendlyName1=\"HDTV_PX_W3PE BDA Digital Capture_1\"\r\n\
CaptureFriendlyName2=\"HDTV_PX_W3U2 BDA Digital Capture_0\"\r\n\
CaptureFriendlyName3=\"HDTV_PX_S3U2 BDA Digital Capture_0\"\r\n\
CaptureFriendlyName4=\"HDTV_PX_W3U3 BDA Digital Capture_0\"\r\n\
CaptureFriendlyName5=\"HDTV_PX_Q3PE BDA Digital Capture_0\"\r\n\
CaptureFriendlyName6=\"HDTV_PX_Q3PE BDA Digital Capture_1\"\r\n\
CaptureFriendlyName7=\"HDTV_PX_Q3PE BDA Digital Capture_4\"\r\n\
CaptureFriendlyName8=\"HDTV_PX_Q3PE BDA Digital Capture_5\"\r\n\
CaptureFriendlyName9=\"HDTV_PX_W3U3_V2 BDA Digital Capture_0\"\r\n\
CaptureFriendlyName10=\"HDTV_PX_W3U3_V2 BDA Digital Capture_2\"\r\n\
CaptureFriendlyName11=\"HDTV_PX_W3PEV2 BDA Digital Capture_0\"\r\n\
CaptureFriendlyName12=\"HDTV_PX_W3PEV2 BDA Digital Capture_4\"\r\n\
Name=\"PlexPX-S\"\r\n\
UseSpecial=\"PlexPX\"\r\n\
DVBSystemType=\"DVB-T\"\r\n\
DefaultNetwork=\"UHF/CATV\"\r\n\
\r\n\
[BonDriver]\r\n\
DebugLog=NO\r\n\
BuffSize=1024\r\n\
MaxBuffCount=512\r\n\
WaitTsCount=1\r\n\
WaitTsSleep=100\r\n\
; 録画用として使用する場合でCPU高負荷時等バッファーオーバーランによるDropが発生する場合は下記を調整すると効果があるかもしれません\r\n\
;ThreadPriorityDecode=\"THREAD_PRIORITY_ABOVE_NORMAL\"\r\n\
;ThreadPriorityStream=\"THREAD_PRIORITY_HIGHEST\"\r\n\
\r\n\
[Channel]\r\n\
ReserveUnusedCh=NO\r\n\
\r\n";

/// BonDriver_BDA style ini; the header differs per driver
fn bondriver_bda(registry: &ChannelRegistry, header: &str) -> anyhow::Result<String> {
    let mut out = String::from(header);

    out.push_str("[TuningSpace00]\r\nTuningSpaceName=\"BS\"\r\n");
    for (bonch, (t, slot, tsid)) in bs_streams(registry).enumerate() {
        write!(
            out,
            "CH{bonch:03}=1,{:.3},R,0,BS{:02}/TS{slot},0x0,0x{tsid:x}\r\n",
            t.frequency_khz as f64 / 1000.0,
            t.number
        )?;
    }

    out.push_str("\r\n[TuningSpace01]\r\nTuningSpaceName=\"CS110\"\r\n");
    let locked = registry.cs().iter().filter(|t| t.has_lock);
    for (bonch, t) in locked.enumerate() {
        write!(
            out,
            "CH{bonch:03}=1,{:.3},R,0,ND{:02}/TS0,0x0,0x0\r\n",
            t.frequency_khz as f64 / 1000.0,
            t.number
        )?;
    }
    Ok(out)
}

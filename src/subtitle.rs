use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tokio::fs;
use tracing::{debug, info};

use crate::error::{Result, SubweaveError};

static INDEX_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d+$").expect("index regex is valid")
});

static TIMING_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+:\d{2}:\d{2}[,.]\d{3})\s*-->\s*(\d+:\d{2}:\d{2}[,.]\d{3})")
        .expect("timing regex is valid")
});

/// Millisecond-precision subtitle timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    pub fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    /// SRT time format (HH:MM:SS,mmm)
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hours = self.0 / 3_600_000;
        let minutes = (self.0 % 3_600_000) / 60_000;
        let secs = (self.0 % 60_000) / 1_000;
        let millis = self.0 % 1_000;

        write!(f, "{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
    }
}

impl FromStr for Timestamp {
    type Err = SubweaveError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || SubweaveError::Source(format!("Invalid SRT timestamp: {}", s));

        let (clock, millis) = s
            .trim()
            .split_once([',', '.'])
            .ok_or_else(invalid)?;
        let parts: Vec<&str> = clock.split(':').collect();
        if parts.len() != 3 || millis.len() != 3 {
            return Err(invalid());
        }

        let hours: u64 = parts[0].parse().map_err(|_| invalid())?;
        let minutes: u64 = parts[1].parse().map_err(|_| invalid())?;
        let secs: u64 = parts[2].parse().map_err(|_| invalid())?;
        let millis: u64 = millis.parse().map_err(|_| invalid())?;
        if minutes >= 60 || secs >= 60 {
            return Err(invalid());
        }

        hours
            .checked_mul(3_600_000)
            .and_then(|ms| ms.checked_add(minutes * 60_000 + secs * 1_000 + millis))
            .map(Self)
            .ok_or_else(invalid)
    }
}

/// One timed subtitle entry.
///
/// `index` is the identity of the cue: it is carried from the source file
/// through translation and is the key used to join translated lines back
/// onto their timings. It is stored numerically, so a zero-padded index
/// such as `007` is written back as `7`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    pub index: u32,
    pub start: Timestamp,
    pub end: Timestamp,
    pub text: String,
}

impl Cue {
    /// Build a cue, folding a multi-line body into a single line
    pub fn new(index: u32, start: Timestamp, end: Timestamp, text: &str) -> Self {
        Self {
            index,
            start,
            end,
            text: normalize_text(text),
        }
    }

    /// Copy of this cue with a different text body, timings untouched
    pub fn with_text(&self, text: &str) -> Self {
        Self::new(self.index, self.start, self.end, text)
    }
}

/// Trim every line and join the non-empty ones with a single space
pub fn normalize_text(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse SRT text into cues, in source order.
///
/// Blocks that do not contain an index line followed by a timing line and at
/// least one text line are skipped, as are blocks with an end time before
/// their start time or an index already seen earlier in the file.
pub fn parse(raw: &str) -> Vec<Cue> {
    let normalized = raw.trim_start_matches('\u{feff}').replace("\r\n", "\n").replace('\r', "\n");

    let mut cues: Vec<Cue> = Vec::new();
    let mut seen: HashSet<u32> = HashSet::new();
    let mut block: Vec<&str> = Vec::new();

    for line in normalized.lines().chain(std::iter::once("")) {
        if !line.trim().is_empty() {
            block.push(line);
            continue;
        }
        if block.is_empty() {
            continue;
        }

        match parse_block(&block) {
            Some(cue) if seen.contains(&cue.index) => {
                debug!("Skipping duplicate subtitle index {}", cue.index);
            }
            Some(cue) => {
                seen.insert(cue.index);
                cues.push(cue);
            }
            None => debug!("Skipping malformed subtitle block: {:?}", block.first()),
        }
        block.clear();
    }

    cues
}

fn parse_block(lines: &[&str]) -> Option<Cue> {
    // Tolerate stray lines ahead of the index inside the same block
    let header = lines.windows(2).position(|pair| {
        INDEX_REGEX.is_match(pair[0].trim()) && TIMING_REGEX.is_match(pair[1].trim())
    })?;

    let index: u32 = lines[header].trim().parse().ok()?;
    if index == 0 {
        return None;
    }

    let captures = TIMING_REGEX.captures(lines[header + 1].trim())?;
    let start: Timestamp = captures[1].parse().ok()?;
    let end: Timestamp = captures[2].parse().ok()?;
    if start > end {
        return None;
    }

    let text = normalize_text(&lines[header + 2..].join("\n"));
    if text.is_empty() {
        return None;
    }

    Some(Cue { index, start, end, text })
}

/// Render cues as SRT, one block per cue separated by a blank line
pub fn serialize(cues: &[Cue]) -> String {
    cues.iter()
        .map(|cue| format!("{}\n{} --> {}\n{}\n", cue.index, cue.start, cue.end, cue.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Read and parse an SRT file
pub async fn read_srt<P: AsRef<Path>>(path: P) -> Result<Vec<Cue>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(SubweaveError::FileNotFound(path.display().to_string()));
    }

    let raw = fs::read_to_string(path).await?;
    let cues = parse(&raw);
    info!("Parsed {} cues from {}", cues.len(), path.display());
    Ok(cues)
}

/// Write cues to an SRT file
pub async fn write_srt<P: AsRef<Path>>(cues: &[Cue], output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();
    info!("Writing SRT file: {}", output_path.display());

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    fs::write(output_path, serialize(cues)).await?;

    info!("SRT file written ({} cues)", cues.len());
    Ok(())
}

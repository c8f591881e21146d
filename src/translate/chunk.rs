use once_cell::sync::Lazy;
use regex::Regex;
use std::num::NonZeroUsize;

use crate::subtitle::Cue;

static NUMBERED_LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d+)\.\s*(.*?)\s*$").expect("numbered line regex is valid")
});

/// A contiguous run of cues sent to the model in one translation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// 0-based position of the chunk within the job
    pub position: usize,
    /// Indices of the cues in this chunk, in order
    pub indices: Vec<u32>,
    /// Cues rendered as `"<index>. <text>"` lines joined by newlines
    pub text: String,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Render a single cue as a numbered line
pub fn render_line(cue: &Cue) -> String {
    format!("{}. {}", cue.index, cue.text)
}

/// Split cues into chunks of at most `size` cues each.
///
/// Chunks cover the cue list contiguously and exhaustively; only the last one
/// may be short. An empty cue list yields no chunks.
pub fn partition(cues: &[Cue], size: NonZeroUsize) -> Vec<Chunk> {
    cues.chunks(size.get())
        .enumerate()
        .map(|(position, group)| Chunk {
            position,
            indices: group.iter().map(|cue| cue.index).collect(),
            text: group.iter().map(render_line).collect::<Vec<_>>().join("\n"),
        })
        .collect()
}

/// Split a `"<index>. <text>"` line into its index and text
pub fn parse_numbered_line(line: &str) -> Option<(u32, String)> {
    let captures = NUMBERED_LINE_REGEX.captures(line)?;
    let index = captures[1].parse().ok()?;
    Some((index, captures[2].to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subtitle::Timestamp;

    fn cues(count: u32) -> Vec<Cue> {
        (1..=count)
            .map(|i| {
                let start = Timestamp::from_millis(i as u64 * 1_000);
                let end = Timestamp::from_millis(i as u64 * 1_000 + 500);
                Cue::new(i, start, end, &format!("line {}", i))
            })
            .collect()
    }

    fn size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn test_empty_cues_yield_no_chunks() {
        assert!(partition(&[], size(50)).is_empty());
    }

    #[test]
    fn test_last_chunk_may_be_short() {
        let chunks = partition(&cues(3), size(2));
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "1. line 1\n2. line 2");
        assert_eq!(chunks[1].text, "3. line 3");
        assert_eq!(chunks[1].position, 1);
        assert_eq!(chunks[1].indices, vec![3]);
    }

    #[test]
    fn test_partition_is_complete_for_every_size() {
        let source = cues(17);
        for n in 1..=20 {
            let chunks = partition(&source, size(n));
            assert!(chunks.iter().all(|c| c.len() <= n && !c.is_empty()));

            let rebuilt: Vec<(u32, String)> = chunks
                .iter()
                .flat_map(|c| c.text.lines().map(|l| parse_numbered_line(l).unwrap()).collect::<Vec<_>>())
                .collect();
            let expected: Vec<(u32, String)> = source.iter().map(|c| (c.index, c.text.clone())).collect();
            assert_eq!(rebuilt, expected, "chunk size {}", n);
        }
    }

    #[test]
    fn test_parse_numbered_line() {
        assert_eq!(parse_numbered_line("12. Bonjour"), Some((12, "Bonjour".to_string())));
        assert_eq!(parse_numbered_line("  3.Fin  "), Some((3, "Fin".to_string())));
        assert_eq!(parse_numbered_line("4. 3. nested"), Some((4, "3. nested".to_string())));
        assert_eq!(parse_numbered_line("Here is the translation:"), None);
        assert_eq!(parse_numbered_line("1 missing dot"), None);
    }
}

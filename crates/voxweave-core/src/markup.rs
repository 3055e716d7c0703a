//! Transcript markup parsing
//!
//! Input is XML-like transcript text where each speaker turn is wrapped
//! in `<personN attr="value">...</personN>`. Anything else is either a
//! provider-supported SSML tag (passed through) or noise (stripped).
//! Parsing is tolerant: unsupported tags vanish, unclosed person tags
//! are re-closed, and malformed attributes are dropped.

use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::config::SpeakerConfig;
use crate::segment::SpeakerSegment;

fn any_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)</?([a-zA-Z][a-zA-Z0-9]*)\b[^>]*>").unwrap())
}

fn blank_lines_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n\s*\n").unwrap())
}

fn person_boundary_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<(/?)person(\d+)((?: [^>]*)?)>").unwrap())
}

fn person_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^person\d+$").unwrap())
}

fn turn_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<person(\d+)([^>]*)>(.*?)</person(\d+)>").unwrap())
}

fn attr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(\w+)="([^"]*)""#).unwrap())
}

/// Remove markup tags whose name is neither a supported SSML tag nor a
/// person tag, collapse the blank lines left behind, and re-close any
/// person tag missing its closing counterpart.
pub fn clean_markup(input: &str, supported_tags: &[&str]) -> String {
    let cleaned = any_tag_re().replace_all(input, |caps: &regex::Captures<'_>| {
        let name = &caps[1];
        let keep = person_name_re().is_match(name)
            || supported_tags.iter().any(|t| t.eq_ignore_ascii_case(name));
        if keep {
            caps[0].to_string()
        } else {
            String::new()
        }
    });

    let cleaned = blank_lines_re().replace_all(&cleaned, "\n");

    heal_person_tags(&cleaned).trim().to_string()
}

/// One person-tag occurrence in the text.
struct Boundary {
    start: usize,
    end: usize,
    is_close: bool,
    speaker: String,
}

/// Insert the missing closing tag for every person tag that lacks one.
///
/// A turn ends at its matching closing tag; an opening tag whose next
/// person-tag boundary is anything else is unclosed, and the closing
/// tag is inferred right before that boundary (or at end of input).
/// Tags inside a turn that are not person tags (surviving SSML) never
/// terminate it.
fn heal_person_tags(input: &str) -> String {
    let boundaries: Vec<Boundary> = person_boundary_re()
        .captures_iter(input)
        .map(|caps| {
            let m = caps.get(0).unwrap();
            Boundary {
                start: m.start(),
                end: m.end(),
                is_close: !caps[1].is_empty(),
                speaker: caps[2].to_string(),
            }
        })
        .collect();

    let mut healed = String::with_capacity(input.len());
    let mut cursor = 0;
    let mut i = 0;
    while i < boundaries.len() {
        let boundary = &boundaries[i];
        if boundary.is_close {
            // stray closing tag; carried through, never matched as a turn
            healed.push_str(&input[cursor..boundary.end]);
            cursor = boundary.end;
            i += 1;
            continue;
        }
        match boundaries.get(i + 1) {
            Some(next) if next.is_close && next.speaker == boundary.speaker => {
                healed.push_str(&input[cursor..next.end]);
                cursor = next.end;
                i += 2;
            }
            Some(next) => {
                healed.push_str(&input[cursor..next.start]);
                healed.push_str(&format!("</person{}>", boundary.speaker));
                cursor = next.start;
                i += 1;
            }
            None => {
                healed.push_str(&input[cursor..]);
                healed.push_str(&format!("</person{}>", boundary.speaker));
                cursor = input.len();
                i += 1;
            }
        }
    }
    healed.push_str(&input[cursor..]);
    healed
}

/// Parse attribute text with a quoted `key="value"` grammar.
///
/// Anything that does not match the grammar (unmatched quotes, bare
/// words) is silently dropped.
pub fn parse_attributes(attrs: &str) -> BTreeMap<String, String> {
    attr_re()
        .captures_iter(attrs)
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
        .collect()
}

/// Parse transcript text into ordered speaker segments.
///
/// Each `<personN>` occurrence becomes one segment in document order;
/// consecutive turns by the same speaker are never merged. Voice
/// configuration starts from the speaker's default and is overridden by
/// any attribute keys naming a known config field; the remaining
/// attributes stay in the segment parameter map. Input without any
/// person tag yields an empty list.
pub fn parse(
    input: &str,
    supported_tags: &[&str],
    speaker_configs: &HashMap<u32, SpeakerConfig>,
) -> Vec<SpeakerSegment> {
    let cleaned = clean_markup(input, supported_tags);

    let mut segments = Vec::new();
    for caps in turn_re().captures_iter(&cleaned) {
        let (open_id, close_id) = (&caps[1], &caps[4]);
        if open_id != close_id {
            debug!(
                "Dropping malformed turn: <person{}> closed by </person{}>",
                open_id, close_id
            );
            continue;
        }
        let Ok(speaker_id) = open_id.parse::<u32>() else {
            continue;
        };

        let parameters = parse_attributes(&caps[2]);

        let mut voice_config = speaker_configs
            .get(&speaker_id)
            .cloned()
            .unwrap_or_default();
        voice_config.apply_attr_overrides(&parameters);

        segments.push(SpeakerSegment::new(
            speaker_id,
            parameters,
            caps[3].trim().to_string(),
            voice_config,
        ));
    }

    debug!("Parsed {} speaker turns", segments.len());
    segments
}

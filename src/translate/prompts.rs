// Prompt text for the two model calls a job makes.
// Examples are deliberately written without code fences: a fenced example
// invites fenced answers, which the validator rejects.

pub const CONTEXT_SYSTEM_PROMPT: &str = "\
You are preparing a translation memory that keeps a subtitle translation into {target_language} consistent.
Read the full subtitle text and produce these sections, in this order:

Basis:
2-4 sentences summarizing what the video is about and how the narrative develops.

Glossary:
One line per important name, place, organization, technical term or recurring phrase, as
- <original term>: <translation in {target_language}, or the original if it must stay unchanged>

Voice:
Who is speaking, their register (formal, casual, technical), and how they address the audience.

Risks:
Idioms, jokes, wordplay, ambiguous references or anything else that is easy to mistranslate, with a short note on how to handle each.

Write plain text only. Do not use code blocks.";

pub const CONTEXT_USER_PROMPT: &str = "\
Generate the translation memory for translating these subtitles into {target_language}.
The full original subtitle text is:

{subtitle_full_text}";

pub const CHUNK_SYSTEM_PROMPT: &str = "\
You translate subtitle chunks line by line into {target_language}.
You receive a translation memory (summary, glossary, voice and risk notes) and a chunk of numbered lines, each prefixed with its subtitle index, e.g. \"101. Original text\".

Rules:
1. Translate every numbered line into {target_language}.
2. Keep the index prefix of every line exactly as given: \"101. Original text\" becomes \"101. <translation>\".
3. Output exactly one line per input line. Do not merge, split or omit lines.
4. Follow the translation memory for terminology and tone.
5. Lines that should not be translated (music cues, sound effects, names alone) are reproduced as they are, with their index.
6. Output only the numbered lines. No introduction, no explanation, no code blocks.

Example input:
101. This is a sentence.
102. Another important point.
103. ♪ instrumental music ♪

Example output for French:
101. Ceci est une phrase.
102. Un autre point important.
103. ♪ musique instrumentale ♪";

pub const CHUNK_USER_PROMPT: &str = "\
Translation memory:
{translation_memory}

---
Chunk to translate into {target_language} (keep the index prefixes):
{numbered_subtitle_lines}
---";

/// Appended to the chunk instruction after an answer failed validation
pub const RETRY_REMINDER: &str = "\n\nIMPORTANT: your previous answer was rejected because it contained a code block.
Answer with the numbered lines as plain text. Never use ``` or any other markup around them.";

/// Substitute `{name}` placeholders in a prompt template
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    values.iter().fold(template.to_string(), |acc, (key, value)| {
        acc.replace(&format!("{{{}}}", key), value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_replaces_every_occurrence() {
        let rendered = render(CONTEXT_SYSTEM_PROMPT, &[("target_language", "French")]);
        assert!(!rendered.contains("{target_language}"));
        assert!(rendered.matches("French").count() >= 2);
    }

    #[test]
    fn test_chunk_prompts_do_not_contain_fences() {
        assert!(!CHUNK_SYSTEM_PROMPT.contains("```"));
        assert!(!CHUNK_USER_PROMPT.contains("```"));
        assert!(!CONTEXT_SYSTEM_PROMPT.contains("```"));
    }

    #[test]
    fn test_retry_reminder_starts_on_its_own_line() {
        assert!(RETRY_REMINDER.starts_with("\n\nIMPORTANT:"));
        let combined = format!("{}{}", CHUNK_SYSTEM_PROMPT, RETRY_REMINDER);
        assert!(combined.contains("♪ musique instrumentale ♪\n\nIMPORTANT:"));
    }
}

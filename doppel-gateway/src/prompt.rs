//! Prompt construction for the response broker.

use doppel_core::{InboundMessage, PersonaProfile};

/// Style hints included per prompt; more dilutes rather than sharpens.
const MAX_STYLE_HINTS: usize = 5;

/// Build the single prompt string handed to every provider in the chain.
///
/// With a persona the provider is framed as impersonating that person,
/// seeded with their habitual phrases and emoji, and explicitly barred from
/// assistant-style disclaimers. Without one, a plain helpful framing is used.
pub fn build_prompt(message: &InboundMessage, persona: Option<&PersonaProfile>) -> String {
    let Some(persona) = persona else {
        return format!("Respond helpfully and briefly to: {}", message.text);
    };

    let phrases = persona.representative_phrases(MAX_STYLE_HINTS).join(", ");
    let emoji = persona.top_emoji(MAX_STYLE_HINTS).join(" ");

    format!(
        "You are {name}. Respond exactly like they would.\n\
         Never use AI assistant language, disclaimers, or offers to help further. \
         Be casual and natural.\n\n\
         Their style:\n\
         - Tone: {style}\n\
         - Common phrases: {phrases}\n\
         - Emojis used: {emoji}\n\n\
         {sender} says: \"{text}\"\n\n\
         Respond naturally as {name} would:",
        name = persona.display_name,
        style = persona.style_tag,
        phrases = phrases,
        emoji = emoji,
        sender = message.sender,
        text = message.text,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn persona_with_many_phrases() -> PersonaProfile {
        let mut persona = PersonaProfile::new("Alice");
        for i in 0..10 {
            persona.common_phrases.push(format!("phrase {i}"));
        }
        for (i, emoji) in ["😀", "😂", "😅", "😇", "😉", "😍"].iter().enumerate() {
            persona
                .emoji_frequency
                .insert(emoji.to_string(), (i + 1) as u32);
        }
        persona
    }

    #[test]
    fn test_plain_prompt_without_persona() {
        let message = InboundMessage::new("c1", "Bob", "what time is it?");
        let prompt = build_prompt(&message, None);

        assert!(prompt.contains("what time is it?"));
        assert!(!prompt.contains("Never use AI assistant language"));
    }

    #[test]
    fn test_persona_prompt_framing() {
        let persona = persona_with_many_phrases();
        let message = InboundMessage::new("c1", "Bob", "hey");
        let prompt = build_prompt(&message, Some(&persona));

        assert!(prompt.contains("You are Alice."));
        assert!(prompt.contains("Never use AI assistant language"));
        assert!(prompt.contains("Bob says: \"hey\""));
        assert!(prompt.contains("Respond naturally as Alice would:"));
    }

    #[test]
    fn test_persona_hints_are_capped() {
        let persona = persona_with_many_phrases();
        let message = InboundMessage::new("c1", "Bob", "hey");
        let prompt = build_prompt(&message, Some(&persona));

        // 10 phrases learned, at most 5 quoted.
        assert!(prompt.contains("phrase 0"));
        assert!(!prompt.contains("phrase 9"));

        // 6 emoji learned, at most 5 quoted; the least frequent is dropped.
        assert!(prompt.contains("😍"));
        assert!(!prompt.contains("😀"));
    }
}

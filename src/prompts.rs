//! Prompt templates for each Pal
//!
//! Every prompt ends by asking for the bare JSON object of the Pal's shape.

use crate::request::{AnalysisRequest, PalOptions};
use crate::shape::NoteMode;

const JSON_ONLY: &str = "IMPORTANT: Return ONLY the JSON object, no other text or formatting.";

/// Name and description of a roast intensity level
pub fn roast_level(intensity: u8) -> (&'static str, &'static str)
{   match intensity
    {   1 => ("Playful", "Light-hearted teasing, friendly banter")
      , 2 => ("Sassy", "Witty comebacks with a bit more bite")
      , 3 => ("Savage", "Sharp roasts that sting but are still fun")
      , 4 => ("Brutal", "Harsh truths delivered with no mercy")
      , _ => ("Career Ending", "Absolutely devastating, nuclear-level roasts")
    }
}

/// Label and writing register for a homework IQ level
pub fn iq_band(level: u16) -> (&'static str, &'static str)
{   match level
    {   0..=110 => ("High School Level", "Clear, straightforward explanations")
      , 111..=120 => ("College Freshman", "More detailed academic language")
      , 121..=130 => ("College Advanced", "Sophisticated analysis and reasoning")
      , 131..=140 => ("Graduate Level", "Complex theoretical frameworks")
      , 141..=150 => ("Expert Level", "Professional academic discourse")
      , _ => ("Genius Level", "Cutting-edge intellectual complexity")
    }
}

fn subject(request: &AnalysisRequest) -> &'static str
{   if request.image.is_some() { "image" } else { "content" }
}

fn input_line(request: &AnalysisRequest) -> String
{   if request.image.is_some()
    {   format!("Additional context: \"{}\"", request.text)
    } else
    {   format!("Content: \"{}\"", request.text)
    }
}

/// Build the prompt for `request`
pub fn build_prompt(request: &AnalysisRequest) -> String
{   match request.options
    {   PalOptions::Roast { intensity } => roast_prompt(request, intensity)
      , PalOptions::Homework { iq_level } => homework_prompt(request, iq_level)
      , PalOptions::Notes { mode } => notes_prompt(request, mode)
      , PalOptions::None => cringe_prompt(request)
    }
}

fn cringe_prompt(request: &AnalysisRequest) -> String
{   let based_on = if request.image.is_some() { " based on the image" } else { "" };
    format!(
r#"Analyze this {subject} for "cringe" vs "hot" (cool/fire) levels on a scale of 0-100.

{input}

You MUST provide your response as valid JSON only, with no markdown formatting or code blocks. Return ONLY this JSON structure:
{{
  "hotLevel": [0-100 number],
  "cringeLevel": [0-100 number],
  "analysis": "[brief explanation of why it's hot or cringe in a roasting, humorous manner{based_on}]",
  "tips": ["tip1", "tip2", "tip3"] (only include if cringeLevel > hotLevel)
}}

Hot means attractive, cool, fire, impressive, or awesome.
Cringe means awkward, embarrassing, or trying too hard.
If cringe level is high, provide exactly 3 humorous tips to reduce cringe.
{JSON_ONLY}"#,
      subject = subject(request),
      input = input_line(request),
    )
}

fn roast_prompt(request: &AnalysisRequest, intensity: u8) -> String
{   let (name, description) = roast_level(intensity);
    let about = if request.image.is_some()
    {   "about what you see in the image"
    } else
    {   "about the provided content"
    };
    format!(
r#"You are a professional roast comedian. Generate a roast for this {subject} at intensity level {intensity}/5 ({name}).

{input}

Intensity Level: {intensity}/5 - {name}
Description: {description}

Guidelines for each intensity level:
- Level 1 (Playful): Gentle teasing, wholesome humor, like roasting a friend
- Level 2 (Sassy): Clever wordplay, mild burns, witty observations
- Level 3 (Savage): Sharp wit, pointed observations, classic roast comedy
- Level 4 (Brutal): Harsh but creative insults, no holds barred
- Level 5 (Career Ending): Absolutely devastating, legendary-level roasts

You MUST provide your response as valid JSON only, with no markdown formatting or code blocks. Return ONLY this JSON structure:
{{
  "roastText": "[your roast here - make it {about}]",
  "intensity": {intensity},
  "burnLevel": [0-100 number representing how savage this roast is]
}}

Make the roast creative, original, and appropriately intense for level {intensity}.
{JSON_ONLY}"#,
      subject = subject(request),
      input = input_line(request),
    )
}

fn homework_prompt(request: &AnalysisRequest, iq_level: u16) -> String
{   let (band, register) = iq_band(iq_level);
    format!(
r#"You are a patient tutor. Solve the homework in this {subject} and explain it for a reader at IQ level {iq_level} ({band}).

{input}

Writing register: {register}.

You MUST provide your response as valid JSON only, with no markdown formatting or code blocks. Return ONLY this JSON structure:
{{
  "solution": "[the complete answer]",
  "stepByStep": ["step 1", "step 2", "..."],
  "keyPoints": ["key concept 1", "key concept 2"],
  "adaptedLevel": {iq_level},
  "writingStyle": "[one sentence describing the register you used]"
}}

{JSON_ONLY}"#,
      subject = subject(request),
      input = input_line(request),
    )
}

fn notes_prompt(request: &AnalysisRequest, mode: NoteMode) -> String
{   let (task, fields) = match mode
    {   NoteMode::Textify => (
          "Transcribe these notes into clean digital text. Fix obvious spelling mistakes but keep the author's wording.",
          r#"  "digitalText": "[the transcribed notes]","#
        )
      , NoteMode::Summarize => (
          "Summarize these notes. Pull out the key points and any action items.",
          r#"  "summary": "[short summary]",
  "keyPoints": ["point 1", "point 2"],
  "actionItems": ["item 1", "item 2"],"#
        )
      , NoteMode::Depth => (
          "Go deeper on these notes. Add context, connections and insights the author did not write down.",
          r#"  "summary": "[short summary]",
  "deeperInsights": "[added context and insights]",
  "keyPoints": ["point 1", "point 2"],"#
        )
    };
    format!(
r#"You are a note-taking assistant. {task}

{input}

You MUST provide your response as valid JSON only, with no markdown formatting or code blocks. Return ONLY this JSON structure:
{{
{fields}
  "processedType": "{mode}"
}}

{JSON_ONLY}"#,
      input = input_line(request),
      mode = mode.as_str(),
    )
}

#[cfg(test)]
mod tests
{   use super::*;
    use crate::request::ImageInput;

    #[test]
    fn roast_prompt_names_level()
    {   let prompt = build_prompt(&AnalysisRequest::roast("my haircut", 4, None));
        assert!(prompt.contains("intensity level 4/5 (Brutal)"));
        assert!(prompt.contains("Content: \"my haircut\""));
        assert!(prompt.contains("\"intensity\": 4,"));
    }

    #[test]
    fn image_prompts_use_context()
    {   let image = ImageInput::new("image/jpeg", vec![0xff]);
        let prompt = build_prompt(&AnalysisRequest::cringe("selfie", Some(image)));
        assert!(prompt.starts_with("Analyze this image"));
        assert!(prompt.contains("Additional context: \"selfie\""));
        assert!(prompt.contains("based on the image"));
    }

    #[test]
    fn homework_prompt_uses_band()
    {   let prompt = build_prompt(&AnalysisRequest::homework("d/dx sin(x^2)", 125, None));
        assert!(prompt.contains("College Advanced"));
        assert!(prompt.contains("\"adaptedLevel\": 125,"));
    }

    #[test]
    fn notes_prompt_asks_for_mode()
    {   let prompt = build_prompt(&AnalysisRequest::notes("buy milk", NoteMode::Summarize, None));
        assert!(prompt.contains("\"processedType\": \"summarize\""));
        assert!(prompt.contains("actionItems"));
    }

    #[test]
    fn bands_and_levels()
    {   assert_eq!(iq_band(110).0, "High School Level");
        assert_eq!(iq_band(111).0, "College Freshman");
        assert_eq!(iq_band(151).0, "Genius Level");
        assert_eq!(roast_level(1).0, "Playful");
        assert_eq!(roast_level(5).0, "Career Ending");
    }
}

//! Turns the vision model's free-text reply into label fields.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:json)?\n?").expect("Invalid code fence regex"));
static NAME_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:medication|drug)\s*name[:\s]*([^\n,]+)").expect("Invalid name regex")
});
static DOSAGE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)dosage[:\s]*([^\n,]+)").expect("Invalid dosage regex"));
static INSTRUCTIONS_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)instructions[:\s]*([^\n,]+)").expect("Invalid instructions regex")
});

pub const DEFAULT_CONFIDENCE: &str = "medium";

/// Fields read off a medication label. Unknown values are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedLabel {
    pub medication_name: String,
    pub generic_name: String,
    pub dosage: String,
    pub quantity: String,
    pub instructions: String,
    pub manufacturer: String,
    pub rx_number: String,
    pub prescriber: String,
    pub pharmacy: String,
    pub expiration_date: String,
    pub mechanism: String,
    pub indications: String,
    pub side_effects: String,
    pub warnings: String,
    /// `high`, `medium` or `low` as reported by the model.
    pub confidence: String,
    pub extracted_fields: Vec<String>,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub raw_text: String,
    pub label: ParsedLabel,
}

/// Strips Markdown fences and reads the JSON object; falls back to line
/// patterns when the reply is not JSON.
pub fn parse_model_reply(reply: &str) -> Extraction {
    let cleaned = CODE_FENCE.replace_all(reply, "");
    let cleaned = cleaned.trim();

    let mut extraction = match serde_json::from_str::<Value>(cleaned) {
        Ok(value) => from_json(&value, reply),
        Err(err) => {
            log::warn!("Could not parse model reply as JSON, using pattern extraction: {err}");
            from_patterns(reply)
        }
    };

    extraction.label.suggestions = generate_suggestions(&extraction.label);
    extraction
}

fn field(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        _ => String::new(),
    }
}

fn from_json(value: &Value, reply: &str) -> Extraction {
    let confidence = Some(field(value, "confidence"))
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| DEFAULT_CONFIDENCE.to_string());
    let raw_text = Some(field(value, "rawText"))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| reply.to_string());
    let extracted_fields = value
        .get("extractedFields")
        .and_then(Value::as_array)
        .map(|fields| {
            fields
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default();

    Extraction {
        raw_text,
        label: ParsedLabel {
            medication_name: field(value, "medicationName"),
            generic_name: field(value, "genericName"),
            dosage: field(value, "dosage"),
            quantity: field(value, "quantity"),
            instructions: field(value, "instructions"),
            manufacturer: field(value, "manufacturer"),
            rx_number: field(value, "rxNumber"),
            prescriber: field(value, "prescriber"),
            pharmacy: field(value, "pharmacy"),
            expiration_date: field(value, "expirationDate"),
            mechanism: field(value, "mechanism"),
            indications: field(value, "indications"),
            side_effects: field(value, "sideEffects"),
            warnings: field(value, "warnings"),
            confidence,
            extracted_fields,
            suggestions: Vec::new(),
        },
    }
}

fn capture(pattern: &Regex, text: &str) -> String {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

fn from_patterns(reply: &str) -> Extraction {
    Extraction {
        raw_text: reply.to_string(),
        label: ParsedLabel {
            medication_name: capture(&NAME_LINE, reply),
            dosage: capture(&DOSAGE_LINE, reply),
            instructions: capture(&INSTRUCTIONS_LINE, reply),
            confidence: DEFAULT_CONFIDENCE.to_string(),
            ..Default::default()
        },
    }
}

/// Numeric score for the model's confidence label.
pub fn confidence_score(label: &str) -> u8 {
    match label.to_ascii_lowercase().as_str() {
        "high" => 90,
        "medium" => 70,
        "low" => 50,
        _ => 70,
    }
}

/// Hints shown to the user next to the extracted form.
pub fn generate_suggestions(label: &ParsedLabel) -> Vec<String> {
    let has_name = !label.medication_name.trim().is_empty();
    let has_dosage = !label.dosage.trim().is_empty();
    let has_instructions = !label.instructions.trim().is_empty();

    let mut suggestions: Vec<String> = Vec::new();

    if !has_name {
        suggestions.push("Medication name not clearly detected - please verify manually".into());
    }
    if !has_dosage {
        suggestions.push("Dosage information not found - please add manually".into());
    }
    if !has_instructions {
        suggestions.push("Usage instructions not found - please add manually".into());
    }

    if label.confidence == "high" && has_name && has_dosage {
        suggestions.push("✅ High confidence extraction - please verify details are correct".into());
    } else if has_name && has_dosage && has_instructions {
        suggestions
            .push("✅ Successfully extracted medication details - please review for accuracy".into());
    } else if has_name || has_dosage {
        suggestions.push("⚠️ Partial extraction successful - please add missing information".into());
    }

    if label.confidence == "low" {
        suggestions.push("⚠️ Image quality could be better - try better lighting or focus".into());
    }

    if suggestions.iter().all(|s| s.starts_with('✅')) {
        suggestions.push("✅ OCR processing completed successfully".into());
    }

    suggestions
}

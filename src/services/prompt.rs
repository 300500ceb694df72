use serde_json::{json, Value};

use crate::error::ServiceError;
use crate::simulation::Goal;

pub fn system_instruction(scenario: &str) -> String {
    format!(
        r#"You are the "Steps to Hebrew" Conversation Simulator Engine.
Scenario: {scenario}.

OPERATIONAL RULES:
1. Roleplay: Adopt a character appropriate for the scenario.
2. Brevity: Keep responses under 2 sentences.
3. Language: Respond in Hebrew, but you can provide English translations in parenthesis if the user seems confused.
4. Implicit Correction: If user makes a grammar mistake, repeat it correctly in your response naturally.
5. Immediate Feedback: If there's a major error, provide a brief correction in the 'correction' field.
6. Shadowing: If hint is needed, provide "SAY THIS: [Hebrew sentence]".
7. Goals: Monitor the conversation and update 'goalStatus'. Each goal should have an emoji and a label. Ensure there are 2-3 goals relevant to the scenario.

Return ONLY valid JSON."#
    )
}

pub fn start_content(scenario: &str) -> String {
    format!(
        r#"The simulation for the scenario "{}" is starting. Greet the user and set the scene."#,
        scenario
    )
}

pub fn message_content(utterance: &str, goals: &[Goal]) -> Result<String, ServiceError> {
    Ok(format!(
        r#"User says: "{}". Current goals status: {}"#,
        utterance.trim(),
        serde_json::to_string(goals)?
    ))
}

pub fn hint_content(screen_text: &str, goals: &[Goal]) -> Result<String, ServiceError> {
    Ok(format!(
        r#"The user clicked "Help". Give them a 'SAY THIS' hint based on current state. Context: {}. Goals: {}"#,
        screen_text,
        serde_json::to_string(goals)?
    ))
}

/// Output schema the service is held to. Mirrors `SimulationState`.
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "characterVoice": { "type": "STRING", "description": "Text for TTS speaking" },
            "screenText": { "type": "STRING", "description": "Text to show on screen (includes character response)" },
            "goalStatus": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "id": { "type": "STRING" },
                        "label": { "type": "STRING" },
                        "emoji": { "type": "STRING" },
                        "status": { "type": "STRING", "enum": ["Pending", "Completed"] }
                    },
                    "required": ["id", "label", "emoji", "status"]
                }
            },
            "hint": { "type": "STRING", "nullable": true },
            "correction": { "type": "STRING", "nullable": true }
        },
        "required": ["characterVoice", "screenText", "goalStatus"]
    })
}

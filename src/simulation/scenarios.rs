use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

/// Static conversational setting. Client-side reference data only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scenario {
    pub id: &'static str,
    pub title: &'static str,
    pub hebrew_title: &'static str,
    pub icon: &'static str,
    pub description: &'static str,
    pub difficulty: Difficulty,
}

impl Scenario {
    /// The string interpolated into the service instruction.
    pub fn prompt_name(&self) -> String {
        format!("{} ({}): {}", self.title, self.hebrew_title, self.description)
    }
}

pub const SCENARIOS: &[Scenario] = &[
    Scenario {
        id: "cafe",
        title: "Ordering at a Café",
        hebrew_title: "בְּבֵית קָפֶה",
        icon: "☕",
        description: "Order a drink and a pastry from a busy Tel Aviv barista.",
        difficulty: Difficulty::Beginner,
    },
    Scenario {
        id: "market",
        title: "Shuk Shopping",
        hebrew_title: "בַּשּׁוּק",
        icon: "🍅",
        description: "Buy vegetables at Machane Yehuda and haggle over the price.",
        difficulty: Difficulty::Beginner,
    },
    Scenario {
        id: "taxi",
        title: "Taking a Taxi",
        hebrew_title: "בַּמּוֹנִית",
        icon: "🚕",
        description: "Tell the driver where to go, agree on the fare, and chat on the way.",
        difficulty: Difficulty::Intermediate,
    },
    Scenario {
        id: "doctor",
        title: "At the Clinic",
        hebrew_title: "אֵצֶל הָרוֹפֵא",
        icon: "🩺",
        description: "Describe your symptoms to a doctor and understand the advice.",
        difficulty: Difficulty::Intermediate,
    },
    Scenario {
        id: "apartment",
        title: "Renting an Apartment",
        hebrew_title: "שְׂכִירַת דִּירָה",
        icon: "🏠",
        description: "Negotiate rent, move-in date, and repairs with a landlord.",
        difficulty: Difficulty::Advanced,
    },
];

pub fn find(id: &str) -> Option<&'static Scenario> {
    SCENARIOS.iter().find(|s| s.id.eq_ignore_ascii_case(id.trim()))
}

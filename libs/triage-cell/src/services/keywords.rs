use regex::Regex;
use tracing::debug;

use crate::models::{Priority, TriageAssessment};

// ============================================================================
// PRIORITY KEYWORDS CONFIGURATION
// Edit these lists to tune priority detection
// ============================================================================

const EMERGENCY_KEYWORDS: &[&str] = &[
    // Breathing issues
    "not breathing", "cant breathe", "can't breathe", "difficulty breathing",
    "choking", "suffocating", "gasping", "blue gums", "blue tongue",

    // Bleeding / trauma
    "severe bleeding", "heavy bleeding", "profuse bleeding", "blood loss",
    "hit by car", "accident", "trauma", "broken bone", "fracture",
    "deep wound", "puncture wound", "attacked by",

    // Poisoning
    "poisoned", "poison", "toxic", "ate poison", "rat poison",
    "antifreeze", "chocolate poisoning", "xylitol",

    // Seizures / collapse
    "seizure", "convulsion", "collapse", "collapsed", "unconscious",
    "unresponsive", "not moving", "paralyzed", "cant walk", "can't walk",

    // Severe conditions
    "bloat", "twisted stomach", "gastric torsion", "heatstroke",
    "heat stroke", "drowning", "electrocution", "snake bite", "bee sting allergy",

    // Birth emergencies
    "difficult labor", "dystocia", "stuck puppy", "stuck kitten",
    "prolonged labor", "birthing emergency",

    // Venomous bites and stings
    "snakebite", "snake bit", "bitten by snake",
    "spider bite", "scorpion sting", "venomous",
];

const HIGH_PRIORITY_KEYWORDS: &[&str] = &[
    // Pain indicators
    "severe pain", "extreme pain", "screaming", "crying in pain",
    "cant stand", "can't stand", "limping badly", "unable to walk",

    // Vomiting / diarrhea
    "vomiting blood", "blood in vomit", "bloody diarrhea",
    "continuous vomiting", "cant keep food down", "can't keep food down",
    "vomiting for hours", "severe vomiting", "projectile vomiting",

    // Eye emergencies
    "eye injury", "eye popped", "proptosis", "scratched eye",
    "eye swollen shut", "sudden blindness",

    // Urinary issues
    "cant urinate", "can't urinate", "blocked", "straining to pee",
    "no urine", "bloody urine", "urinary blockage",

    // Allergic reactions
    "swollen face", "hives", "allergic reaction", "face swelling",
    "throat swelling", "anaphylaxis",

    // Infections
    "high fever", "very hot", "severe infection", "abscess burst",
    "pus", "infected wound", "septic",

    // Eating issues
    "not eating for days", "refuses food", "wont eat for 2 days",
    "hasnt eaten", "hasn't eaten", "anorexia",
];

const NORMAL_PRIORITY_KEYWORDS: &[&str] = &[
    // Routine care
    "checkup", "check-up", "check up", "vaccination", "vaccine",
    "annual exam", "wellness", "routine", "regular visit",
    "booster", "shots", "immunization",

    // Minor issues
    "mild", "slight", "minor", "small", "little",
    "occasional", "sometimes", "started recently",

    // Grooming related
    "nail trim", "ear cleaning", "dental cleaning",
    "grooming", "bath", "matted fur",
];

const LOW_PRIORITY_KEYWORDS: &[&str] = &[
    // Elective / optional
    "microchip", "microchipping", "health certificate",
    "travel certificate", "spay", "neuter", "elective surgery",

    // Follow-ups
    "follow up", "follow-up", "recheck", "re-check",
    "medication refill", "refill", "prescription renewal",

    // Behavioral (non-urgent)
    "behavioral consultation", "training advice",
    "diet advice", "nutrition consultation",
];

// Patterns that catch phrasings the plain keyword tables miss
const EMERGENCY_PATTERNS: &[&str] = &[
    r"not (breathing|moving|responding)",
    r"(severe|heavy|profuse) bleeding",
    r"(hit|struck) by (car|vehicle)",
    r"(seizure|convulsion)s? (for|lasting)",
    r"(collapse|passed out|unconscious)",
];

const HIGH_PATTERNS: &[&str] = &[
    r"vomiting (blood|for \d+ hours?)",
    r"(bloody|blood in) (stool|diarrhea|urine)",
    r"(can't|cannot|unable to) (walk|stand|eat|urinate)",
    r"swollen (face|eye|throat)",
    r"(severe|extreme|intense) pain",
    r"not eating for (\d+) days?",
];

/// Deterministic keyword heuristic. Pure for a fixed input, never fails, and
/// tags every result as a fallback so callers can tell degraded triage apart
/// from the remote classifier.
pub struct KeywordClassifier {
    emergency_patterns: Vec<Regex>,
    high_patterns: Vec<Regex>,
}

impl KeywordClassifier {
    pub fn new() -> Self {
        let emergency_patterns = EMERGENCY_PATTERNS.iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect();

        let high_patterns = HIGH_PATTERNS.iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect();

        Self {
            emergency_patterns,
            high_patterns,
        }
    }

    /// Tier precedence: emergency, then high, then explicit low, then normal.
    /// Low is checked before normal so "follow up for vaccination" reads as a
    /// follow-up rather than a fresh routine visit. Anything unmatched is
    /// normal.
    pub fn classify(&self, description: &str) -> TriageAssessment {
        let text = description.to_lowercase();
        let text = text.trim();

        let matched = matching_keywords(text, EMERGENCY_KEYWORDS);
        if !matched.is_empty() {
            return fallback_assessment(
                Priority::Emergency,
                format!("Emergency symptoms detected: {}", matched.join(", ")),
            );
        }
        if self.emergency_patterns.iter().any(|p| p.is_match(text)) {
            return fallback_assessment(
                Priority::Emergency,
                "Emergency pattern detected".to_string(),
            );
        }

        let matched = matching_keywords(text, HIGH_PRIORITY_KEYWORDS);
        if !matched.is_empty() {
            return fallback_assessment(
                Priority::High,
                format!("Urgent symptoms detected: {}", matched.join(", ")),
            );
        }
        if self.high_patterns.iter().any(|p| p.is_match(text)) {
            return fallback_assessment(Priority::High, "Urgent pattern detected".to_string());
        }

        let matched = matching_keywords(text, LOW_PRIORITY_KEYWORDS);
        if !matched.is_empty() {
            return fallback_assessment(
                Priority::Low,
                format!("Routine/follow-up visit: {}", matched.join(", ")),
            );
        }

        let matched = matching_keywords(text, NORMAL_PRIORITY_KEYWORDS);
        if !matched.is_empty() {
            return fallback_assessment(
                Priority::Normal,
                format!("Standard appointment: {}", matched.join(", ")),
            );
        }

        debug!("No priority keywords matched, defaulting to normal");
        fallback_assessment(
            Priority::Normal,
            "Standard priority - no urgent keywords detected".to_string(),
        )
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new()
    }
}

fn matching_keywords(text: &str, keywords: &[&str]) -> Vec<String> {
    keywords
        .iter()
        .filter(|keyword| text.contains(*keyword))
        .take(3)
        .map(|keyword| keyword.to_string())
        .collect()
}

fn fallback_assessment(priority: Priority, rationale: String) -> TriageAssessment {
    TriageAssessment {
        priority,
        rationale,
        is_fallback: true,
    }
}

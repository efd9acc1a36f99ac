//! Intent classification
//!
//! An ordered table of rules, evaluated first-match-wins over the ASCII
//! lowercased command. Reordering the table changes which source answers a
//! command, so the order is pinned by tests.

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

/// Exact command the client sends after wake-word activation
pub const GREETING_TOKEN: &str = "system_greet";

/// Classified purpose of an utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Greeting,
    CapitalLookup { country: String },
    /// `None` means no city was named; the retriever applies its default
    Weather { city: Option<String> },
    /// `None` means no topic was named; the retriever applies its default
    News { topic: Option<String> },
    Biographical { subject: String },
    AgeCalc { age: u32 },
    FileListing { path: PathBuf },
    AppLaunch { name: String },
    ScreenRead,
    GenericSearch { query: String },
}

/// Result of classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// A source can be consulted
    Resolved(Intent),
    /// A keyword matched but its argument is missing; ask the user instead
    NeedsClarification(String),
}

/// One entry of the rule table
struct IntentRule {
    name: &'static str,
    /// Tested against the lowercased command
    matches: fn(&str) -> bool,
    /// Receives the original command and its lowercased form
    extract: fn(&str, &str) -> Classification,
}

static CAPITAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)capital of\s+([a-z\s]+)").expect("valid regex"));
static WEATHER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)weather in\s+([a-z\s]+)").expect("valid regex"));
static NEWS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)news about\s+([a-z\s]+)").expect("valid regex"));
static AGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)if i am\s+(\d+)").expect("valid regex"));
static LIST_FILES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)list files in\s+([a-z0-9_\\/:.\s~-]+)").expect("valid regex")
});
static OPEN_APP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)open application\s+([a-z0-9_]+)").expect("valid regex"));

const BIOGRAPHICAL_KEYWORDS: [&str; 3] = ["who is", "what is", "tell me about"];
const AGE_KEYWORDS: [&str; 3] = ["if i am", "when was i born", "how old am i"];

static RULES: &[IntentRule] = &[
    IntentRule {
        name: "greeting",
        matches: |lower| lower.trim() == GREETING_TOKEN,
        extract: |_, _| Classification::Resolved(Intent::Greeting),
    },
    IntentRule {
        name: "capital",
        matches: |lower| lower.contains("capital of"),
        extract: extract_capital,
    },
    IntentRule {
        name: "weather",
        matches: |lower| lower.contains("weather"),
        extract: |command, _| {
            Classification::Resolved(Intent::Weather {
                city: capture(&WEATHER_RE, command).map(|c| title_case(&c)),
            })
        },
    },
    IntentRule {
        name: "news",
        matches: |lower| lower.contains("news"),
        extract: |command, _| {
            Classification::Resolved(Intent::News {
                topic: capture(&NEWS_RE, command).map(|t| title_case(&t)),
            })
        },
    },
    IntentRule {
        name: "biographical",
        matches: |lower| BIOGRAPHICAL_KEYWORDS.iter().any(|k| lower.contains(k)),
        extract: extract_subject,
    },
    IntentRule {
        name: "age",
        matches: |lower| AGE_KEYWORDS.iter().any(|k| lower.contains(k)),
        extract: extract_age,
    },
    IntentRule {
        name: "file_listing",
        matches: |lower| lower.contains("list files in"),
        extract: |command, _| match capture(&LIST_FILES_RE, command) {
            Some(path) => Classification::Resolved(Intent::FileListing {
                path: PathBuf::from(path),
            }),
            None => clarify("Please specify the directory you want to list files from."),
        },
    },
    IntentRule {
        name: "app_launch",
        matches: |lower| lower.contains("open application"),
        extract: |command, _| match capture(&OPEN_APP_RE, command) {
            Some(name) => Classification::Resolved(Intent::AppLaunch {
                name: name.to_ascii_lowercase(),
            }),
            None => clarify("Please specify the application you want to open."),
        },
    },
    IntentRule {
        name: "screen_read",
        matches: |lower| lower.contains("read screen"),
        extract: |_, _| Classification::Resolved(Intent::ScreenRead),
    },
];

fn clarify(message: &str) -> Classification {
    Classification::NeedsClarification(message.to_string())
}

/// First capture group, trimmed; `None` when absent or blank
fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Capitalize each word, lowercase the rest ("united STATES" -> "United States")
#[must_use]
pub fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn extract_capital(command: &str, _lower: &str) -> Classification {
    match capture(&CAPITAL_RE, command) {
        Some(country) => Classification::Resolved(Intent::CapitalLookup {
            country: title_case(&country),
        }),
        None => clarify("Please specify the country for which you want to know the capital."),
    }
}

fn extract_subject(command: &str, lower: &str) -> Classification {
    // Ascii lowercasing keeps byte offsets aligned with the original command
    let found = BIOGRAPHICAL_KEYWORDS
        .iter()
        .find_map(|k| lower.rfind(k).map(|idx| idx + k.len()));

    let subject = found
        .map(|start| {
            command[start..]
                .trim()
                .trim_end_matches(['?', '.', '!'])
                .trim()
        })
        .unwrap_or_default();

    let mut chars = subject.chars();
    match chars.next() {
        Some(first) => Classification::Resolved(Intent::Biographical {
            subject: first.to_uppercase().chain(chars).collect(),
        }),
        None => clarify("Please specify the subject you want information about."),
    }
}

fn extract_age(command: &str, _lower: &str) -> Classification {
    match capture(&AGE_RE, command).and_then(|a| a.parse().ok()) {
        Some(age) => Classification::Resolved(Intent::AgeCalc { age }),
        None => clarify("Please specify your age to calculate your birth year."),
    }
}

/// Classify a command, first matching rule wins
#[must_use]
pub fn classify_intent(command: &str) -> Classification {
    let lower = command.to_ascii_lowercase();

    for rule in RULES {
        if (rule.matches)(&lower) {
            let classification = (rule.extract)(command, &lower);
            tracing::debug!(rule = rule.name, ?classification, "intent classified");
            return classification;
        }
    }

    Classification::Resolved(Intent::GenericSearch {
        query: command.trim().to_string(),
    })
}

/// Rule names in evaluation order
#[must_use]
pub fn rule_order() -> Vec<&'static str> {
    RULES.iter().map(|r| r.name).collect()
}

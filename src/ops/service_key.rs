use std::collections::HashMap;

/// Label → backend `serviceKey` entries the backend is known to use.
const BUILTIN: &[(&str, &str)] = &[
    ("Restaurant", "restaurants"),
    ("Pharmacy", "pharmacies"),
    ("Hospital", "hospitals"),
    ("Beauty Salon", "salons"),
    ("Gym", "gyms"),
    ("Hotel", "hotels"),
    ("Supermarket", "supermarkets"),
    ("Bakery", "bakeries"),
    ("Vehicle Repair", "garages"),
    ("Laundry", "laundries"),
    ("Tutor", "tutors"),
    ("Taxi", "taxis"),
    ("Plumber", "plumbers"),
    ("Electrician", "electricians"),
    ("Pet Care", "petCares"),
];

/// Maps human-facing category labels to the keys used by
/// `GET /api/all-services?services=<key>`.
///
/// Lookups go through the explicit table first (built-ins overlaid with
/// configured entries) and only then through the pluralization rule.
#[derive(Debug, Clone)]
pub struct ServiceKeys {
    table: HashMap<String, String>,
}

impl Default for ServiceKeys {
    fn default() -> Self {
        ServiceKeys {
            table: BUILTIN
                .iter()
                .map(|(label, key)| (normalize(label), key.to_string()))
                .collect(),
        }
    }
}

impl ServiceKeys {
    /// Built-in table with `overrides` layered on top.
    pub fn with_overrides<'a, I>(overrides: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let mut keys = ServiceKeys::default();
        for (label, key) in overrides {
            keys.table.insert(normalize(label), key.clone());
        }
        keys
    }

    pub fn key_for(&self, label: &str) -> String {
        self.table
            .get(&normalize(label))
            .cloned()
            .unwrap_or_else(|| fallback_key(label))
    }
}

fn normalize(label: &str) -> String {
    label
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// camelCase the words of `label` and pluralize the last one.
/// `"Beauty Salon"` → `"beautySalons"`, `"Car Wash"` → `"carWashes"`.
pub fn fallback_key(label: &str) -> String {
    let words: Vec<String> = label
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect();

    let mut key = String::new();
    for (i, word) in words.iter().enumerate() {
        let word = if i + 1 == words.len() {
            pluralize(word)
        } else {
            word.clone()
        };
        if i == 0 {
            key.push_str(&word);
        } else {
            key.push_str(&capitalize(&word));
        }
    }
    key
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn pluralize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix('y')
        && stem.chars().last().is_some_and(|c| !"aeiou".contains(c))
    {
        return format!("{}ies", stem);
    }
    if ["s", "x", "z", "ch", "sh"].iter().any(|s| word.ends_with(s)) {
        return format!("{}es", word);
    }
    format!("{}s", word)
}

//! Text heuristics applied to generated recipes before they are rendered.

use std::sync::LazyLock;

use regex::Regex;

static STEP_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\.\s").expect("step marker pattern"));

static LEADING_QUANTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)
        ^\s*
        (?P<qty>
            (?: \d+(?:\.\d+)? (?:\s*[/-]\s*\d+(?:\.\d+)?)? | [½¼¾⅓⅔⅛] )
            (?: \s+\d+/\d+ | [½¼¾⅓⅔⅛] )?
            (?: \s*
                (?: cups? | tbsps? | tablespoons? | tsps? | teaspoons? | grams? | gms? | g
                  | kgs? | kilograms? | ml | litres? | liters? | l | oz | ounces? | lbs? | pounds?
                  | pinch(?:es)? | cloves? | pieces? | inch(?:es)? | sprigs? | slices?
                  | bunch(?:es)? | handfuls? | cans? | dash(?:es)? | nos? | medium | large | small )
                \b\.?
            )?
        )
        \s+ (?:of\s+)?
        (?P<name>\S.*?)
        \s*$",
    )
    .expect("leading quantity pattern")
});

static TRAILING_QUANTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?P<name>.+?)(?:\s+[-–]\s+|\s*[:,]\s*|\s*\()(?P<qty>[^()]*\d[^()]*|to taste|as needed|as required)\)?\s*$",
    )
    .expect("trailing quantity pattern")
});

/// An ingredient line split into its amount and what it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ingredient {
    pub quantity: Option<String>,
    pub name: String,
}

/// Splits `"2 cups basmati rice"`, `"Paneer (200 g)"` or `"Salt - to taste"`
/// into quantity and name. Lines without a recognisable amount are all name.
pub fn split_ingredient(line: &str) -> Ingredient {
    if let Some(caps) = LEADING_QUANTITY.captures(line) {
        return Ingredient {
            quantity: Some(caps["qty"].trim().to_string()),
            name: caps["name"].to_string(),
        };
    }
    if let Some(caps) = TRAILING_QUANTITY.captures(line) {
        return Ingredient {
            quantity: Some(caps["qty"].trim().to_string()),
            name: caps["name"].trim().to_string(),
        };
    }
    Ingredient {
        quantity: None,
        name: line.trim().to_string(),
    }
}

/// Breaks instructions into numbered steps.
///
/// `N. ` markers count only when they follow whitespace (or start the text)
/// and continue the sequence 1, 2, 3, so "bake for 2. hours" style numbers
/// stay inside their step. Text with no usable markers is split on lines
/// and numbered from 1.
pub fn instruction_steps(text: &str) -> Vec<String> {
    let mut starts = Vec::new();
    let mut expected = 1u32;
    for caps in STEP_MARKER.captures_iter(text) {
        let marker = caps.get(1).map_or(0, |m| m.start());
        let at_boundary = text[..marker]
            .chars()
            .next_back()
            .is_none_or(char::is_whitespace);
        if at_boundary && caps[1].parse::<u32>().ok() == Some(expected) {
            starts.push(marker);
            expected += 1;
        }
    }

    if starts.is_empty() {
        return text
            .lines()
            .map(|line| line.trim().trim_start_matches(['-', '*', '•']).trim())
            .filter(|line| !line.is_empty())
            .enumerate()
            .map(|(i, line)| format!("{}. {line}", i + 1))
            .collect();
    }

    let mut steps = Vec::with_capacity(starts.len() + 1);
    let preamble = text[..starts[0]].trim();
    if !preamble.is_empty() {
        steps.push(preamble.to_string());
    }
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(text.len());
        let step = collapse_whitespace(&text[start..end]);
        if !step.is_empty() {
            steps.push(step);
        }
    }
    steps
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `"happy"` becomes `"Happy"`.
pub fn mood_label(mood: &str) -> String {
    let mut chars = mood.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Font Awesome icon class for a mood.
pub fn mood_icon(mood: &str) -> &'static str {
    match mood.to_ascii_lowercase().as_str() {
        "happy" => "fa-smile",
        "sad" => "fa-frown",
        "stressed" => "fa-meh",
        "energetic" => "fa-bolt",
        "tired" => "fa-bed",
        _ => "fa-utensils",
    }
}

/// Key under which the backend stores a caller's recipes.
pub fn ip_key(ip: &str) -> String {
    ip.replace('.', "_")
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(line: &str) -> (Option<String>, String) {
        let ingredient = split_ingredient(line);
        (ingredient.quantity, ingredient.name)
    }

    fn parts(qty: Option<&str>, name: &str) -> (Option<String>, String) {
        (qty.map(str::to_string), name.to_string())
    }

    #[test]
    fn splits_leading_quantities() {
        assert_eq!(split("2 cups basmati rice"), parts(Some("2 cups"), "basmati rice"));
        assert_eq!(split("1/2 tsp turmeric powder"), parts(Some("1/2 tsp"), "turmeric powder"));
        assert_eq!(split("1 1/2 cups curd"), parts(Some("1 1/2 cups"), "curd"));
        assert_eq!(split("2-3 green chillies"), parts(Some("2-3"), "green chillies"));
        assert_eq!(split("½ cup milk"), parts(Some("½ cup"), "milk"));
        assert_eq!(split("200g paneer"), parts(Some("200g"), "paneer"));
        assert_eq!(split("3 onions"), parts(Some("3"), "onions"));
        assert_eq!(split("1 pinch of hing"), parts(Some("1 pinch"), "hing"));
        assert_eq!(split("2 tbsp. ghee"), parts(Some("2 tbsp."), "ghee"));
    }

    #[test]
    fn splits_trailing_quantities() {
        assert_eq!(split("Paneer (200 g)"), parts(Some("200 g"), "Paneer"));
        assert_eq!(split("Rice - 2 cups"), parts(Some("2 cups"), "Rice"));
        assert_eq!(split("Salt - to taste"), parts(Some("to taste"), "Salt"));
        assert_eq!(split("Oil: as needed"), parts(Some("as needed"), "Oil"));
    }

    #[test]
    fn keeps_lines_without_amounts() {
        assert_eq!(split("Salt to taste"), parts(None, "Salt to taste"));
        assert_eq!(split("Garam-masala"), parts(None, "Garam-masala"));
        assert_eq!(split("  Coriander leaves "), parts(None, "Coriander leaves"));
    }

    #[test]
    fn numbered_instructions_are_split() {
        let steps = instruction_steps("1. Wash the rice.\n2. Soak for 20 minutes. 3. Cook for 2. hours");
        assert_eq!(
            steps,
            vec![
                "1. Wash the rice.",
                "2. Soak for 20 minutes.",
                "3. Cook for 2. hours",
            ]
        );
    }

    #[test]
    fn preamble_is_kept_before_first_step() {
        let steps = instruction_steps("Serves two. 1. Heat oil 2. Add cumin");
        assert_eq!(steps, vec!["Serves two.", "1. Heat oil", "2. Add cumin"]);
    }

    #[test]
    fn unnumbered_instructions_get_numbers() {
        let steps = instruction_steps("Heat the ghee\n\n- Add the spices\n* Serve hot");
        assert_eq!(steps, vec!["1. Heat the ghee", "2. Add the spices", "3. Serve hot"]);
        assert!(instruction_steps("   ").is_empty());
    }

    #[test]
    fn out_of_sequence_markers_are_ignored() {
        let steps = instruction_steps("Bake at 180. 2. Rest");
        assert_eq!(steps, vec!["1. Bake at 180. 2. Rest"]);
    }

    #[test]
    fn moods_and_keys() {
        assert_eq!(mood_label("energetic"), "Energetic");
        assert_eq!(mood_label(""), "");
        assert_eq!(mood_icon("Happy"), "fa-smile");
        assert_eq!(mood_icon("hangry"), "fa-utensils");
        assert_eq!(ip_key("203.0.113.7"), "203_0_113_7");
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html(r#"<b>"Dal" & 'Roti'</b>"#),
            "&lt;b&gt;&quot;Dal&quot; &amp; &#39;Roti&#39;&lt;/b&gt;"
        );
    }
}

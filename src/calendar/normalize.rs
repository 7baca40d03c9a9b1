use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

/// Acronyms and the titles they stand for. Order matters: the first pattern
/// that matches wins, even if a later one would match more of the title.
///
/// Every pattern only matches whole words, so glued variants such as "CPIH"
/// or "PPIs" are not recognised and pass through unchanged.
const ACRONYMS: [(&str, &str); 18] = [
    ("CPI", r"(?:Core )?Consumer Price Index|CPI"),
    ("GDP", r"(?:Prelim )?Gross Domestic Product|GDP"),
    ("NFP", r"Non-Farm Payrolls|NFP"),
    ("FOMC", r"Federal Open Market Committee|FOMC"),
    ("PMI", r"(?:Manufacturing )?Purchasing Managers['\\ ]* Index|PMI"),
    ("PPI", r"(?:Core )?Producer Price Index|PPI"),
    ("ISM", r"ISM (?:Manufacturing |Non-Manufacturing |Services )?(?:PMI|Index)"),
    ("BOE", r"Bank of England|BOE"),
    ("ECB", r"European Central Bank|ECB"),
    ("BOJ", r"Bank of Japan|BOJ"),
    ("BOC", r"Bank of Canada|BOC"),
    ("RBA", r"Reserve Bank of Australia|RBA"),
    ("RBNZ", r"Reserve Bank of New Zealand|RBNZ"),
    ("SNB", r"Swiss National Bank|SNB"),
    ("HPI", r"House Price Index|HPI"),
    ("PCE", r"(?:Core )?Personal Consumption Expenditure|PCE"),
    ("HICP", r"Harmonized Index of Consumer Prices|HICP"),
    ("ADP", r"ADP Non-Farm Employment Change|ADP"),
];

const QUALIFIERS: [&str; 3] = ["Core", "Prelim", "Final"];

static PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    ACRONYMS
        .iter()
        .filter_map(|(acronym, pattern)| {
            // Word boundaries keep "PPI" from matching inside "Shipping".
            RegexBuilder::new(&format!(r"\b(?:{pattern})\b"))
                .case_insensitive(true)
                .build()
                .map_err(|err| log::error!("Invalid pattern for {acronym}: {err}"))
                .ok()
                .map(|regex| (*acronym, regex))
        })
        .collect()
});

static QUALIFIER_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    QUALIFIERS
        .iter()
        .filter_map(|qualifier| {
            RegexBuilder::new(&format!(r"\b{qualifier}\b"))
                .case_insensitive(true)
                .build()
                .ok()
                .map(|regex| (*qualifier, regex))
        })
        .collect()
});

const SPEAKS: &str = " speaks";

/// Maps a verbose event title to its canonical short form.
///
/// `"Core Consumer Price Index m/m"` becomes `"Core CPI"`, `"ECB President
/// Lagarde Speaks Today"` becomes `"ECB"`, titles without a known acronym are
/// returned as they are.
pub fn normalize(raw_name: &str) -> String {
    if ACRONYMS.iter().any(|(acronym, _)| *acronym == raw_name) {
        return raw_name.to_owned();
    }

    if let Some((acronym, _)) = PATTERNS.iter().find(|(_, regex)| regex.is_match(raw_name)) {
        return match qualifier(raw_name) {
            Some(qualifier) => format!("{qualifier} {acronym}"),
            None => (*acronym).to_owned(),
        };
    }

    let lowercase = raw_name.to_ascii_lowercase();
    if lowercase.contains(SPEAKS.trim_start()) {
        if let Some(idx) = lowercase.find(SPEAKS) {
            return format!("{} Speaks", &raw_name[..idx]);
        }
    }

    raw_name.to_owned()
}

fn qualifier(raw_name: &str) -> Option<&'static str> {
    QUALIFIER_PATTERNS
        .iter()
        .find(|(_, regex)| regex.is_match(raw_name))
        .map(|(qualifier, _)| *qualifier)
}

#[cfg(test)]
mod tests {
    use super::normalize;

    #[test]
    fn qualified_titles_keep_their_prefix() {
        assert_eq!(normalize("Core Consumer Price Index"), "Core CPI");
        assert_eq!(normalize("Prelim Gross Domestic Product q/q"), "Prelim GDP");
        assert_eq!(normalize("Final Manufacturing PMI"), "Final PMI");
        assert_eq!(normalize("core ppi m/m"), "Core PPI");
    }

    #[test]
    fn acronyms_are_returned_unchanged() {
        assert_eq!(normalize("CPI"), "CPI");
        assert_eq!(normalize("FOMC"), "FOMC");
    }

    #[test]
    fn verbose_titles_collapse_to_acronyms() {
        assert_eq!(normalize("Non-Farm Payrolls"), "NFP");
        assert_eq!(normalize("Federal Open Market Committee Statement"), "FOMC");
        assert_eq!(normalize("Swiss National Bank Policy Rate"), "SNB");
        assert_eq!(normalize("CPI y/y"), "CPI");
    }

    #[test]
    fn first_table_entry_wins() {
        // Also matches the ISM pattern, but PMI comes first.
        assert_eq!(normalize("ISM Manufacturing PMI"), "PMI");
        // "Consumer Prices" must not satisfy the earlier CPI pattern.
        assert_eq!(normalize("Harmonized Index of Consumer Prices"), "HICP");
    }

    #[test]
    fn speakers_are_trimmed_to_speaks() {
        assert_eq!(
            normalize("Federal Reserve Chair Speaks"),
            "Federal Reserve Chair Speaks"
        );
        assert_eq!(normalize("Fed Governor Waller Speaks Today"), "Fed Governor Waller Speaks");
        assert_eq!(normalize("BOE Gov Bailey Speaks"), "BOE");
    }

    #[test]
    fn unknown_titles_pass_through() {
        assert_eq!(normalize("Retail Sales"), "Retail Sales");
        assert_eq!(normalize("Shipping Index"), "Shipping Index");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn acronyms_glued_to_other_letters_are_left_alone() {
        assert_eq!(normalize("CPIH y/y"), "CPIH y/y");
        assert_eq!(normalize("Shipping Index"), "Shipping Index");
        assert_eq!(normalize("GDPNow"), "GDPNow");
    }
}
